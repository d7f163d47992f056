//! Service layer
//!
//! Business logic that sits between the HTTP handlers and the record store.
//! Services never publish events; handlers do that after a service call
//! succeeds.

pub mod record_service;

pub use record_service::PersistenceService;
