//! Tindur Core - Board Types
//!
//! Records, the lane-grouped view, change events and domain errors shared by
//! the store, the server and the client. No I/O lives here.

pub mod error;
pub mod event;
pub mod grouped;
pub mod record;

pub use error::{EventDecodeError, StorageError, TindurError, TindurResult, ValidationError};
pub use event::{ChangeEvent, ChangeKind, RecordDelta, SessionId, StreamEvent};
pub use grouped::GroupedView;
pub use record::{
    normalize_text, parse_date, CreateRecordRequest, Lane, ListFilter, NewRecord, Record,
    RecordChanges, RecordId, UpdateRecordRequest, DATE_FORMAT,
};
