//! Macros for reducing router boilerplate.

/// Implement `FromRef<AppState>` for a cloneable field so handlers can
/// extract just the piece of state they need.
///
/// ```ignore
/// crate::impl_from_ref!(Arc<EventHub>, hub);
/// ```
#[macro_export]
macro_rules! impl_from_ref {
    ($type:ty, $field:ident) => {
        impl axum::extract::FromRef<$crate::state::AppState> for $type {
            fn from_ref(state: &$crate::state::AppState) -> Self {
                state.$field.clone()
            }
        }
    };
}
