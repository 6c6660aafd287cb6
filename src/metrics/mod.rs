//! Metrics instrumentation for waymark.
//!
//! Events are recorded through the `metrics` facade. Nothing is exported
//! unless the host installs a recorder.

pub mod events;

/// Macro for emitting metric events.
///
/// This macro calls the `InternalEvent::emit()` method on the given event,
/// which records the corresponding counter or gauge.
///
/// # Example
///
/// ```ignore
/// use waymark::metrics::events::{BytesRead, RecordsRead};
///
/// emit!(RecordsRead { count: 100 });
/// emit!(BytesRead { bytes: 1024 });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}
