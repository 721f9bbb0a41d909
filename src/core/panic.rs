//! Logging panics
//!
//! [`recover`] runs a closure and logs its panic, if any, as an error under
//! module `logpanic`. [`install_panic_hook`] reports every panic in the
//! process the same way before the previous hook runs.

use super::field::{Fields, FIELD_MODULE};
use super::log_level::LogLevel;
use super::logger::Logger;
use super::record::Record;
use super::stacktrace::{SharedError, TracedError};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

pub const PANIC_MODULE: &str = "logpanic";

/// A panic payload turned into an error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct PanicError {
    pub message: String,
    pub location: Option<String>,
}

impl PanicError {
    pub fn from_payload(payload: &(dyn Any + Send)) -> Self {
        Self {
            message: super::dispatch::panic_message(payload),
            location: None,
        }
    }
}

/// Log a caught panic payload at error level
pub fn log_panic(logger: &Logger, payload: &(dyn Any + Send), fields: Option<Fields>) {
    let mut entry = logger.module(PANIC_MODULE);
    if let Some(fields) = fields {
        entry = entry.with_fields(fields);
    }
    entry.error(PanicError::from_payload(payload));
}

/// Run `f`, logging and swallowing a panic. Returns `None` if `f` panicked.
///
/// ```
/// use rust_deferred_logger::{panic::recover, Logger};
///
/// let logger = Logger::builder().discard_output().build();
/// assert_eq!(recover(&logger, None, || 2 + 2), Some(4));
/// assert_eq!(recover(&logger, None, || -> i32 { panic!("worker died") }), None);
/// ```
pub fn recover<F, R>(logger: &Logger, fields: Option<Fields>, f: F) -> Option<R>
where
    F: FnOnce() -> R,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            log_panic(logger, &*payload, fields);
            None
        }
    }
}

/// Report every panic through `logger`, then call the previously installed
/// hook. Queued hooks are not flushed here, since the panicking thread may be
/// a hook worker; call [`Logger::flush`] before exiting.
pub fn install_panic_hook(logger: &'static Logger) {
    let previous = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |info| {
        let error = PanicError {
            message: super::dispatch::panic_message(info.payload()),
            location: info
                .location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column())),
        };
        let message = match &error.location {
            Some(location) => format!("panicked at {}", location),
            None => "panicked".to_string(),
        };
        let traced: SharedError = Arc::new(TracedError::capture(error));
        let record = Record::new(LogLevel::Error, message)
            .with_fields(Fields::new().with(FIELD_MODULE, PANIC_MODULE))
            .with_error(Some(traced));

        logger.try_emit(record);
        previous(info);
    }));
}
