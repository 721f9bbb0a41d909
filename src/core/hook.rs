//! Hook traits for additional record destinations

use super::{error::Result, log_level::LogLevel, record::Record};

/// A destination receiving every finished record after the primary output
///
/// `deliver` runs under the logger's output lock; queued hooks should only
/// enqueue and return.
pub trait Hook: Send + Sync {
    fn name(&self) -> &str;

    /// Restrict which severities reach [`Hook::deliver`]
    fn accepts(&self, _level: LogLevel) -> bool {
        true
    }

    fn deliver(&self, record: &Record) -> Result<()>;
}

/// A destination with pending work that `Logger::flush` waits for
pub trait Flush: Send + Sync {
    /// Block until everything handed over before the call is processed
    fn flush(&self);
}
