//! Logging macros for ergonomic message formatting.
//!
//! Each macro takes an [`Entry`](crate::Entry) (or anything with the same
//! methods) followed by `format!`-style arguments.
//!
//! # Examples
//!
//! ```
//! use rust_deferred_logger::prelude::*;
//! use rust_deferred_logger::{info, trace};
//!
//! let logger = Logger::builder().discard_output().build();
//! let entry = logger.module("server");
//!
//! let port = 8080;
//! trace!(entry, "binding port {}", port);
//! info!(entry, "Server listening on port {}", port);
//! ```

/// Buffer a formatted trace line on an entry.
///
/// ```
/// # use rust_deferred_logger::prelude::*;
/// # let logger = Logger::builder().discard_output().build();
/// use rust_deferred_logger::trace;
/// let entry = logger.entry();
/// trace!(entry, "Variable value: {}", 42);
/// assert_eq!(entry.pending_trace_lines(), 1);
/// ```
#[macro_export]
macro_rules! trace {
    ($entry:expr, $($arg:tt)+) => {
        $entry.tracef(format_args!($($arg)+))
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($entry:expr, $($arg:tt)+) => {
        $entry.debug(format_args!($($arg)+))
    };
}

/// Log an info-level message.
///
/// ```
/// # use rust_deferred_logger::prelude::*;
/// # let logger = Logger::builder().discard_output().build();
/// use rust_deferred_logger::info;
/// info!(logger.entry(), "Processing {} items", 100);
/// ```
#[macro_export]
macro_rules! info {
    ($entry:expr, $($arg:tt)+) => {
        $entry.info(format_args!($($arg)+))
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($entry:expr, $($arg:tt)+) => {
        $entry.warn(format_args!($($arg)+))
    };
}

/// Log an error, optionally with a formatted message in place of its text.
///
/// ```
/// # use rust_deferred_logger::prelude::*;
/// # let logger = Logger::builder().discard_output().build();
/// use rust_deferred_logger::error;
/// let entry = logger.entry();
/// error!(entry, "connection refused");
/// error!(entry, "connection refused", "retry {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! error {
    ($entry:expr, $err:expr) => {
        $entry.error($err)
    };
    ($entry:expr, $err:expr, $($arg:tt)+) => {
        $entry.errorf($err, format_args!($($arg)+))
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{ColorMode, HumanFormatter, Logger};
    use parking_lot::Mutex;
    use std::io::Write;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn logger(out: &SharedBuf) -> Logger {
        Logger::builder()
            .output(out.clone())
            .formatter(HumanFormatter::new().with_colors(ColorMode::Never))
            .build()
    }

    #[test]
    fn test_info_and_warn_macros() {
        let out = SharedBuf::default();
        let logger = logger(&out);
        let entry = logger.entry();

        info!(entry, "Items: {}", 100);
        warn!(entry, "Retry {} of {}", 1, 3);
        debug!(entry, "hidden {}", 0);

        let contents = String::from_utf8(out.0.lock().clone()).unwrap();
        assert!(contents.contains("INFO: Items: 100"));
        assert!(contents.contains("WARN: Retry 1 of 3"));
        assert!(!contents.contains("hidden"));
    }

    #[test]
    fn test_trace_and_error_macros() {
        let out = SharedBuf::default();
        let logger = logger(&out);
        let entry = logger.entry();

        trace!(entry, "step {}", 1);
        error!(entry, "disk full", "write failed after {} bytes", 512);

        let contents = String::from_utf8(out.0.lock().clone()).unwrap();
        let step = contents.find("DEBU: step 1").expect("trace dumped");
        let err = contents.find("ERRO: write failed after 512 bytes").expect("error logged");
        assert!(step < err);
        assert!(contents.contains("Error: disk full"));
    }
}
