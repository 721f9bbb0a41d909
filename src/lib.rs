//! # Rust Deferred Logger
//!
//! Structured logging that keeps low-priority detail out of the log until it
//! matters. Trace lines are buffered per entry and dumped, in order, right
//! before the next error logged on that entry.
//!
//! ## Features
//!
//! - **Deferred tracing**: trace output only appears next to the error it explains
//! - **Stack traces**: errors are enriched with a captured call stack when attached
//! - **Redaction**: emails, passwords, tokens and credentials are filtered on every path
//! - **Hooks**: queued aggregator and crash-report sinks with flush barriers
//!
//! ```
//! use rust_deferred_logger::prelude::*;
//!
//! let logger = Logger::builder().discard_output().build();
//! let entry = logger.module("tasks").with_field("task_id", 7);
//! entry.trace("loaded task");
//! entry.error("db unavailable");
//! logger.flush();
//! ```

pub mod core;
pub mod hooks;
pub mod macros;

pub use crate::core::{panic, standard};

pub mod prelude {
    pub use crate::core::{
        ColorMode, Entry, FieldValue, Fields, Flush, Formatter, Hook, HumanFormatter,
        JsonFormatter, LogLevel, Logger, LoggerBuilder, LoggerConfig, LoggerError, OutputFormat,
        OverflowPolicy, Record, Redactor, Result, StackFilter, TimestampFormat, TracedError,
    };
    pub use crate::hooks::{AggregatorHook, CrashReportHook, TcpTransport};
}

pub use crate::core::{
    BoxError, ColorMode, Entry, FieldValue, Fields, Flush, Formatter, Hook, HookMetrics,
    HumanFormatter, JsonFormatter, LogLevel, Logger, LoggerBuilder, LoggerConfig, LoggerError,
    OutputFormat, OverflowPolicy, Record, Redactor, Result, StackFilter, StackTrace,
    TimestampFormat, TracedError,
};
