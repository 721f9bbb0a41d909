//! Core logger types and traits

pub mod config;
pub mod dispatch;
pub mod entry;
pub mod error;
pub mod field;
pub mod formatter;
pub mod hook;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod overflow_policy;
pub mod panic;
pub mod record;
pub mod redact;
pub mod request;
pub mod stacktrace;
pub mod standard;
pub mod timestamp;
pub mod trace_buffer;

pub use config::{AggregatorConfig, CrashConfig, FrameRuleConfig, LoggerConfig};
pub use dispatch::HookSet;
pub use entry::Entry;
pub use error::{LoggerError, Result};
pub use field::{
    FieldValue, Fields, FIELD_DD_SPAN_ID, FIELD_DD_TRACE_ID, FIELD_ERROR, FIELD_ERROR_TRACE,
    FIELD_HTTP_REQUEST, FIELD_MODULE, FIELD_TAGS,
};
pub use formatter::{ColorMode, Formatter, HumanFormatter, JsonFormatter, OutputFormat};
pub use hook::{Flush, Hook};
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerBuilder};
pub use metrics::HookMetrics;
pub use overflow_policy::OverflowPolicy;
pub use panic::{install_panic_hook, recover, PanicError};
pub use record::Record;
pub use redact::{RedactionRule, Redactor, Replacement, FILTERED};
pub use request::{RequestProjection, RequestSnapshot};
pub use stacktrace::{
    earliest_tracer, enrich, root_cause, BoxError, FilterAction, Frame, FrameRule, NilError,
    SharedError, StackFilter, StackTrace, TracedError,
};
pub use timestamp::TimestampFormat;
pub use trace_buffer::{TraceArena, TraceHandle};
