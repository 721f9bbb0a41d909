//! Errors returned by logger setup, formatters and transports
//!
//! Nothing in the logging path itself returns these to the caller; hook and
//! transport failures end up as `[LOGGER ERROR]` diagnostics.

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// An IO failure with what was being attempted
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid redaction or stack filter pattern
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Rejected at setup, for example an enabled sink without an address
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    #[error("Formatter error ({format_type}): {message}")]
    FormatterError {
        format_type: String,
        message: String,
    },

    /// A sink could not deliver a record
    #[error("Delivery to '{hook}' failed: {message}")]
    DeliveryError { hook: String, message: String },

    /// The process-wide logger was already set
    #[error("Standard logger already initialized")]
    AlreadyInitialized,

    /// The hook's worker is gone
    #[error("Failed to send payload to hook worker")]
    ChannelSendError,

    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn formatter(format_type: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FormatterError {
            format_type: format_type.into(),
            message: message.into(),
        }
    }

    pub fn delivery(hook: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::DeliveryError {
            hook: hook.into(),
            message: message.into(),
        }
    }

    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}
