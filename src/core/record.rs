//! Finished log records

use super::field::{FieldValue, Fields, FIELD_ERROR_TRACE, FIELD_MODULE};
use super::log_level::LogLevel;
use super::redact::Redactor;
use super::stacktrace::{earliest_tracer, root_cause, SharedError, StackTrace};
use chrono::{DateTime, Utc};
use std::error::Error;

/// A record ready for the formatter and the hooks
///
/// Records are built and redacted by the logger, then shared read-only with
/// every destination.
#[derive(Debug, Clone)]
pub struct Record {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub fields: Fields,
    pub error: Option<SharedError>,
    error_text: Option<String>,
}

impl Record {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into().trim().to_string(),
            fields: Fields::new(),
            error: None,
            error_text: None,
        }
    }

    #[must_use]
    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: Option<SharedError>) -> Self {
        self.error_text = error.as_ref().map(|e| e.to_string());
        self.error = error;
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The logical subsystem the record was logged under
    pub fn module(&self) -> Option<&str> {
        self.fields.get(FIELD_MODULE).and_then(FieldValue::as_str)
    }

    /// Trace lines drained into this record, if any
    pub fn trace_dump(&self) -> Option<&str> {
        self.fields.get(FIELD_ERROR_TRACE).and_then(FieldValue::as_str)
    }

    /// The attached error's message, already redacted
    pub fn error_text(&self) -> Option<&str> {
        self.error_text.as_deref()
    }

    /// Message of the deepest cause, when it differs from the error itself
    pub fn cause_text(&self) -> Option<String> {
        let err = self.error.as_deref()?;
        let err: &(dyn Error + 'static) = err;
        err.source()?;
        let cause = root_cause(err).to_string();
        if Some(cause.as_str()) == self.error_text.as_deref() || cause == err.to_string() {
            None
        } else {
            Some(cause)
        }
    }

    /// The stack carried by the outermost traced error in the chain
    pub fn stack_trace(&self) -> Option<&StackTrace> {
        let err = self.error.as_deref()?;
        earliest_tracer(err).map(|t| t.stack_trace())
    }

    /// Scrub the message, fields and error text in place
    pub fn redact(&mut self, redactor: &Redactor) {
        self.message = redactor.redact(&self.message).into_owned();
        redactor.redact_fields(&mut self.fields);
        if let Some(text) = self.error_text.take() {
            self.error_text = Some(redactor.redact(&text).into_owned());
        }
    }
}

impl Redactor {
    pub fn redact_record(&self, record: &mut Record) {
        record.redact(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stacktrace::{enrich, TracedError};
    use std::sync::Arc;

    #[test]
    fn test_message_is_trimmed() {
        let record = Record::new(LogLevel::Info, "  task created \n");
        assert_eq!(record.message, "task created");
    }

    #[test]
    fn test_cause_omitted_when_equal() {
        let record = Record::new(LogLevel::Error, "failed")
            .with_error(Some(enrich("db unavailable".into())));
        assert_eq!(record.error_text(), Some("db unavailable"));
        assert_eq!(record.cause_text(), None);
        assert!(record.stack_trace().is_some());
    }

    #[test]
    fn test_cause_reported_when_distinct() {
        let inner = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
        let err: SharedError = Arc::new(TracedError::wrap("querying tasks", inner));
        let record = Record::new(LogLevel::Error, "failed").with_error(Some(err));
        assert_eq!(record.error_text(), Some("querying tasks"));
        assert_eq!(record.cause_text().as_deref(), Some("connection reset"));
    }

    #[test]
    fn test_redact_record() {
        let mut record = Record::new(LogLevel::Warn, "login password=abc123")
            .with_fields(Fields::new().with("token", "t-1").with("module", "auth"))
            .with_error(Some(enrich("bad secret: xyz".into())));

        Redactor::default().redact_record(&mut record);

        assert_eq!(record.message, "login password=[FILTERED]");
        assert_eq!(record.fields.get("token"), Some(&FieldValue::from("[FILTERED]")));
        assert_eq!(record.error_text(), Some("bad secret: [FILTERED]"));
        assert_eq!(record.module(), Some("auth"));
    }
}
