//! Per-statement log entries
//!
//! An [`Entry`] carries fields and an optional error. Every `with_*` call
//! returns a new entry; the only state shared between an entry and the
//! entries derived from it is the deferred trace buffer, so lines traced on
//! any of them are dumped by the first error logged on any of them.

use super::field::{
    FieldValue, Fields, FIELD_DD_SPAN_ID, FIELD_DD_TRACE_ID, FIELD_ERROR_TRACE,
    FIELD_HTTP_REQUEST, FIELD_MODULE, FIELD_TAGS,
};
use super::log_level::LogLevel;
use super::logger::Logger;
use super::record::Record;
use super::request::RequestSnapshot;
use super::stacktrace::{enrich, BoxError, NilError, SharedError};
use super::trace_buffer::TraceHandle;
use std::fmt;
use std::sync::Arc;

/// Releases the buffer's arena slot once the last entry sharing it is gone
struct SharedTrace<'a> {
    logger: &'a Logger,
    handle: TraceHandle,
}

impl Drop for SharedTrace<'_> {
    fn drop(&mut self) {
        if self.handle.was_used() {
            self.logger.discard_trace(self.handle.id());
        }
    }
}

#[derive(Clone)]
pub struct Entry<'a> {
    logger: &'a Logger,
    fields: Fields,
    error: Option<SharedError>,
    trace: Arc<SharedTrace<'a>>,
}

impl<'a> Entry<'a> {
    pub fn new(logger: &'a Logger) -> Self {
        Self {
            logger,
            fields: Fields::new(),
            error: None,
            trace: Arc::new(SharedTrace {
                logger,
                handle: TraceHandle::new(),
            }),
        }
    }

    pub fn logger(&self) -> &'a Logger {
        self.logger
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn attached_error(&self) -> Option<&SharedError> {
        self.error.as_ref()
    }

    #[must_use]
    pub fn with_field(&self, key: impl Into<String>, value: impl Into<FieldValue>) -> Entry<'a> {
        let mut entry = self.clone();
        entry.fields.insert(key, value);
        entry
    }

    #[must_use]
    pub fn with_fields(&self, fields: Fields) -> Entry<'a> {
        let mut entry = self.clone();
        entry.fields.extend(fields);
        entry
    }

    /// Attach an error, capturing a stack unless its chain already has one
    #[must_use]
    pub fn with_error(&self, err: impl Into<BoxError>) -> Entry<'a> {
        let mut entry = self.clone();
        entry.error = Some(enrich(err.into()));
        entry
    }

    /// Like [`Entry::with_error`]; `None` attaches the `(nil)` sentinel
    #[must_use]
    pub fn with_maybe_error<E: Into<BoxError>>(&self, err: Option<E>) -> Entry<'a> {
        match err {
            Some(err) => self.with_error(err),
            None => self.with_error(NilError),
        }
    }

    #[must_use]
    pub fn module(&self, name: impl Into<String>) -> Entry<'a> {
        self.with_field(FIELD_MODULE, name.into())
    }

    pub fn module_name(&self) -> Option<&str> {
        self.fields.get(FIELD_MODULE).and_then(FieldValue::as_str)
    }

    /// Attach a snapshot of an inbound request, credentials filtered
    #[must_use]
    pub fn with_http_request<B: AsRef<[u8]>>(&self, req: &http::Request<B>) -> Entry<'a> {
        let snapshot = RequestSnapshot::capture(req, self.logger.redactor());
        self.with_field(FIELD_HTTP_REQUEST, snapshot)
    }

    /// Merge into the `tags` map read by crash reporting hooks
    #[must_use]
    pub fn with_tags(&self, tags: Fields) -> Entry<'a> {
        let mut entry = self.clone();
        let mut merged = match entry.fields.remove(FIELD_TAGS) {
            Some(FieldValue::Map(existing)) => existing,
            _ => Default::default(),
        };
        merged.extend(tags.into_inner());
        entry.fields.insert(FIELD_TAGS, merged);
        entry
    }

    /// Correlate with an APM trace
    #[must_use]
    pub fn with_trace_context(&self, trace_id: u64, span_id: u64) -> Entry<'a> {
        let mut entry = self.clone();
        entry.fields.insert(FIELD_DD_TRACE_ID, trace_id);
        entry.fields.insert(FIELD_DD_SPAN_ID, span_id);
        entry
    }

    fn record(&self, level: LogLevel, message: impl fmt::Display) -> Record {
        Record::new(level, message.to_string())
            .with_fields(self.fields.clone())
            .with_error(self.error.clone())
    }

    /// Buffer a line until the next error, or log it at debug level right
    /// away when the threshold includes debug
    pub fn trace(&self, message: impl fmt::Display) {
        if self.logger.debug_enabled() {
            self.debug(message);
            return;
        }
        if let Some(line) = self.logger.render(self.record(LogLevel::Debug, message)) {
            self.trace.handle.mark_used();
            self.logger.buffer_trace(self.trace.handle.id(), line);
        }
    }

    pub fn tracef(&self, args: fmt::Arguments<'_>) {
        self.trace(args);
    }

    fn log(&self, level: LogLevel, message: impl fmt::Display) {
        if level < self.logger.level() {
            return;
        }
        self.logger.emit(self.record(level, message));
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.log(LogLevel::Warn, message);
    }

    /// Dump buffered trace lines, then log `err` with its stack. The message
    /// is the error's own text.
    pub fn error(&self, err: impl Into<BoxError>) {
        self.log_error(err.into(), None);
    }

    pub fn errorf(&self, err: impl Into<BoxError>, message: impl fmt::Display) {
        self.log_error(err.into(), Some(message.to_string()));
    }

    fn log_error(&self, err: BoxError, message: Option<String>) {
        let mut output = self.logger.lock_output();

        let mut dump = Vec::new();
        for line in self.logger.drain_trace(self.trace.handle.id()) {
            output.write_line(&line);
            dump.extend_from_slice(&line);
        }

        let mut entry = self.clone();
        entry.error = Some(enrich(err));
        if !dump.is_empty() {
            entry
                .fields
                .insert(FIELD_ERROR_TRACE, String::from_utf8_lossy(&dump).into_owned());
        }

        let message = match (message, entry.error.as_ref()) {
            (Some(message), _) => message,
            (None, Some(err)) => err.to_string(),
            (None, None) => String::new(),
        };
        let record = entry.record(LogLevel::Error, message);
        self.logger.emit_locked(&mut output, record);
    }

    /// Throw away buffered trace lines without logging them
    pub fn clear_trace_log(&self) {
        self.logger.discard_trace(self.trace.handle.id());
    }

    /// Lines currently waiting in this entry's trace buffer
    pub fn pending_trace_lines(&self) -> usize {
        self.logger.pending_trace(self.trace.handle.id())
    }
}

impl fmt::Debug for Entry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("fields", &self.fields)
            .field("error", &self.error.as_ref().map(|e| e.to_string()))
            .field("trace_buffer", &self.trace.handle.id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::formatter::{ColorMode, HumanFormatter};
    use parking_lot::Mutex;
    use std::io::Write;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

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
    fn test_trace_is_deferred_until_error() {
        let out = SharedBuf::default();
        let logger = logger(&out);
        let entry = logger.entry();

        entry.trace("step one");
        entry.trace("step two");
        assert!(out.contents().is_empty());
        assert_eq!(entry.pending_trace_lines(), 2);

        entry.error("db unavailable");
        let contents = out.contents();
        let one = contents.find("step one").expect("first line dumped");
        let two = contents.find("step two").expect("second line dumped");
        let err = contents.find("ERRO: db unavailable").expect("error logged");
        assert!(one < two && two < err);
        assert_eq!(entry.pending_trace_lines(), 0);
    }

    #[test]
    fn test_debug_threshold_writes_trace_immediately() {
        let out = SharedBuf::default();
        let logger = Logger::builder()
            .level(LogLevel::Debug)
            .output(out.clone())
            .formatter(HumanFormatter::new().with_colors(ColorMode::Never))
            .build();

        let entry = logger.entry();
        entry.trace("visible now");
        assert!(out.contents().contains("DEBU: visible now"));
        assert_eq!(entry.pending_trace_lines(), 0);
    }

    #[test]
    fn test_with_field_does_not_mutate_parent() {
        let logger = Logger::builder().discard_output().build();
        let parent = logger.entry().with_field("a", 1);
        let child = parent.with_field("a", 2).with_field("b", 3);

        assert_eq!(parent.fields().get("a"), Some(&FieldValue::from(1)));
        assert!(parent.fields().get("b").is_none());
        assert_eq!(child.fields().get("a"), Some(&FieldValue::from(2)));
    }

    #[test]
    fn test_derived_entries_share_trace_buffer() {
        let out = SharedBuf::default();
        let logger = logger(&out);
        let parent = logger.module("tasks");

        parent.trace("from parent");
        parent.with_field("id", 1).trace("from child");
        assert_eq!(parent.pending_trace_lines(), 2);

        parent.with_field("id", 1).error("failed");
        assert!(out.contents().contains("from parent"));
        assert!(out.contents().contains("from child"));
    }

    #[test]
    fn test_clear_trace_log() {
        let out = SharedBuf::default();
        let logger = logger(&out);
        let entry = logger.entry();

        entry.trace("never shown");
        entry.clear_trace_log();
        entry.error("boom");

        assert!(!out.contents().contains("never shown"));
    }

    #[test]
    fn test_nil_error_sentinel() {
        let logger = Logger::builder().discard_output().build();
        let entry = logger.entry().with_maybe_error(None::<std::io::Error>);
        assert_eq!(entry.attached_error().map(|e| e.to_string()).as_deref(), Some("(nil)"));
    }

    #[test]
    fn test_tags_merge() {
        let logger = Logger::builder().discard_output().build();
        let entry = logger
            .entry()
            .with_tags(Fields::new().with("team", "core"))
            .with_tags(Fields::new().with("tier", "gold"));

        match entry.fields().get(FIELD_TAGS) {
            Some(FieldValue::Map(tags)) => {
                assert_eq!(tags.len(), 2);
                assert_eq!(tags["team"], FieldValue::from("core"));
            }
            other => panic!("unexpected tags: {:?}", other),
        }
    }

    #[test]
    fn test_trace_context_and_module() {
        let logger = Logger::builder().discard_output().build();
        let entry = logger.module("billing").with_trace_context(11, 22);
        assert_eq!(entry.module_name(), Some("billing"));
        assert_eq!(entry.fields().get(FIELD_DD_TRACE_ID), Some(&FieldValue::UInt(11)));
        assert_eq!(entry.fields().get(FIELD_DD_SPAN_ID), Some(&FieldValue::UInt(22)));
    }

    #[test]
    fn test_dropping_entries_releases_buffer() {
        let logger = Logger::builder().discard_output().build();
        {
            let entry = logger.entry();
            entry.trace("abandoned");
        }
        assert!(logger.traces_is_empty());
    }
}
