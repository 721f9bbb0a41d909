//! Main logger implementation

use super::{
    dispatch::HookSet,
    entry::Entry,
    field::{FieldValue, Fields},
    formatter::{Formatter, HumanFormatter},
    hook::{Flush, Hook},
    log_level::LogLevel,
    record::Record,
    redact::Redactor,
    stacktrace::BoxError,
    trace_buffer::TraceArena,
};
use parking_lot::{Mutex, MutexGuard};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

const BUSY_OUTPUT_TIMEOUT: Duration = Duration::from_millis(250);

/// Output destination and the fallback used for the logger's own diagnostics
pub(crate) struct OutputState {
    pub(crate) writer: Box<dyn Write + Send>,
    pub(crate) fallback: Box<dyn Write + Send>,
}

impl OutputState {
    pub(crate) fn write_line(&mut self, bytes: &[u8]) {
        if let Err(e) = self.writer.write_all(bytes) {
            let _ = writeln!(self.fallback, "[LOGGER ERROR] Failed to write to log: {}", e);
        }
    }
}

/// A logger owning one output, one formatter and an ordered set of hooks
///
/// Configuration happens through `&mut self` setters or [`LoggerBuilder`]
/// before the logger is shared; logging only needs `&self`.
///
/// # Example
///
/// ```
/// use rust_deferred_logger::Logger;
///
/// let logger = Logger::builder().discard_output().build();
/// let entry = logger.module("tasks").with_field("task_id", 17);
/// entry.trace("loading task");
/// entry.info("task created");
/// logger.flush();
/// ```
pub struct Logger {
    level: LogLevel,
    output: Mutex<OutputState>,
    traces: Mutex<TraceArena>,
    formatter: Arc<dyn Formatter>,
    redactor: Redactor,
    hooks: HookSet,
}

impl Logger {
    /// A logger writing human-readable records to stderr at `Info`
    #[must_use]
    pub fn new() -> Self {
        Self {
            level: LogLevel::Info,
            output: Mutex::new(OutputState {
                writer: Box::new(std::io::stderr()),
                fallback: Box::new(std::io::stderr()),
            }),
            traces: Mutex::new(TraceArena::new()),
            formatter: Arc::new(HumanFormatter::new()),
            redactor: Redactor::default(),
            hooks: HookSet::new(),
        }
    }

    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub fn set_output<W: Write + Send + 'static>(&mut self, writer: W) {
        self.output.get_mut().writer = Box::new(writer);
    }

    /// Destination for `[LOGGER ERROR]` diagnostics
    pub fn set_fallback<W: Write + Send + 'static>(&mut self, writer: W) {
        self.output.get_mut().fallback = Box::new(writer);
    }

    pub fn set_formatter<F: Formatter + 'static>(&mut self, formatter: F) {
        self.formatter = Arc::new(formatter);
    }

    pub fn set_redactor(&mut self, redactor: Redactor) {
        self.redactor = redactor;
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.level = level;
    }

    /// Write trace lines immediately as debug records instead of buffering
    pub fn enable_debug(&mut self, enabled: bool) {
        self.level = if enabled { LogLevel::Debug } else { LogLevel::Info };
    }

    pub fn add_hook(&mut self, hook: Arc<dyn Hook>) {
        self.hooks.add_hook(hook);
    }

    /// Register a hook that also has queued work for [`Logger::flush`]
    pub fn add_async_hook<H: Hook + Flush + 'static>(&mut self, hook: Arc<H>) {
        self.hooks.add_hook(Arc::clone(&hook) as Arc<dyn Hook>);
        self.hooks.add_flusher(hook);
    }

    pub fn add_flusher(&mut self, flusher: Arc<dyn Flush>) {
        self.hooks.add_flusher(flusher);
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn debug_enabled(&self) -> bool {
        self.level <= LogLevel::Debug
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    pub fn formatter_name(&self) -> &str {
        self.formatter.name()
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.hook_count()
    }

    pub fn entry(&self) -> Entry<'_> {
        Entry::new(self)
    }

    pub fn module(&self, name: impl Into<String>) -> Entry<'_> {
        self.entry().module(name)
    }

    pub fn with_field(&self, key: impl Into<String>, value: impl Into<FieldValue>) -> Entry<'_> {
        self.entry().with_field(key, value)
    }

    pub fn with_fields(&self, fields: Fields) -> Entry<'_> {
        self.entry().with_fields(fields)
    }

    pub fn with_error(&self, err: impl Into<BoxError>) -> Entry<'_> {
        self.entry().with_error(err)
    }

    /// Block until the output is flushed and every queued hook has drained
    ///
    /// Waits for an in-flight error drain to finish first, since both take
    /// the output lock.
    pub fn flush(&self) {
        {
            let mut output = self.output.lock();
            if let Err(e) = output.writer.flush() {
                let _ = writeln!(output.fallback, "[LOGGER ERROR] Failed to flush log: {}", e);
            }
        }
        self.hooks.flush_all();
    }

    pub(crate) fn lock_output(&self) -> MutexGuard<'_, OutputState> {
        self.output.lock()
    }

    /// Redact, format and write `record`, then hand it to every hook.
    /// Formatting failures are reported on the fallback and the hooks still
    /// receive the record.
    pub(crate) fn emit_locked(&self, output: &mut OutputState, mut record: Record) {
        record.redact(&self.redactor);
        match self.formatter.format(&record) {
            Ok(bytes) => output.write_line(&bytes),
            Err(e) => {
                let _ = writeln!(output.fallback, "[LOGGER ERROR] Failed to format record: {}", e);
            }
        }
        self.hooks.deliver(&record, &mut output.fallback);
    }

    /// Emit unless the output lock stays busy, as when a hook panics on the
    /// thread delivering an error
    pub(crate) fn try_emit(&self, record: Record) -> bool {
        match self.output.try_lock_for(BUSY_OUTPUT_TIMEOUT) {
            Some(mut output) => {
                self.emit_locked(&mut output, record);
                true
            }
            None => {
                eprintln!("[LOGGER ERROR] Output busy, record not written: {}", record.message);
                false
            }
        }
    }

    pub(crate) fn emit(&self, record: Record) {
        let mut output = self.output.lock();
        self.emit_locked(&mut output, record);
    }

    /// Render a trace line without touching the output lock
    pub(crate) fn render(&self, mut record: Record) -> Option<Vec<u8>> {
        record.redact(&self.redactor);
        match self.formatter.format(&record) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                let mut output = self.output.lock();
                let _ = writeln!(output.fallback, "[LOGGER ERROR] Failed to format record: {}", e);
                None
            }
        }
    }

    pub(crate) fn buffer_trace(&self, id: u64, line: Vec<u8>) {
        self.traces.lock().push(id, line);
    }

    /// Caller must hold the output lock
    pub(crate) fn drain_trace(&self, id: u64) -> Vec<Vec<u8>> {
        self.traces.lock().drain(id)
    }

    pub(crate) fn discard_trace(&self, id: u64) {
        self.traces.lock().discard(id);
    }

    pub(crate) fn pending_trace(&self, id: u64) -> usize {
        self.traces.lock().pending(id)
    }

    #[cfg(test)]
    pub(crate) fn traces_is_empty(&self) -> bool {
        self.traces.lock().is_empty()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use rust_deferred_logger::prelude::*;
///
/// let logger = Logger::builder()
///     .level(LogLevel::Debug)
///     .output(std::io::sink())
///     .formatter(JsonFormatter::new())
///     .build();
/// ```
pub struct LoggerBuilder {
    level: LogLevel,
    output: Option<Box<dyn Write + Send>>,
    fallback: Option<Box<dyn Write + Send>>,
    formatter: Option<Arc<dyn Formatter>>,
    redactor: Redactor,
    hooks: HookSet,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            level: LogLevel::Info,
            output: None,
            fallback: None,
            formatter: None,
            redactor: Redactor::default(),
            hooks: HookSet::new(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn output<W: Write + Send + 'static>(mut self, writer: W) -> Self {
        self.output = Some(Box::new(writer));
        self
    }

    /// Drop primary output; hooks still receive every record
    #[must_use = "builder methods return a new value"]
    pub fn discard_output(self) -> Self {
        self.output(std::io::sink())
    }

    #[must_use = "builder methods return a new value"]
    pub fn fallback<W: Write + Send + 'static>(mut self, writer: W) -> Self {
        self.fallback = Some(Box::new(writer));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn formatter<F: Formatter + 'static>(mut self, formatter: F) -> Self {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn boxed_formatter(mut self, formatter: Box<dyn Formatter>) -> Self {
        self.formatter = Some(Arc::from(formatter));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn redactor(mut self, redactor: Redactor) -> Self {
        self.redactor = redactor;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn hook<H: Hook + 'static>(mut self, hook: H) -> Self {
        self.hooks.add_hook(Arc::new(hook));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn async_hook<H: Hook + Flush + 'static>(mut self, hook: Arc<H>) -> Self {
        self.hooks.add_hook(Arc::clone(&hook) as Arc<dyn Hook>);
        self.hooks.add_flusher(hook);
        self
    }

    pub fn build(self) -> Logger {
        Logger {
            level: self.level,
            output: Mutex::new(OutputState {
                writer: self.output.unwrap_or_else(|| Box::new(std::io::stderr())),
                fallback: self.fallback.unwrap_or_else(|| Box::new(std::io::stderr())),
            }),
            traces: Mutex::new(TraceArena::new()),
            formatter: self
                .formatter
                .unwrap_or_else(|| Arc::new(HumanFormatter::new())),
            redactor: self.redactor,
            hooks: self.hooks,
        }
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{LoggerError, Result};
    use crate::core::formatter::ColorMode;

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

    struct BrokenFormatter;

    impl Formatter for BrokenFormatter {
        fn format(&self, _record: &Record) -> Result<Vec<u8>> {
            Err(LoggerError::formatter("broken", "cannot render"))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    struct Counting(Arc<Mutex<usize>>);

    impl Hook for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn deliver(&self, _record: &Record) -> Result<()> {
            *self.0.lock() += 1;
            Ok(())
        }
    }

    #[test]
    fn test_builder_defaults() {
        let logger = Logger::builder().build();
        assert_eq!(logger.level(), LogLevel::Info);
        assert!(!logger.debug_enabled());
        assert_eq!(logger.formatter_name(), "human");
        assert_eq!(logger.hook_count(), 0);
    }

    #[test]
    fn test_enable_debug() {
        let mut logger = Logger::new();
        logger.enable_debug(true);
        assert!(logger.debug_enabled());
        logger.enable_debug(false);
        assert_eq!(logger.level(), LogLevel::Info);
    }

    #[test]
    fn test_format_failure_reaches_fallback_and_hooks() {
        let out = SharedBuf::default();
        let fallback = SharedBuf::default();
        let delivered = Arc::new(Mutex::new(0));
        let logger = Logger::builder()
            .output(out.clone())
            .fallback(fallback.clone())
            .formatter(BrokenFormatter)
            .hook(Counting(Arc::clone(&delivered)))
            .build();

        logger.entry().info("hello");

        assert!(out.contents().is_empty());
        assert!(fallback
            .contents()
            .contains("[LOGGER ERROR] Failed to format record: Formatter error (broken)"));
        assert_eq!(*delivered.lock(), 1);
    }

    #[test]
    fn test_below_threshold_is_skipped() {
        let out = SharedBuf::default();
        let logger = Logger::builder()
            .level(LogLevel::Warn)
            .output(out.clone())
            .formatter(HumanFormatter::new().with_colors(ColorMode::Never))
            .build();

        logger.entry().info("quiet");
        logger.entry().warn("loud");

        let contents = out.contents();
        assert!(!contents.contains("quiet"));
        assert!(contents.contains("WARN: loud"));
    }
}
