//! Record formatters
//!
//! [`HumanFormatter`] renders the terminal-friendly layout:
//!
//! ```text
//! Jan 08 10:30:45 [4242] ERRO: (tasks) could not save task
//! 	task_id=17 user="alice"
//! 	Error: db unavailable
//! 	Stacktrace:
//! 		app::tasks::save (src/tasks.rs:40)
//! ```
//!
//! [`JsonFormatter`] emits one JSON object per record. Both run a final
//! redaction pass over the rendered bytes.

use super::error::{LoggerError, Result};
use super::field::{FieldValue, FIELD_ERROR, FIELD_HTTP_REQUEST, FIELD_MODULE};
use super::record::Record;
use super::redact::Redactor;
use super::stacktrace::StackFilter;
use super::timestamp::TimestampFormat;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io::IsTerminal;

pub trait Formatter: Send + Sync {
    fn format(&self, record: &Record) -> Result<Vec<u8>>;
    fn name(&self) -> &str;
}

/// Output format selectable from configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

impl OutputFormat {
    pub fn formatter(&self, stack_filter: StackFilter) -> Box<dyn Formatter> {
        match self {
            OutputFormat::Human => Box::new(HumanFormatter::new().with_stack_filter(stack_filter)),
            OutputFormat::Json => Box::new(JsonFormatter::new().with_stack_filter(stack_filter)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Colorize when stdout is a terminal
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn enabled(&self) -> bool {
        match self {
            ColorMode::Auto => std::io::stdout().is_terminal(),
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HumanFormatter {
    timestamp_format: TimestampFormat,
    colors: ColorMode,
    stack_filter: StackFilter,
    redactor: Redactor,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self {
            timestamp_format: TimestampFormat::Human,
            colors: ColorMode::Auto,
            stack_filter: StackFilter::new(),
            redactor: Redactor::default(),
        }
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use]
    pub fn with_colors(mut self, colors: ColorMode) -> Self {
        self.colors = colors;
        self
    }

    #[must_use]
    pub fn with_stack_filter(mut self, filter: StackFilter) -> Self {
        self.stack_filter = filter;
        self
    }

    #[must_use]
    pub fn with_redactor(mut self, redactor: Redactor) -> Self {
        self.redactor = redactor;
        self
    }

    #[cfg(feature = "console")]
    fn paint(&self, text: &str, record: &Record, colored: bool) -> String {
        use colored::Colorize;
        if colored {
            text.color(record.level.color_code()).to_string()
        } else {
            text.to_string()
        }
    }

    #[cfg(not(feature = "console"))]
    fn paint(&self, text: &str, _record: &Record, _colored: bool) -> String {
        text.to_string()
    }

    fn write_header(&self, out: &mut String, record: &Record, colored: bool) -> Result<()> {
        let time = self.timestamp_format.format(&record.timestamp)?;
        let module = record
            .module()
            .map(|m| format!(" ({})", m))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{} [{}] {}:{} {}",
            time,
            std::process::id(),
            self.paint(record.level.tag(), record, colored),
            module,
            record.message
        );
        Ok(())
    }

    fn write_fields(&self, out: &mut String, record: &Record) {
        let pairs: Vec<String> = record
            .fields
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), FIELD_MODULE | FIELD_HTTP_REQUEST | FIELD_ERROR))
            .map(|(k, v)| match v {
                FieldValue::String(s) => format!("{}={:?}", k, s),
                other => format!("{}={}", k, other.to_json_value()),
            })
            .collect();
        if !pairs.is_empty() {
            let _ = writeln!(out, "\t{}", pairs.join(" "));
        }
    }

    fn write_error(&self, out: &mut String, record: &Record) {
        let Some(text) = record.error_text() else {
            return;
        };
        let _ = writeln!(out, "\tError: {}", text);
        if let Some(cause) = record.cause_text() {
            let _ = writeln!(out, "\tCause: {}", cause);
        }
        if let Some(stack) = record.stack_trace() {
            let stack = stack.filtered(&self.stack_filter);
            out.push_str("\tStacktrace:\n");
            for frame in stack.frames() {
                let _ = writeln!(out, "\t\t{}", frame);
            }
        }
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for HumanFormatter {
    fn format(&self, record: &Record) -> Result<Vec<u8>> {
        let colored = self.colors.enabled();
        let mut out = String::with_capacity(128);
        self.write_header(&mut out, record, colored)?;
        self.write_fields(&mut out, record);
        self.write_error(&mut out, record);
        Ok(self.redactor.redact(&out).into_owned().into_bytes())
    }

    fn name(&self) -> &str {
        "human"
    }
}

const JSON_TIME: &str = "time";
const JSON_LEVEL: &str = "level";
const JSON_MESSAGE: &str = "msg";
const JSON_STACKTRACE: &str = "stacktrace";

#[derive(Debug, Clone)]
pub struct JsonFormatter {
    timestamp_format: TimestampFormat,
    pretty: bool,
    stack_filter: StackFilter,
    redactor: Redactor,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {
            timestamp_format: TimestampFormat::Rfc3339,
            pretty: false,
            stack_filter: StackFilter::new(),
            redactor: Redactor::default(),
        }
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use]
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    #[must_use]
    pub fn with_stack_filter(mut self, filter: StackFilter) -> Self {
        self.stack_filter = filter;
        self
    }

    #[must_use]
    pub fn with_redactor(mut self, redactor: Redactor) -> Self {
        self.redactor = redactor;
        self
    }

    fn to_value(&self, record: &Record) -> Result<serde_json::Value> {
        let mut obj = serde_json::Map::new();
        for (key, value) in &record.fields {
            let key = match key.as_str() {
                JSON_TIME | JSON_LEVEL | JSON_MESSAGE | JSON_STACKTRACE => format!("fields.{}", key),
                FIELD_ERROR if record.error.is_some() => format!("fields.{}", key),
                _ => key.clone(),
            };
            obj.insert(key, value.to_json_value());
        }

        obj.insert(
            JSON_TIME.to_string(),
            self.timestamp_format.to_json_value(&record.timestamp)?,
        );
        obj.insert(JSON_LEVEL.to_string(), record.level.as_str().into());
        obj.insert(JSON_MESSAGE.to_string(), record.message.clone().into());

        if let Some(text) = record.error_text() {
            obj.insert(FIELD_ERROR.to_string(), text.into());
        }
        if let Some(stack) = record.stack_trace() {
            let frames: Vec<serde_json::Value> = stack
                .filtered(&self.stack_filter)
                .frames()
                .iter()
                .map(|f| f.to_string().into())
                .collect();
            obj.insert(JSON_STACKTRACE.to_string(), serde_json::Value::Array(frames));
        }
        Ok(serde_json::Value::Object(obj))
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, record: &Record) -> Result<Vec<u8>> {
        let value = self.to_value(record)?;
        let mut bytes = if self.pretty {
            serde_json::to_vec_pretty(&value)
        } else {
            serde_json::to_vec(&value)
        }
        .map_err(|e| LoggerError::formatter("json", e.to_string()))?;
        bytes.push(b'\n');
        Ok(self.redactor.redact_bytes(&bytes))
    }

    fn name(&self) -> &str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::Fields;
    use crate::core::log_level::LogLevel;
    use crate::core::stacktrace::enrich;

    fn human() -> HumanFormatter {
        HumanFormatter::new().with_colors(ColorMode::Never)
    }

    fn render(formatter: &dyn Formatter, record: &Record) -> String {
        String::from_utf8(formatter.format(record).unwrap()).unwrap()
    }

    #[test]
    fn test_human_header_layout() {
        let record = Record::new(LogLevel::Info, "task created")
            .with_fields(Fields::new().with("module", "tasks"));
        let out = render(&human(), &record);

        let expected = format!("[{}] INFO: (tasks) task created\n", std::process::id());
        assert!(out.ends_with(&expected), "unexpected output: {:?}", out);
    }

    #[test]
    fn test_human_fields_sorted_and_quoted() {
        let record = Record::new(LogLevel::Warn, "slow").with_fields(
            Fields::new()
                .with("user", "alice")
                .with("attempts", 3)
                .with("module", "db"),
        );
        let out = render(&human(), &record);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "\tattempts=3 user=\"alice\"");
    }

    #[test]
    fn test_human_error_block() {
        let record =
            Record::new(LogLevel::Error, "could not save").with_error(Some(enrich("db unavailable".into())));
        let out = render(&human(), &record);

        assert!(out.contains("ERRO:"));
        assert!(out.contains("\tError: db unavailable\n"));
        assert!(!out.contains("\tCause:"));
        assert!(out.contains("\tStacktrace:\n\t\t"));
    }

    #[test]
    fn test_human_output_is_redacted() {
        let record = Record::new(LogLevel::Info, "retry")
            .with_fields(Fields::new().with("query", "password=abc123"));
        let out = render(&human(), &record);
        assert!(out.contains("query=\"password=[FILTERED]\""));
        assert!(!out.contains("abc123"));
    }

    #[test]
    fn test_json_keys_and_clashes() {
        let record = Record::new(LogLevel::Warn, "hello")
            .with_fields(Fields::new().with("msg", "shadow").with("id", 7));
        let out = render(&JsonFormatter::new(), &record);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value["msg"], "hello");
        assert_eq!(value["level"], "warning");
        assert_eq!(value["fields.msg"], "shadow");
        assert_eq!(value["id"], 7);
        assert!(value["time"].is_string());
    }

    #[test]
    fn test_json_error_and_stacktrace() {
        let record =
            Record::new(LogLevel::Error, "boom").with_error(Some(enrich("secret=shh".into())));
        let out = render(&JsonFormatter::new(), &record);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value["error"], "secret=[FILTERED]");
        assert!(value["stacktrace"].as_array().is_some_and(|f| !f.is_empty()));
    }

    #[test]
    fn test_output_format_deserialize() {
        let format: OutputFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, OutputFormat::Json);
        assert_eq!(format.formatter(StackFilter::new()).name(), "json");
    }
}
