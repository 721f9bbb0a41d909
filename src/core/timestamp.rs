//! Timestamp formatting utilities
//!
//! Human-readable output uses a short local-time layout (`Jan 02 15:04:05`);
//! structured output defaults to RFC 3339.

use super::error::{LoggerError, Result};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Layout used by [`TimestampFormat::Human`]
pub const HUMAN_TIME_FORMAT: &str = "%b %d %H:%M:%S";

/// How a record's timestamp is rendered
///
/// ```
/// use rust_deferred_logger::TimestampFormat;
/// use chrono::Utc;
///
/// let format: TimestampFormat = serde_json::from_str(r#""rfc3339""#).unwrap();
/// assert!(format.format(&Utc::now()).unwrap().contains('T'));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampFormat {
    /// Local time, month-day-time: `Jan 08 10:30:45`
    #[default]
    Human,

    /// RFC 3339 in UTC: `2025-01-08T10:30:45.123456+00:00`
    Rfc3339,

    /// ISO 8601 with milliseconds: `2025-01-08T10:30:45.123Z`
    Iso8601,

    /// Unix timestamp in milliseconds: `1736332245123`
    UnixMillis,

    /// strftime layout, rendered in UTC
    ///
    /// A layout chrono cannot parse fails at render time, so the record
    /// goes to the fallback instead of the output.
    Custom(String),
}

impl TimestampFormat {
    pub fn format(&self, datetime: &DateTime<Utc>) -> Result<String> {
        Ok(match self {
            TimestampFormat::Human => datetime
                .with_timezone(&Local)
                .format(HUMAN_TIME_FORMAT)
                .to_string(),
            TimestampFormat::Rfc3339 => datetime.to_rfc3339(),
            TimestampFormat::Iso8601 => datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            TimestampFormat::UnixMillis => datetime.timestamp_millis().to_string(),
            TimestampFormat::Custom(layout) => {
                let mut out = String::with_capacity(layout.len() + 16);
                write!(out, "{}", datetime.format(layout)).map_err(|_| {
                    LoggerError::formatter("timestamp", format!("invalid layout {:?}", layout))
                })?;
                out
            }
        })
    }

    /// Render for JSON: numeric formats become numbers
    pub fn to_json_value(&self, datetime: &DateTime<Utc>) -> Result<serde_json::Value> {
        match self {
            TimestampFormat::UnixMillis => Ok(serde_json::Value::Number(
                datetime.timestamp_millis().into(),
            )),
            other => other.format(datetime).map(serde_json::Value::String),
        }
    }
}
