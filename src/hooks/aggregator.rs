//! Log aggregation hook
//!
//! Ships every record as a GELF-style JSON document. User fields can be
//! namespaced with a prefix so services sharing one index do not fight over
//! field types; keys starting with `g-` and the error key are left alone.

use super::queued::{QueuedHook, Transport};
use crate::core::field::{FieldValue, FIELD_ERROR};
use crate::core::{Flush, Hook, HookMetrics, LogLevel, OverflowPolicy, Record, RequestProjection, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Field keys with this prefix are never namespaced
pub const UNPREFIXED_KEY: &str = "g-";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteRecord {
    pub version: &'static str,
    pub host: String,
    pub short_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_message: Option<String>,
    pub timestamp: f64,
    pub level: u8,
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// Syslog severity, as GELF expects
pub fn syslog_level(level: LogLevel) -> u8 {
    match level {
        LogLevel::Debug => 7,
        LogLevel::Info => 6,
        LogLevel::Warn => 4,
        LogLevel::Error => 3,
    }
}

fn default_host() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

pub struct AggregatorHook {
    queue: QueuedHook,
    host: String,
    field_prefix: Option<String>,
}

impl AggregatorHook {
    pub fn new<T: Transport>(transport: T, capacity: usize, policy: OverflowPolicy) -> Result<Self> {
        Ok(Self {
            queue: QueuedHook::spawn("aggregator", transport, capacity, policy)?,
            host: default_host(),
            field_prefix: None,
        })
    }

    #[must_use]
    pub fn with_field_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.field_prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn metrics(&self) -> &HookMetrics {
        self.queue.metrics()
    }

    fn field_key(&self, key: &str) -> String {
        match &self.field_prefix {
            Some(prefix) if key != FIELD_ERROR && !key.starts_with(UNPREFIXED_KEY) => {
                format!("_{}-{}", prefix, key)
            }
            _ => format!("_{}", key),
        }
    }

    pub fn remote_record(&self, record: &Record) -> RemoteRecord {
        let mut fields = BTreeMap::new();
        for (key, value) in &record.fields {
            let value = match value {
                FieldValue::Request(req) => serde_json::to_value(RequestProjection::from_snapshot(req))
                    .unwrap_or(serde_json::Value::Null),
                other => other.to_json_value(),
            };
            fields.insert(self.field_key(key), value);
        }
        if let Some(text) = record.error_text() {
            fields.insert(self.field_key(FIELD_ERROR), text.into());
        }
        if let Some(stack) = record.stack_trace() {
            fields.insert("_stacktrace".to_string(), stack.to_string().into());
        }

        let short_message = record.message.lines().next().unwrap_or_default().to_string();
        let full_message = match record.error_text() {
            Some(err) => Some(format!("{}\n{}", record.message, err)),
            None if record.message.contains('\n') => Some(record.message.clone()),
            None => None,
        };

        RemoteRecord {
            version: "1.1",
            host: self.host.clone(),
            short_message,
            full_message,
            timestamp: record.timestamp.timestamp_millis() as f64 / 1000.0,
            level: syslog_level(record.level),
            fields,
        }
    }
}

impl Hook for AggregatorHook {
    fn name(&self) -> &str {
        self.queue.name()
    }

    fn deliver(&self, record: &Record) -> Result<()> {
        let payload = serde_json::to_vec(&self.remote_record(record))?;
        self.queue.enqueue(payload)
    }
}

impl Flush for AggregatorHook {
    fn flush(&self) {
        self.queue.flush();
    }
}
