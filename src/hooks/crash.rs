//! Crash reporting hook
//!
//! Error records become crash reports: the exception with its frames
//! (oldest call first), tags taken from the entry's `tags` map and every
//! other field as extra data.

use super::queued::{QueuedHook, Transport};
use crate::core::field::{FieldValue, FIELD_ERROR, FIELD_HTTP_REQUEST, FIELD_TAGS};
use crate::core::stacktrace::Frame;
use crate::core::{Flush, Hook, HookMetrics, LogLevel, OverflowPolicy, Record, RequestProjection, Result};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrashFrame {
    pub function: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineno: Option<u32>,
    pub in_app: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exception {
    pub value: String,
    /// Oldest call first
    pub frames: Vec<CrashFrame>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrashReport {
    pub message: String,
    pub level: &'static str,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub culprit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<Exception>,
    pub tags: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestProjection>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

pub struct CrashReportHook {
    queue: QueuedHook,
    environment: Option<String>,
    release: Option<String>,
    region: Option<String>,
    in_app_prefixes: Vec<String>,
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

impl CrashReportHook {
    pub fn new<T: Transport>(transport: T, capacity: usize, policy: OverflowPolicy) -> Result<Self> {
        Ok(Self {
            queue: QueuedHook::spawn("crash", transport, capacity, policy)?,
            environment: None,
            release: None,
            region: None,
            in_app_prefixes: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = non_empty(environment.into());
        self
    }

    #[must_use]
    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = non_empty(release.into());
        self
    }

    /// Added to every report as the `region` tag
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = non_empty(region.into());
        self
    }

    /// Frames whose function or file starts with one of these are marked in-app
    #[must_use]
    pub fn with_in_app_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.in_app_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn metrics(&self) -> &HookMetrics {
        self.queue.metrics()
    }

    fn is_in_app(&self, frame: &Frame) -> bool {
        self.in_app_prefixes.iter().any(|p| {
            frame.function.starts_with(p.as_str())
                || frame.file.as_deref().is_some_and(|f| f.starts_with(p.as_str()))
        })
    }

    pub fn crash_report(&self, record: &Record) -> CrashReport {
        let frames: Vec<CrashFrame> = record
            .stack_trace()
            .map(|stack| {
                stack
                    .frames()
                    .iter()
                    .rev()
                    .map(|f| CrashFrame {
                        function: f.function.clone(),
                        filename: f.file.clone(),
                        lineno: f.line,
                        in_app: self.is_in_app(f),
                    })
                    .collect()
            })
            .unwrap_or_default();

        // Innermost in-app frame, else the innermost frame
        let culprit = frames
            .iter()
            .rev()
            .find(|f| f.in_app)
            .or_else(|| frames.last())
            .map(|f| f.function.clone());

        let exception = record.error_text().map(|value| Exception {
            value: value.to_string(),
            frames,
        });

        let mut tags = BTreeMap::new();
        let mut extra = BTreeMap::new();
        let mut request = None;
        for (key, value) in &record.fields {
            match (key.as_str(), value) {
                (FIELD_TAGS, FieldValue::Map(map)) => {
                    tags.extend(map.iter().map(|(k, v)| (k.clone(), v.to_string())));
                }
                (FIELD_HTTP_REQUEST, FieldValue::Request(req)) => {
                    request = Some(RequestProjection::from_snapshot(req));
                }
                (FIELD_ERROR, _) => {}
                _ => {
                    extra.insert(key.clone(), value.to_json_value());
                }
            }
        }
        if let Some(region) = &self.region {
            tags.insert("region".to_string(), region.clone());
        }

        CrashReport {
            message: record.message.clone(),
            level: record.level.as_str(),
            timestamp: record.timestamp.to_rfc3339(),
            culprit,
            exception,
            tags,
            release: self.release.clone(),
            environment: self.environment.clone(),
            request,
            extra,
        }
    }
}

impl Hook for CrashReportHook {
    fn name(&self) -> &str {
        self.queue.name()
    }

    fn accepts(&self, level: LogLevel) -> bool {
        level == LogLevel::Error
    }

    fn deliver(&self, record: &Record) -> Result<()> {
        let payload = serde_json::to_vec(&self.crash_report(record))?;
        self.queue.enqueue(payload)
    }
}

impl Flush for CrashReportHook {
    fn flush(&self) {
        self.queue.flush();
    }
}
