//! Declarative logger configuration
//!
//! ```
//! use rust_deferred_logger::{Logger, LoggerConfig};
//!
//! let config = LoggerConfig::from_json_str(r#"{
//!     "debug": true,
//!     "format": "json",
//!     "stack_filter": [{ "pattern": "/rustc/", "action": "drop" }]
//! }"#).unwrap();
//! let logger = Logger::from_config(&config).unwrap();
//! assert!(logger.debug_enabled());
//! ```

use super::error::{LoggerError, Result};
use super::formatter::OutputFormat;
use super::log_level::LogLevel;
use super::logger::{Logger, LoggerBuilder};
use super::overflow_policy::OverflowPolicy;
use super::stacktrace::{FilterAction, FrameRule, StackFilter};
use crate::hooks::{AggregatorHook, Compression, CrashReportHook, TcpTransport, DEFAULT_QUEUE_CAPACITY};
use serde::Deserialize;
use std::sync::Arc;

fn default_true() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_compression() -> Compression {
    Compression::Gzip
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub enabled: bool,
    /// `host:port` without scheme
    pub address: String,
    #[serde(default = "default_compression")]
    pub compression: Compression,
    /// Prepended to user field names; empty disables prefixing
    pub field_prefix: String,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: String::new(),
            compression: default_compression(),
            field_prefix: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CrashConfig {
    pub enabled: bool,
    pub address: String,
    pub environment: String,
    /// Usually the build's commit hash
    pub release: String,
    pub region: String,
    pub in_app_prefixes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FrameRuleConfig {
    pub pattern: String,
    pub action: FilterAction,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Write trace lines immediately as debug records
    pub debug: bool,
    /// When false, records only reach the hooks
    #[serde(default = "default_true")]
    pub keep_output: bool,
    pub format: OutputFormat,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    pub aggregator: AggregatorConfig,
    pub crash: CrashConfig,
    pub stack_filter: Vec<FrameRuleConfig>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            debug: false,
            keep_output: true,
            format: OutputFormat::Human,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
            aggregator: AggregatorConfig::default(),
            crash: CrashConfig::default(),
            stack_filter: Vec::new(),
        }
    }
}

impl LoggerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn stack_filter(&self) -> Result<StackFilter> {
        self.stack_filter
            .iter()
            .try_fold(StackFilter::new(), |filter, rule| -> Result<StackFilter> {
                Ok(filter.with_rule(FrameRule::new(&rule.pattern, rule.action)?))
            })
    }

    /// Check the settings that only fail at setup
    pub fn validate(&self) -> Result<()> {
        if self.aggregator.enabled && self.aggregator.address.is_empty() {
            return Err(LoggerError::config("aggregator", "No address provided"));
        }
        if self.crash.enabled && self.crash.address.is_empty() {
            return Err(LoggerError::config("crash", "No address provided"));
        }
        if self.queue_capacity == 0 {
            return Err(LoggerError::config("queue", "capacity must be at least 1"));
        }
        Ok(())
    }
}

impl Logger {
    /// Build a logger and connect the remote hooks the configuration enables
    pub fn from_config(config: &LoggerConfig) -> Result<Logger> {
        config.validate()?;
        let stack_filter = config.stack_filter()?;

        let mut builder = LoggerBuilder::new().boxed_formatter(config.format.formatter(stack_filter));
        if config.debug {
            builder = builder.level(LogLevel::Debug);
        }
        if !config.keep_output {
            builder = builder.discard_output();
        }

        if config.crash.enabled {
            let hook = CrashReportHook::new(
                TcpTransport::new(&config.crash.address),
                config.queue_capacity,
                config.overflow_policy,
            )?
            .with_environment(&config.crash.environment)
            .with_release(&config.crash.release)
            .with_region(&config.crash.region)
            .with_in_app_prefixes(config.crash.in_app_prefixes.iter().cloned());
            builder = builder.async_hook(Arc::new(hook));
        }

        if config.aggregator.enabled {
            let transport = TcpTransport::new(&config.aggregator.address)
                .with_compression(config.aggregator.compression);
            let hook = AggregatorHook::new(transport, config.queue_capacity, config.overflow_policy)?
                .with_field_prefix(&config.aggregator.field_prefix);
            builder = builder.async_hook(Arc::new(hook));
        }

        let logger = builder.build();
        for notice in disabled_sink_notices(config) {
            logger.module("logger").info(notice);
        }
        Ok(logger)
    }
}

fn disabled_sink_notices(config: &LoggerConfig) -> Vec<&'static str> {
    let mut notices = Vec::new();
    if !config.crash.enabled {
        notices.push("Crash reporting disabled; not sending error reports");
    }
    if !config.aggregator.enabled {
        notices.push(if config.keep_output {
            "Aggregator disabled; not shipping records"
        } else {
            "Aggregator disabled; not shipping records, enable keep_output to log locally"
        });
    }
    notices
}
