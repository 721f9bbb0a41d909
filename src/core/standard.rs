//! Process-wide default logger
//!
//! Explicitly passed loggers are the primary API; this is a thin default for
//! code that cannot thread one through. It is set at most once and never torn
//! down, so call [`flush`] before exiting.

use super::config::LoggerConfig;
use super::entry::Entry;
use super::error::{LoggerError, Result};
use super::field::{FieldValue, Fields};
use super::logger::Logger;
use super::stacktrace::BoxError;
use std::fmt;
use std::sync::OnceLock;

static STANDARD: OnceLock<Logger> = OnceLock::new();

/// Install `logger` as the process-wide default
///
/// Fails with [`LoggerError::AlreadyInitialized`] if a default was installed
/// or one was already created lazily by [`standard`].
pub fn init(logger: Logger) -> Result<()> {
    STANDARD
        .set(logger)
        .map_err(|_| LoggerError::AlreadyInitialized)
}

pub fn init_with_config(config: &LoggerConfig) -> Result<()> {
    init(Logger::from_config(config)?)
}

/// The default logger, created with [`Logger::new`] on first use if none
/// was installed
pub fn standard() -> &'static Logger {
    STANDARD.get_or_init(Logger::new)
}

pub fn entry() -> Entry<'static> {
    standard().entry()
}

pub fn module(name: impl Into<String>) -> Entry<'static> {
    standard().module(name)
}

pub fn with_field(key: impl Into<String>, value: impl Into<FieldValue>) -> Entry<'static> {
    standard().with_field(key, value)
}

pub fn with_fields(fields: Fields) -> Entry<'static> {
    standard().with_fields(fields)
}

pub fn with_error(err: impl Into<BoxError>) -> Entry<'static> {
    standard().with_error(err)
}

pub fn debug(message: impl fmt::Display) {
    entry().debug(message);
}

pub fn info(message: impl fmt::Display) {
    entry().info(message);
}

pub fn warn(message: impl fmt::Display) {
    entry().warn(message);
}

pub fn error(err: impl Into<BoxError>) {
    entry().error(err);
}

pub fn errorf(err: impl Into<BoxError>, message: impl fmt::Display) {
    entry().errorf(err, message);
}

pub fn flush() {
    standard().flush();
}
