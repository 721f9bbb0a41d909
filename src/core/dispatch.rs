//! Hook dispatch and the flush barrier
//!
//! **Per-Hook Panic Isolation**: every hook call is wrapped in `catch_unwind`
//! so a failing hook never stops the others, and nothing raised by a hook
//! reaches the logging caller.

use super::hook::{Flush, Hook};
use super::record::Record;
use std::any::Any;
use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Hooks and flushers in registration order
#[derive(Default, Clone)]
pub struct HookSet {
    hooks: Vec<Arc<dyn Hook>>,
    flushers: Vec<Arc<dyn Flush>>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_hook(&mut self, hook: Arc<dyn Hook>) {
        self.hooks.push(hook);
    }

    pub fn add_flusher(&mut self, flusher: Arc<dyn Flush>) {
        self.flushers.push(flusher);
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    pub fn flusher_count(&self) -> usize {
        self.flushers.len()
    }

    /// Hand `record` to every hook accepting its level. Failures and panics
    /// are reported on `diagnostics` and never propagated.
    pub fn deliver(&self, record: &Record, diagnostics: &mut dyn Write) {
        for hook in &self.hooks {
            if !hook.accepts(record.level) {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| hook.deliver(record))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    let _ = writeln!(diagnostics, "[LOGGER ERROR] Hook '{}' failed: {}", hook.name(), e);
                }
                Err(payload) => {
                    let _ = writeln!(
                        diagnostics,
                        "[LOGGER CRITICAL] Hook '{}' panicked: {}. \
                         Other hooks continue to function.",
                        hook.name(),
                        panic_message(&*payload)
                    );
                }
            }
        }
    }

    /// Flush every flusher concurrently and wait for all of them
    pub fn flush_all(&self) {
        match self.flushers.as_slice() {
            [] => {}
            [only] => flush_isolated(only.as_ref()),
            all => std::thread::scope(|scope| {
                for flusher in all {
                    scope.spawn(move || flush_isolated(flusher.as_ref()));
                }
            }),
        }
    }
}

fn flush_isolated(flusher: &dyn Flush) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| flusher.flush())) {
        eprintln!(
            "[LOGGER CRITICAL] Flush panicked: {}. Other hooks continue to function.",
            panic_message(&*payload)
        );
    }
}
