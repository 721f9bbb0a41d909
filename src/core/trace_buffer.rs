//! Deferred trace lines
//!
//! Trace lines are rendered when logged but held back until the owning entry
//! logs an error. All buffers of one logger live in a [`TraceArena`] guarded
//! by the logger's trace mutex; an entry and everything derived from it share
//! one buffer through a [`TraceHandle`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Buffers keyed by handle id
#[derive(Debug, Default)]
pub struct TraceArena {
    buffers: HashMap<u64, Vec<Vec<u8>>>,
}

impl TraceArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: u64, line: Vec<u8>) {
        self.buffers.entry(id).or_default().push(line);
    }

    /// Take every line buffered under `id`, leaving the buffer empty
    pub fn drain(&mut self, id: u64) -> Vec<Vec<u8>> {
        self.buffers.remove(&id).unwrap_or_default()
    }

    /// Drop the lines without delivering them anywhere
    pub fn discard(&mut self, id: u64) {
        self.buffers.remove(&id);
    }

    pub fn pending(&self, id: u64) -> usize {
        self.buffers.get(&id).map_or(0, Vec::len)
    }

    /// Number of buffers currently holding lines
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

/// Identity of one shared trace buffer
#[derive(Debug)]
pub struct TraceHandle {
    id: u64,
    used: AtomicBool,
}

impl TraceHandle {
    pub fn new() -> Self {
        Self {
            id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
            used: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn mark_used(&self) {
        self.used.store(true, Ordering::Relaxed);
    }

    /// Whether a line was ever pushed under this handle
    pub(crate) fn was_used(&self) -> bool {
        self.used.load(Ordering::Relaxed)
    }
}

impl Default for TraceHandle {
    fn default() -> Self {
        Self::new()
    }
}
