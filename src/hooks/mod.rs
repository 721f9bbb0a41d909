//! Remote hook implementations

pub mod aggregator;
pub mod crash;
pub mod queued;
pub mod tcp;

pub use aggregator::{AggregatorHook, RemoteRecord};
pub use crash::{CrashReport, CrashReportHook};
pub use queued::{QueuedHook, Transport, DEFAULT_QUEUE_CAPACITY};
pub use tcp::{Compression, TcpTransport};

// Re-export traits for convenience
pub use crate::core::{Flush, Hook};
