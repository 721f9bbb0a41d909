//! Basic logger usage example
//!
//! Demonstrates deferred trace output, structured fields, error reporting and
//! the macros.
//!
//! Run with: cargo run --example basic_usage

use rust_deferred_logger::prelude::*;
use rust_deferred_logger::{info, trace};

#[derive(Debug, thiserror::Error)]
#[error("connection to {host} refused")]
struct ConnectError {
    host: String,
}

fn load_task(entry: &Entry<'_>, id: u32) -> std::result::Result<(), ConnectError> {
    trace!(entry, "looking up task {}", id);
    trace!(entry, "opening connection");
    if id % 2 == 0 {
        return Err(ConnectError {
            host: "db.internal:5432".to_string(),
        });
    }
    Ok(())
}

fn main() -> Result<()> {
    println!("=== Rust Deferred Logger - Basic Usage Example ===\n");

    let logger = Logger::builder()
        .formatter(HumanFormatter::new().with_colors(ColorMode::Auto))
        .output(std::io::stdout())
        .build();

    println!("1. Successful work keeps trace lines out of the log:");
    let entry = logger.module("tasks").with_field("task_id", 1);
    match load_task(&entry, 1) {
        Ok(()) => info!(entry, "task {} created", 1),
        Err(e) => entry.error(e),
    }
    entry.clear_trace_log();

    println!("\n2. A failure dumps the trace lines before the error:");
    let entry = logger.module("tasks").with_field("task_id", 2);
    if let Err(e) = load_task(&entry, 2) {
        entry.errorf(e, "db unavailable");
    }

    println!("\n3. Secrets are filtered from every record:");
    logger
        .with_field("login", "user=ann password=hunter2")
        .warn("retrying with token: abc123");

    logger.flush();
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
