//! Bounded queue plus worker thread shared by the remote hooks
//!
//! Payloads are handed to a [`Transport`] on a dedicated thread so the
//! logging caller only pays for an enqueue. A flush enqueues a marker behind
//! every earlier payload and waits for the worker to acknowledge it.

use crate::core::dispatch::panic_message;
use crate::core::{HookMetrics, LoggerError, OverflowPolicy, Result};
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TrySendError};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default queue capacity for remote hooks
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// How long dropping a hook waits for its worker to drain
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Moves encoded payloads to a remote service
pub trait Transport: Send + 'static {
    fn send(&mut self, payload: &[u8]) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

enum Message {
    Payload(Vec<u8>),
    Flush(Sender<()>),
}

pub struct QueuedHook {
    name: String,
    sender: Option<Sender<Message>>,
    worker: Option<thread::JoinHandle<()>>,
    metrics: Arc<HookMetrics>,
    policy: OverflowPolicy,
}

impl QueuedHook {
    /// Start the worker thread for `transport`
    pub fn spawn<T: Transport>(
        name: impl Into<String>,
        transport: T,
        capacity: usize,
        policy: OverflowPolicy,
    ) -> Result<Self> {
        let name = name.into();
        if capacity == 0 {
            return Err(LoggerError::config(name, "queue capacity must be at least 1"));
        }

        let (sender, receiver) = bounded(capacity);
        let metrics = Arc::new(HookMetrics::new());
        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker = thread::Builder::new()
            .name(format!("{}-hook", name))
            .spawn(move || run_worker(&worker_name, transport, receiver, &worker_metrics))
            .map_err(|e| LoggerError::io_operation("spawning hook worker", name.clone(), e))?;

        Ok(Self {
            name,
            sender: Some(sender),
            worker: Some(worker),
            metrics,
            policy,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &HookMetrics {
        &self.metrics
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Queue a payload, applying the overflow policy when the queue is full
    pub fn enqueue(&self, payload: Vec<u8>) -> Result<()> {
        let Some(sender) = self.sender.as_ref() else {
            self.metrics.record_dropped();
            return Err(LoggerError::ChannelSendError);
        };

        match sender.try_send(Message::Payload(payload)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Disconnected(_)) => {
                self.metrics.record_dropped();
                Err(LoggerError::ChannelSendError)
            }
            Err(TrySendError::Full(message)) => {
                self.metrics.record_queue_full();
                self.handle_overflow(sender, message)
            }
        }
    }

    fn handle_overflow(&self, sender: &Sender<Message>, message: Message) -> Result<()> {
        match self.policy {
            OverflowPolicy::DropNewest => {
                self.metrics.record_dropped();
                Ok(())
            }
            OverflowPolicy::Block => sender
                .send(message)
                .map_err(|_| LoggerError::ChannelSendError),
            OverflowPolicy::BlockWithTimeout(timeout) => match sender.send_timeout(message, timeout) {
                Ok(()) => Ok(()),
                Err(SendTimeoutError::Timeout(_)) => {
                    self.alert_and_drop();
                    Ok(())
                }
                Err(SendTimeoutError::Disconnected(_)) => Err(LoggerError::ChannelSendError),
            },
            OverflowPolicy::AlertAndDrop => {
                self.alert_and_drop();
                Ok(())
            }
        }
    }

    fn alert_and_drop(&self) {
        let dropped_count = self.metrics.record_dropped();

        // Alert on first drop and periodically thereafter
        if dropped_count == 0 || (dropped_count + 1) % 1000 == 0 {
            eprintln!(
                "[LOGGER WARNING] Hook '{}' queue full, {} records dropped. \
                 Consider increasing queue capacity or using a different overflow policy.",
                self.name,
                dropped_count + 1
            );
        }
    }

    /// Block until every payload queued before this call was handled
    pub fn flush(&self) {
        let Some(sender) = self.sender.as_ref() else {
            return;
        };
        let (ack_tx, ack_rx) = bounded(1);
        if sender.send(Message::Flush(ack_tx)).is_err() {
            return;
        }
        // Err means the worker is gone and nothing is left to wait for
        let _ = ack_rx.recv();
    }
}

fn run_worker<T: Transport>(
    name: &str,
    mut transport: T,
    receiver: Receiver<Message>,
    metrics: &HookMetrics,
) {
    for message in receiver {
        match message {
            Message::Payload(payload) => {
                match catch_unwind(AssertUnwindSafe(|| transport.send(&payload))) {
                    Ok(Ok(())) => {
                        metrics.record_delivered();
                    }
                    Ok(Err(e)) => {
                        metrics.record_failed();
                        eprintln!("[LOGGER ERROR] Hook '{}' failed to send record: {}", name, e);
                    }
                    Err(payload) => {
                        metrics.record_failed();
                        eprintln!(
                            "[LOGGER CRITICAL] Hook '{}' transport panicked: {}. \
                             Worker continues with the next record.",
                            name,
                            panic_message(&*payload)
                        );
                    }
                }
            }
            Message::Flush(ack) => {
                if let Err(e) = transport.flush() {
                    eprintln!("[LOGGER ERROR] Hook '{}' flush failed: {}", name, e);
                }
                metrics.record_flush();
                let _ = ack.send(());
            }
        }
    }

    // Channel closed
    if let Err(e) = transport.flush() {
        eprintln!("[LOGGER ERROR] Hook '{}' flush failed during shutdown: {}", name, e);
    }
}

impl Drop for QueuedHook {
    fn drop(&mut self) {
        // Close the channel so the worker drains and exits
        drop(self.sender.take());

        if let Some(handle) = self.worker.take() {
            let start = Instant::now();
            loop {
                if handle.is_finished() {
                    if let Err(e) = handle.join() {
                        eprintln!(
                            "[LOGGER ERROR] Hook '{}' worker panicked during shutdown: {:?}",
                            self.name, e
                        );
                    }
                    break;
                }

                if start.elapsed() >= DEFAULT_SHUTDOWN_TIMEOUT {
                    eprintln!(
                        "[LOGGER WARNING] Hook '{}' worker did not finish within {:?} timeout. \
                         Some records may be lost.",
                        self.name, DEFAULT_SHUTDOWN_TIMEOUT
                    );
                    break;
                }

                thread::sleep(Duration::from_millis(10));
            }
        }

        let dropped = self.metrics.dropped_count();
        if dropped > 0 {
            eprintln!(
                "[LOGGER WARNING] Hook '{}' shutting down with {} dropped records",
                self.name, dropped
            );
        }
    }
}
