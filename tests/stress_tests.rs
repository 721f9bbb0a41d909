//! Stress tests for concurrent entries and queued hooks
//!
//! These tests verify:
//! - Concurrent entries keep their own trace lines
//! - Trace dumps never interleave on the output
//! - Queued hooks deliver every record before flush returns

use parking_lot::Mutex;
use rust_deferred_logger::hooks::{AggregatorHook, Transport};
use rust_deferred_logger::prelude::*;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().clone()).expect("utf-8 output")
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

struct Dumps(Arc<Mutex<Vec<String>>>);

impl Hook for Dumps {
    fn name(&self) -> &str {
        "dumps"
    }

    fn accepts(&self, level: LogLevel) -> bool {
        level == LogLevel::Error
    }

    fn deliver(&self, record: &Record) -> Result<()> {
        self.0
            .lock()
            .push(record.trace_dump().unwrap_or_default().to_string());
        Ok(())
    }
}

struct Counter(Arc<AtomicUsize>);

impl Transport for Counter {
    fn send(&mut self, _payload: &[u8]) -> Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn logger(out: &SharedBuf, dumps: &Arc<Mutex<Vec<String>>>) -> Logger {
    Logger::builder()
        .output(out.clone())
        .formatter(HumanFormatter::new().with_colors(ColorMode::Never))
        .hook(Dumps(Arc::clone(dumps)))
        .build()
}

#[test]
fn test_two_concurrent_entries_keep_their_own_lines() {
    let out = SharedBuf::default();
    let dumps = Arc::new(Mutex::new(Vec::new()));
    let logger = logger(&out, &dumps);
    let barrier = Barrier::new(2);

    thread::scope(|scope| {
        for name in ["alpha", "beta"] {
            let logger = &logger;
            let barrier = &barrier;
            scope.spawn(move || {
                let entry = logger.module(name);
                barrier.wait();
                for step in 1..=3 {
                    entry.trace(format!("{} step {}", name, step));
                }
                entry.error(format!("{} failed", name));
            });
        }
    });

    let dumps = dumps.lock();
    assert_eq!(dumps.len(), 2);
    for dump in dumps.iter() {
        let owner = if dump.contains("alpha step") { "alpha" } else { "beta" };
        let other = if owner == "alpha" { "beta" } else { "alpha" };
        assert_eq!(dump.lines().count(), 3);
        assert!(!dump.contains(other));

        let positions: Vec<usize> = (1..=3)
            .map(|step| {
                dump.find(&format!("{} step {}", owner, step))
                    .expect("every line buffered on the entry")
            })
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn test_dumps_are_contiguous_on_output() {
    const THREADS: usize = 8;
    const LINES: usize = 20;

    let out = SharedBuf::default();
    let dumps = Arc::new(Mutex::new(Vec::new()));
    let logger = logger(&out, &dumps);

    thread::scope(|scope| {
        for t in 0..THREADS {
            let logger = &logger;
            scope.spawn(move || {
                let entry = logger.entry().with_field("worker", t);
                for i in 0..LINES {
                    entry.trace(format!("worker-{} line-{}", t, i));
                    if i % 5 == 0 {
                        entry.info(format!("worker-{} progress", t));
                    }
                }
                entry.error(format!("worker-{} done", t));
            });
        }
    });

    assert_eq!(dumps.lock().len(), THREADS);

    // Each error is immediately preceded by its own trace lines in order.
    let contents = out.contents();
    let headers: Vec<&str> = contents
        .lines()
        .filter(|l| !l.starts_with('\t') && (l.contains("DEBU:") || l.contains("ERRO:")))
        .collect();
    assert_eq!(headers.len(), THREADS * (LINES + 1));
    for block in headers.chunks(LINES + 1) {
        let worker = block[LINES]
            .rsplit(' ')
            .nth(1)
            .expect("error header names the worker");
        for (i, line) in block[..LINES].iter().enumerate() {
            assert!(line.ends_with(&format!("{} line-{}", worker, i)));
        }
    }
}

#[test]
fn test_queued_hook_under_load() {
    const THREADS: usize = 4;
    const RECORDS: usize = 250;

    let sent = Arc::new(AtomicUsize::new(0));
    let hook = AggregatorHook::new(Counter(Arc::clone(&sent)), 16, OverflowPolicy::Block)
        .expect("spawn hook");
    let hook = Arc::new(hook);
    let logger = Logger::builder()
        .discard_output()
        .async_hook(Arc::clone(&hook))
        .build();

    thread::scope(|scope| {
        for t in 0..THREADS {
            let logger = &logger;
            scope.spawn(move || {
                for i in 0..RECORDS {
                    logger.with_field("thread", t).with_field("i", i).info("load");
                }
            });
        }
    });
    logger.flush();

    assert_eq!(sent.load(Ordering::SeqCst), THREADS * RECORDS);
    assert_eq!(hook.metrics().dropped_count(), 0);
    assert_eq!(hook.metrics().delivered_count(), (THREADS * RECORDS) as u64);
}

#[test]
fn test_drop_newest_never_blocks_caller() {
    struct Slow(Arc<AtomicUsize>);

    impl Transport for Slow {
        fn send(&mut self, _payload: &[u8]) -> Result<()> {
            thread::sleep(Duration::from_millis(50));
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let sent = Arc::new(AtomicUsize::new(0));
    let hook = AggregatorHook::new(Slow(Arc::clone(&sent)), 2, OverflowPolicy::DropNewest)
        .expect("spawn hook");
    let hook = Arc::new(hook);
    let logger = Logger::builder()
        .discard_output()
        .async_hook(Arc::clone(&hook))
        .build();

    let start = Instant::now();
    for i in 0..50 {
        logger.with_field("i", i).info("burst");
    }
    assert!(start.elapsed() < Duration::from_millis(500));

    logger.flush();
    let dropped = hook.metrics().dropped_count() as usize;
    assert!(dropped > 0);
    assert_eq!(sent.load(Ordering::SeqCst) + dropped, 50);
}
