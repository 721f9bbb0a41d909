//! Criterion benchmarks for rust_deferred_logger

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rust_deferred_logger::hooks::{AggregatorHook, Transport};
use rust_deferred_logger::prelude::*;
use std::sync::Arc;

struct NullTransport;

impl Transport for NullTransport {
    fn send(&mut self, payload: &[u8]) -> Result<()> {
        black_box(payload);
        Ok(())
    }
}

fn sink_logger() -> Logger {
    Logger::builder()
        .discard_output()
        .formatter(HumanFormatter::new().with_colors(ColorMode::Never))
        .build()
}

// ============================================================================
// Entry Benchmarks
// ============================================================================

fn bench_entry_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("entry_derivation");
    group.throughput(Throughput::Elements(1));

    let logger = sink_logger();

    group.bench_function("entry", |b| {
        b.iter(|| black_box(logger.entry()));
    });

    group.bench_function("with_field_chain", |b| {
        b.iter(|| {
            let entry = logger
                .module("bench")
                .with_field("user_id", 42)
                .with_field("action", "login")
                .with_field("ok", true);
            black_box(entry)
        });
    });

    group.finish();
}

// ============================================================================
// Logging Performance Benchmarks
// ============================================================================

fn bench_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("logging");
    group.throughput(Throughput::Elements(1));

    let logger = sink_logger();
    let entry = logger.module("bench").with_field("request_id", "r-1");

    group.bench_function("trace_buffered", |b| {
        b.iter(|| {
            entry.trace(black_box("buffered line"));
            if entry.pending_trace_lines() >= 1000 {
                entry.clear_trace_log();
            }
        });
    });

    group.bench_function("info", |b| {
        b.iter(|| entry.info(black_box("info message")));
    });

    group.bench_function("error_no_traces", |b| {
        b.iter(|| entry.error(black_box("failure")));
    });

    group.bench_function("error_with_10_traces", |b| {
        b.iter(|| {
            for _ in 0..10 {
                entry.trace("step");
            }
            entry.error(black_box("failure"));
        });
    });

    group.finish();
}

// ============================================================================
// Formatter Benchmarks
// ============================================================================

fn bench_formatters(c: &mut Criterion) {
    let mut group = c.benchmark_group("formatters");
    group.throughput(Throughput::Elements(1));

    let record = Record::new(LogLevel::Info, "user logged in with password=hunter2").with_fields(
        Fields::new()
            .with("module", "auth")
            .with("user_id", 42)
            .with("email", "ann@example.com"),
    );
    let human = HumanFormatter::new().with_colors(ColorMode::Never);
    let json = JsonFormatter::new();

    group.bench_function("human", |b| {
        b.iter(|| black_box(human.format(black_box(&record))));
    });

    group.bench_function("json", |b| {
        b.iter(|| black_box(json.format(black_box(&record))));
    });

    group.bench_function("redact", |b| {
        let redactor = Redactor::default();
        b.iter(|| black_box(redactor.redact(black_box("token=abc email: bob@example.com"))));
    });

    group.finish();
}

// ============================================================================
// Level Filtering Benchmarks
// ============================================================================

fn bench_level_filtering(c: &mut Criterion) {
    let mut group = c.benchmark_group("level_filtering");
    group.throughput(Throughput::Elements(1));

    let logger = Logger::builder().level(LogLevel::Warn).discard_output().build();
    let entry = logger.entry();

    group.bench_function("below_threshold", |b| {
        b.iter(|| entry.info(black_box("filtered")));
    });

    group.bench_function("above_threshold", |b| {
        b.iter(|| entry.warn(black_box("written")));
    });

    group.finish();
}

// ============================================================================
// Queued Hook Benchmarks
// ============================================================================

fn bench_queued_hook(c: &mut Criterion) {
    let mut group = c.benchmark_group("queued_hook");
    group.throughput(Throughput::Elements(100));

    let hook = AggregatorHook::new(NullTransport, 4096, OverflowPolicy::Block)
        .expect("spawn aggregator hook");
    let logger = Logger::builder()
        .discard_output()
        .async_hook(Arc::new(hook))
        .build();

    group.bench_function("info_100_then_flush", |b| {
        b.iter(|| {
            for i in 0..100 {
                logger.with_field("i", i).info("shipped");
            }
            logger.flush();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_entry_derivation,
    bench_logging,
    bench_formatters,
    bench_level_filtering,
    bench_queued_hook,
);
criterion_main!(benches);
