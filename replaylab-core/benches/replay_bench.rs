//! Criterion benchmarks for replay hot paths.
//!
//! Benchmarks:
//! 1. Full bar replay (load + init + dispatch) through the dual-EMA strategy
//! 2. Tick replay through the tick-to-bar aggregator
//! 3. Streaming EMA update

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use replaylab_core::domain::{BarRecord, CollectionId, DataRecord, ReplayMode, TickRecord, Timestamp};
use replaylab_core::engine::ReplayEngine;
use replaylab_core::indicators::Ema;
use replaylab_core::store::MemoryStore;
use replaylab_core::strategy::StrategyConfig;

// ── Helpers ──────────────────────────────────────────────────────────

fn base_time() -> Timestamp {
    chrono::NaiveDate::from_ymd_opt(2020, 1, 2)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

fn make_bars(n: usize) -> Vec<DataRecord> {
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            DataRecord::Bar(BarRecord {
                symbol: "BENCH".to_string(),
                exchange: String::new(),
                datetime: base_time() + chrono::Duration::minutes(i as i64),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000.0,
                open_interest: 0.0,
            })
        })
        .collect()
}

fn make_ticks(n: usize) -> Vec<DataRecord> {
    (0..n)
        .map(|i| {
            let price = 100.0 + (i as f64 * 0.05).sin();
            DataRecord::Tick(TickRecord::trade(
                "BENCH",
                base_time() + chrono::Duration::seconds(i as i64),
                price,
                1.0,
            ))
        })
        .collect()
}

fn engine_for(
    records: &[DataRecord],
    mode: ReplayMode,
    strategy: &StrategyConfig,
) -> ReplayEngine {
    let collection = CollectionId::new("bench", "BENCH");
    let store = MemoryStore::new().with_records(&collection, records.iter().cloned());
    let mut engine = ReplayEngine::new(Box::new(store));
    engine.set_mode(mode).unwrap();
    engine.set_start_date("20200101", 1).unwrap();
    engine.set_database("bench", "BENCH").unwrap();
    engine.init_strategy(strategy).unwrap();
    engine
}

// ── 1. Bar replay ────────────────────────────────────────────────────

fn bench_bar_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("bar_replay");
    let strategy = StrategyConfig::new("double_ema")
        .with_param("fast_window", 10.0)
        .with_param("slow_window", 60.0);

    for n in [1_000usize, 10_000, 50_000] {
        let bars = make_bars(n);
        group.bench_with_input(BenchmarkId::new("double_ema", n), &bars, |b, bars| {
            b.iter(|| {
                let mut engine = engine_for(bars, ReplayMode::Bar, &strategy);
                black_box(engine.run_backtesting().unwrap())
            });
        });
    }
    group.finish();
}

// ── 2. Tick replay ───────────────────────────────────────────────────

fn bench_tick_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_replay");
    let strategy = StrategyConfig::new("bar_builder").with_param("interval_minutes", 1.0);

    for n in [10_000usize, 100_000] {
        let ticks = make_ticks(n);
        group.bench_with_input(BenchmarkId::new("bar_builder", n), &ticks, |b, ticks| {
            b.iter(|| {
                let mut engine = engine_for(ticks, ReplayMode::Tick, &strategy);
                black_box(engine.run_backtesting().unwrap())
            });
        });
    }
    group.finish();
}

// ── 3. EMA ───────────────────────────────────────────────────────────

fn bench_ema(c: &mut Criterion) {
    let closes: Vec<f64> = (0..10_000).map(|i| 100.0 + (i as f64 * 0.1).sin()).collect();
    c.bench_function("ema_60_stream_10k", |b| {
        b.iter(|| {
            let mut ema = Ema::new(60);
            for x in &closes {
                black_box(ema.update(*x));
            }
        });
    });
}

criterion_group!(benches, bench_bar_replay, bench_tick_replay, bench_ema);
criterion_main!(benches);
