//! Criterion benchmarks for margin_replay.
//!
//! Benchmarks cover:
//! - Market snapshot rendering for growing schemas
//! - Cube aggregation of one as-of date
//! - Full sample replay against an in-process valuation stub
//! - Expected-evolution reduction over a large cube

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use margin_replay::cube::analytics::expected_evolution;
use margin_replay::cube::{CubeAggregator, CubeRow, MarginDepth};
use margin_replay::replay::{ReplayInputs, SampleReplay, SampleWorkspace};
use margin_replay::snapshot::{MarketSnapshotBuilder, NumeraireSeries};
use margin_replay::valuation::{
    MarginReport, MarginReportRow, ValuationError, ValuationReports, ValuationService,
};
use scenario_core::types::{Date, DateIndex, SampleIndex};
use scenario_core::{AggregationData, RiskFactorSchema, ScenarioStore};

const TENORS: [&str; 10] = ["3M", "6M", "1Y", "2Y", "3Y", "5Y", "7Y", "10Y", "15Y", "20Y"];

fn t0() -> Date {
    Date::from_ymd(2025, 1, 1).unwrap()
}

/// Schema with `n_ccy` currencies, one index each, and full vol grids.
fn make_schema(n_ccy: usize, n_dates: usize) -> RiskFactorSchema {
    let currencies: Vec<String> = ["EUR", "USD", "GBP", "JPY", "CHF"]
        .iter()
        .take(n_ccy)
        .map(|c| c.to_string())
        .collect();
    let indices: Vec<String> = currencies.iter().map(|c| format!("{}-IBOR-6M", c)).collect();
    RiskFactorSchema::builder()
        .currencies(currencies)
        .indices(indices)
        .curve_tenors(TENORS)
        .fx_vol_expiries(["1M", "6M", "1Y"])
        .swaption_expiries(["1Y", "5Y", "10Y"])
        .swaption_terms(["5Y", "10Y"])
        .grid_spec(format!("{},3M", n_dates))
        .build()
        .unwrap()
}

/// Dump with every schema factor for every `(date, sample)`.
fn make_store(schema: &RiskFactorSchema, n_dates: u32, n_samples: u32) -> ScenarioStore {
    let keys = schema.factor_keys();
    let mut text = String::new();
    for date in 1..=n_dates {
        for sample in 1..=n_samples {
            for (i, key) in keys.iter().enumerate() {
                let value = 0.9 + ((date as usize * 7 + sample as usize * 3 + i) % 97) as f64 * 1e-3;
                text.push_str(&format!("{},{},{},{}\n", date, sample, key, value));
            }
        }
    }
    ScenarioStore::from_reader("bench", text.as_bytes()).unwrap()
}

fn make_aggregation(n_dates: u32, n_samples: u32) -> AggregationData {
    let mut text = String::from("# Numeraire,\n# IndexFixing,EUR-IBOR-6M\n");
    for date in 1..=n_dates {
        for row in 0..n_samples {
            text.push_str(&format!("{},{},0,{}\n", date, row, 1.0 + date as f64 * 0.01));
            text.push_str(&format!("{},{},1,0.02\n", date, row));
        }
    }
    AggregationData::from_reader("bench", text.as_bytes()).unwrap()
}

fn margin_report() -> MarginReport {
    let row = |margin_type: &str, value: f64| MarginReportRow {
        portfolio: "CPTY_A".to_string(),
        product_class: "All".to_string(),
        risk_class: "All".to_string(),
        margin_type: margin_type.to_string(),
        bucket: "All".to_string(),
        side: "Call".to_string(),
        initial_margin: value,
        currency: "EUR".to_string(),
    };
    MarginReport::from_rows(vec![
        row("All", 1000.0),
        row("Delta", 700.0),
        row("Vega", 250.0),
        row("Curvature", 50.0),
    ])
}

struct StubService {
    report: MarginReport,
}

impl ValuationService for StubService {
    fn prepare(&mut self, _asof: Date) -> Result<(), ValuationError> {
        Ok(())
    }

    fn invoke(&mut self, _asof: Date) -> Result<(), ValuationError> {
        Ok(())
    }

    fn collect(&mut self, _asof: Date) -> Result<ValuationReports, ValuationError> {
        Ok(ValuationReports::margin(self.report.clone()))
    }
}

/// Benchmark market snapshot rendering.
fn bench_market_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("market_snapshot");

    for n_ccy in [1, 3, 5] {
        let schema = make_schema(n_ccy, 4);
        let store = make_store(&schema, 4, 1);
        let builder = MarketSnapshotBuilder::new(&schema, &store, t0());
        group.bench_with_input(BenchmarkId::new("currencies", n_ccy), &builder, |b, builder| {
            b.iter(|| {
                builder
                    .build(black_box(SampleIndex::new(1)), black_box(DateIndex::new(2)))
                    .unwrap()
            });
        });
    }

    group.finish();
}

/// Benchmark cube aggregation of one date across all depths.
fn bench_cube_aggregation(c: &mut Criterion) {
    let asof = Date::from_ymd(2026, 1, 1).unwrap();
    let reports = ValuationReports::margin(margin_report());
    let numeraire: NumeraireSeries = [(asof, 1.05)].into_iter().collect();
    let depths = [
        MarginDepth::All,
        MarginDepth::Delta,
        MarginDepth::Vega,
        MarginDepth::Curvature,
    ];
    let aggregator = CubeAggregator::new("CPTY_A", t0(), &depths);

    c.bench_function("cube_aggregation_4_depths", |b| {
        b.iter(|| {
            aggregator
                .rows(SampleIndex::new(1), black_box(asof), &reports, &numeraire)
                .unwrap()
        });
    });
}

/// Benchmark a full sample replay with file IO but no external process.
fn bench_sample_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_replay");
    group.sample_size(20);

    for n_dates in [4u32, 16, 40] {
        let schema = make_schema(2, n_dates as usize);
        let store = make_store(&schema, n_dates, 1);
        let aggregation = make_aggregation(n_dates, 1);
        let dir = tempfile::tempdir().unwrap();
        let workspace = SampleWorkspace::shared(
            dir.path().join("ore.xml"),
            dir.path().join("market.txt"),
            dir.path().join("fixings.txt"),
            dir.path().join("output"),
        );
        let inputs = ReplayInputs {
            schema: &schema,
            store: &store,
            aggregation: &aggregation,
            t0: t0(),
            portfolio: "CPTY_A",
            depths: &[MarginDepth::All],
        };
        let report = margin_report();

        group.bench_with_input(BenchmarkId::new("dates", n_dates), &inputs, |b, inputs| {
            b.iter(|| {
                SampleReplay::new(
                    *inputs,
                    SampleIndex::new(1),
                    &workspace,
                    StubService {
                        report: report.clone(),
                    },
                )
                .run()
                .unwrap()
            });
        });
    }

    group.finish();
}

/// Benchmark the expected-evolution reduction.
fn bench_expected_evolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("expected_evolution");

    for n_samples in [100u32, 1000] {
        let rows: Vec<CubeRow> = (1..=n_samples)
            .flat_map(|sample| {
                (1..=40).map(move |q| CubeRow {
                    portfolio: "CPTY_A".to_string(),
                    sample: SampleIndex::new(sample),
                    asof: t0().advance(format!("{}M", 3 * q).parse().unwrap()).unwrap(),
                    time: q as f64 * 0.25,
                    margin: 1000.0 + (sample % 17) as f64,
                    currency: "EUR".to_string(),
                    side: "Call".to_string(),
                    depth: MarginDepth::All,
                    margin_type: "All".to_string(),
                })
            })
            .collect();
        group.bench_with_input(BenchmarkId::new("samples", n_samples), &rows, |b, rows| {
            b.iter(|| expected_evolution(black_box(rows)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_market_snapshot,
    bench_cube_aggregation,
    bench_sample_replay,
    bench_expected_evolution,
);
criterion_main!(benches);
