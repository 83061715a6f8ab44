//! End-to-end replay tests: files on disk, a stub valuation service, and the
//! cube read back through the analytics layer.

use std::fs;
use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use margin_replay::config::{BenchmarkConfig, SampleSelection};
use margin_replay::error::RunError;
use margin_replay::cube::analytics::{expected_evolution, CsvCube, CubeSource};
use margin_replay::cube::{CubeRow, MarginDepth};
use margin_replay::replay::{BenchmarkInputs, BenchmarkRun, SampleWorkspace};
use margin_replay::valuation::{
    MarginReport, MarginReportRow, NpvReport, NpvTrade, ValuationError, ValuationReports,
    ValuationService,
};
use scenario_core::types::{Date, SampleIndex};
use tempfile::TempDir;

const SIMULATION_XML: &str = r#"<Simulation>
  <Parameters><Grid>2,1Y</Grid></Parameters>
  <Market>
    <BaseCurrency>EUR</BaseCurrency>
    <Currencies><Currency>EUR</Currency></Currencies>
    <YieldCurves><Configuration><Tenors>1Y</Tenors></Configuration></YieldCurves>
    <Indices><Index>EUR-EURIBOR-6M</Index></Indices>
    <FxVolatilities><Expiries/></FxVolatilities>
    <SwaptionVolatilities><Expiries/><Terms/></SwaptionVolatilities>
  </Market>
</Simulation>"#;

const DUMP: &str = "\
#Date,Sample,Key,Value
1,1,DiscountCurve/EUR/0,0.97
1,1,IndexCurve/EUR-EURIBOR-6M/0,0.96
2,1,DiscountCurve/EUR/0,0.95
2,1,IndexCurve/EUR-EURIBOR-6M/0,0.94
1,2,DiscountCurve/EUR/0,0.98
1,2,IndexCurve/EUR-EURIBOR-6M/0,0.97
2,2,DiscountCurve/EUR/0,0.96
2,2,IndexCurve/EUR-EURIBOR-6M/0,0.95
";

const AGGREGATION: &str = "\
# Numeraire,
# IndexFixing,EUR-EURIBOR-6M
#Date,Sample,Key,Value
1,0,0,1.0
1,0,1,0.021
2,0,0,1.0
2,0,1,0.022
1,1,0,1.0
1,1,1,0.023
2,1,0,1.0
2,1,1,0.024
";

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("Input")).unwrap();
        fs::write(root.join("Input/simulation.xml"), SIMULATION_XML).unwrap();
        fs::write(root.join("Input/scenariodump.csv"), DUMP).unwrap();
        fs::write(root.join("Input/scenariodata.csv"), AGGREGATION).unwrap();
        fs::write(
            root.join("Input/ore.xml"),
            format!(
                r#"<ORE>
  <Setup>
    <Parameter name="asofDate">2025-01-01</Parameter>
    <Parameter name="outputPath">{out}</Parameter>
    <Parameter name="marketDataFile">{market}</Parameter>
    <Parameter name="fixingDataFile">{fixings}</Parameter>
  </Setup>
</ORE>
"#,
                out = root.join("Output").display(),
                market = root.join("Input/market.txt").display(),
                fixings = root.join("Input/fixings.txt").display(),
            ),
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn config(&self) -> BenchmarkConfig {
        BenchmarkConfig {
            simulation_config: self.path("Input/simulation.xml"),
            scenario_dump: self.path("Input/scenariodump.csv"),
            aggregation_data: self.path("Input/scenariodata.csv"),
            job_descriptor: self.path("Input/ore.xml"),
            market_data_file: self.path("Input/market.txt"),
            fixing_data_file: self.path("Input/fixings.txt"),
            cube: self.path("Output/cube.csv"),
            workspace_dir: self.path("Output/workers"),
            ..BenchmarkConfig::default()
        }
    }

    fn cube(&self) -> Vec<CubeRow> {
        CsvCube::new(self.path("Output/cube.csv")).rows().unwrap()
    }
}

/// Stub engine: reads its sample from the fixing file header and answers
/// with a fixed margin.
struct StubService {
    fixing_file: PathBuf,
    margin: f64,
    missing_report_on: Option<(u32, Date)>,
    fail_sample: Option<u32>,
    npv: bool,
}

impl StubService {
    fn for_workspace(workspace: &SampleWorkspace) -> Self {
        Self {
            fixing_file: workspace.fixing_file().to_path_buf(),
            margin: 1000.0,
            missing_report_on: None,
            fail_sample: None,
            npv: false,
        }
    }

    fn sample(&self) -> u32 {
        let text = fs::read_to_string(&self.fixing_file).unwrap();
        text.lines()
            .next()
            .and_then(|l| l.strip_prefix("#Sample="))
            .and_then(|n| n.parse().ok())
            .unwrap()
    }
}

impl ValuationService for StubService {
    fn prepare(&mut self, _asof: Date) -> Result<(), ValuationError> {
        Ok(())
    }

    fn invoke(&mut self, _asof: Date) -> Result<(), ValuationError> {
        if self.fail_sample == Some(self.sample()) {
            return Err(ValuationError::ExitStatus {
                program: "stub".to_string(),
                status: "exit status: 1".to_string(),
            });
        }
        Ok(())
    }

    fn collect(&mut self, asof: Date) -> Result<ValuationReports, ValuationError> {
        if self.missing_report_on == Some((self.sample(), asof)) {
            return Ok(ValuationReports::none());
        }
        let margin = MarginReport::from_rows(vec![MarginReportRow {
            portfolio: "CPTY_A".to_string(),
            product_class: "All".to_string(),
            risk_class: "All".to_string(),
            margin_type: "All".to_string(),
            bucket: "All".to_string(),
            side: "Call".to_string(),
            initial_margin: self.margin,
            currency: "EUR".to_string(),
        }]);
        let npv = self.npv.then(|| {
            NpvReport::from_trades(vec![NpvTrade {
                trade_id: "SWAP_1".to_string(),
                npv_base: -250.0,
                base_currency: "EUR".to_string(),
                netting_set: "CPTY_A".to_string(),
            }])
        });
        Ok(ValuationReports {
            margin: Some(margin),
            npv,
        })
    }
}

fn sorted(mut rows: Vec<CubeRow>) -> Vec<CubeRow> {
    rows.sort_by(|a, b| (a.sample, a.asof, a.depth).cmp(&(b.sample, b.asof, b.depth)));
    rows
}

#[test]
fn test_end_to_end_two_samples_two_dates() {
    let fixture = Fixture::new();
    let config = fixture.config();
    let inputs = BenchmarkInputs::load(&config).unwrap();
    assert_eq!(inputs.t0, Date::from_ymd(2025, 1, 1).unwrap());
    assert_eq!(inputs.report_dir, fixture.path("Output"));

    let run = BenchmarkRun::from_config(&config, &inputs).unwrap();
    assert_eq!(run.samples(), &[SampleIndex::new(1), SampleIndex::new(2)]);
    let summary = run
        .run(|ws| Ok(StubService::for_workspace(ws)))
        .unwrap();

    assert!(summary.is_complete());
    assert_eq!(summary.rows_written, 4);

    let rows = fixture.cube();
    assert_eq!(rows.len(), 4);
    for row in &rows {
        assert_relative_eq!(row.margin, 1000.0);
        assert_eq!(row.depth, MarginDepth::All);
        assert_eq!(row.portfolio, "CPTY_A");
    }
    let rows = sorted(rows);
    let first = &rows[0];
    assert_eq!(first.asof, Date::from_ymd(2026, 1, 1).unwrap());
    assert_relative_eq!(first.time, 365.0 / 365.25);

    // The shared market file holds the last sample: 2 lines per snapshot.
    let market = fs::read_to_string(fixture.path("Input/market.txt")).unwrap();
    assert_eq!(
        market,
        "\
2026-01-01 DISCOUNT/RATE/EUR/EUR/1Y 0.98
2026-01-01 DISCOUNT/RATE/EUR/EUR-EURIBOR-6M/1Y 0.97
2027-01-01 DISCOUNT/RATE/EUR/EUR/1Y 0.96
2027-01-01 DISCOUNT/RATE/EUR/EUR-EURIBOR-6M/1Y 0.95
"
    );
    let fixings = fs::read_to_string(fixture.path("Input/fixings.txt")).unwrap();
    assert_eq!(
        fixings,
        "#Sample=2\n2026-01-01 EUR-EURIBOR-6M 0.023\n2027-01-01 EUR-EURIBOR-6M 0.024\n"
    );
}

#[test]
fn test_missing_report_for_one_date() {
    let fixture = Fixture::new();
    let config = fixture.config();
    let inputs = BenchmarkInputs::load(&config).unwrap();
    let skip = Date::from_ymd(2027, 1, 1).unwrap();
    let summary = BenchmarkRun::from_config(&config, &inputs)
        .unwrap()
        .run(|ws| {
            let mut stub = StubService::for_workspace(ws);
            stub.missing_report_on = Some((2, skip));
            Ok(stub)
        })
        .unwrap();

    assert!(summary.is_complete());
    assert_eq!(summary.skipped, 1);
    let rows = fixture.cube();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.margin == 1000.0));
    assert!(!rows
        .iter()
        .any(|r| r.sample == SampleIndex::new(2) && r.asof == skip));
}

#[test]
fn test_failed_invocation_aborts_only_that_sample() {
    let fixture = Fixture::new();
    let config = fixture.config();
    let inputs = BenchmarkInputs::load(&config).unwrap();
    let summary = BenchmarkRun::from_config(&config, &inputs)
        .unwrap()
        .run(|ws| {
            let mut stub = StubService::for_workspace(ws);
            stub.fail_sample = Some(1);
            Ok(stub)
        })
        .unwrap();

    assert_eq!(summary.completed, vec![SampleIndex::new(2)]);
    assert_eq!(summary.failed.len(), 1);
    let failure = &summary.failed[0];
    assert_eq!(failure.sample, SampleIndex::new(1));
    assert_eq!(failure.asof, Date::from_ymd(2026, 1, 1).ok());
    assert!(failure.message.contains("sample 1 as of 2026-01-01"));

    let rows = fixture.cube();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.sample == SampleIndex::new(2)));
}

#[test]
fn test_parallel_matches_sequential() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    let inputs = BenchmarkInputs::load(&config).unwrap();
    let factory = |ws: &SampleWorkspace| {
        let mut stub = StubService::for_workspace(ws);
        stub.npv = true;
        Ok(stub)
    };

    BenchmarkRun::from_config(&config, &inputs).unwrap().run(factory).unwrap();
    let sequential = sorted(fixture.cube());

    config.workers = 2;
    let run = BenchmarkRun::from_config(&config, &inputs).unwrap();
    assert_eq!(run.workers(), 2);
    run.run(factory).unwrap();
    let parallel = fixture.cube();

    assert_eq!(sorted(parallel), sequential);
    assert_eq!(sequential.len(), 8);

    // Each worker wrote into its own directory.
    for sample in [1, 2] {
        let root = fixture.path(&format!("Output/workers/sample_{}", sample));
        assert!(root.join("ore.xml").is_file());
        let fixings = fs::read_to_string(root.join("fixings.txt")).unwrap();
        assert!(fixings.starts_with(&format!("#Sample={}\n", sample)));
    }
}

#[test]
fn test_rerun_replaces_cube() {
    let fixture = Fixture::new();
    let config = fixture.config();
    let inputs = BenchmarkInputs::load(&config).unwrap();
    let run = BenchmarkRun::from_config(&config, &inputs).unwrap();

    run.run(|ws| Ok(StubService::for_workspace(ws))).unwrap();
    let first = fs::read(fixture.path("Output/cube.csv")).unwrap();
    run.run(|ws| Ok(StubService::for_workspace(ws))).unwrap();
    let second = fs::read(fixture.path("Output/cube.csv")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_sample_selection_and_expected_profile() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.samples = Some(SampleSelection::List(vec![2]));
    config.depths = vec!["all".to_string(), "delta".to_string()];
    let inputs = BenchmarkInputs::load(&config).unwrap();
    let summary = BenchmarkRun::from_config(&config, &inputs)
        .unwrap()
        .run(|ws| {
            let mut stub = StubService::for_workspace(ws);
            stub.npv = true;
            Ok(stub)
        })
        .unwrap();

    assert_eq!(summary.completed, vec![SampleIndex::new(2)]);
    // The stub report has no Delta row.
    assert_eq!(summary.skipped, 2);

    let expected = expected_evolution(&fixture.cube());
    let depths: Vec<MarginDepth> = expected.iter().map(|r| r.depth).collect();
    assert_eq!(
        depths,
        vec![MarginDepth::All, MarginDepth::All, MarginDepth::Npv, MarginDepth::Npv]
    );
    assert_relative_eq!(expected[2].margin, -250.0);
    assert_eq!(expected[0].samples, 1);
}

#[test]
fn test_missing_descriptor_parameter_fails_load() {
    let fixture = Fixture::new();
    fs::write(
        fixture.path("Input/ore.xml"),
        r#"<ORE><Setup><Parameter name="asofDate">2025-01-01</Parameter></Setup></ORE>"#,
    )
    .unwrap();
    let config = fixture.config();
    assert!(BenchmarkInputs::load(&config).is_err());
}

#[test]
fn test_shared_descriptor_reading_other_market_file_fails_load() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.market_data_file = fixture.path("Input/other_market.txt");

    match BenchmarkInputs::load(&config) {
        Err(RunError::Valuation(ValuationError::ScratchPathMismatch { name, .. })) => {
            assert_eq!(name, "marketDataFile")
        }
        other => panic!("expected ScratchPathMismatch, got {:?}", other),
    }
    assert!(!fixture.path("Input/other_market.txt").exists());

    // Worker copies get their own paths written, so only shared mode checks.
    config.workers = 2;
    assert!(BenchmarkInputs::load(&config).is_ok());
}

#[test]
fn test_shared_descriptor_reading_other_fixing_file_fails_load() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.fixing_data_file = fixture.path("Output/fixings.txt");
    assert!(matches!(
        BenchmarkInputs::load(&config),
        Err(RunError::Valuation(ValuationError::ScratchPathMismatch { name, .. }))
            if name == "fixingDataFile"
    ));
}

#[cfg(unix)]
mod process {
    use super::*;
    use margin_replay::valuation::ProcessValuationService;
    use std::os::unix::fs::PermissionsExt;

    /// Stand-in engine: reads `outputPath` from the descriptor it is given
    /// and writes a one-row margin report there.
    fn engine(dir: &Path) -> String {
        script(
            dir,
            "engine.sh",
            r#"out=$(sed -n 's/.*name="outputPath">\([^<]*\)<.*/\1/p' "$1")
mkdir -p "$out"
printf '#Portfolio,ProductClass,RiskClass,MarginType,Bucket,SimmSide,InitialMargin,Currency\nCPTY_A,All,All,All,All,Call,1000,EUR\n' > "$out/simm.csv"
"#,
        )
    }

    fn script(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    fn asof_of(descriptor: &Path) -> String {
        let xml = fs::read_to_string(descriptor).unwrap();
        let start = xml.find(r#"name="asofDate">"#).unwrap() + r#"name="asofDate">"#.len();
        xml[start..start + 10].to_string()
    }

    #[test]
    fn test_external_process_sequential_and_parallel() {
        let fixture = Fixture::new();
        let mut config = fixture.config();
        config.valuation.program = engine(fixture.dir.path());
        config.valuation.timeout_secs = Some(30);
        let inputs = BenchmarkInputs::load(&config).unwrap();

        for workers in [1, 2] {
            config.workers = workers;
            let summary = BenchmarkRun::from_config(&config, &inputs)
                .unwrap()
                .run(|ws| ProcessValuationService::for_workspace(&config.valuation, ws))
                .unwrap();
            assert!(summary.is_complete(), "workers={}: {:?}", workers, summary.failed);
            let rows = fixture.cube();
            assert_eq!(rows.len(), 4);
            assert!(rows.iter().all(|r| r.margin == 1000.0));
        }

        // The sequential pass restored the shared descriptor; the parallel
        // pass only touched the worker copies.
        assert_eq!(asof_of(&fixture.path("Input/ore.xml")), "2025-01-01");
        let copy = fs::read_to_string(fixture.path("Output/workers/sample_1/ore.xml")).unwrap();
        assert!(copy.contains(r#"name="asofDate">2027-01-01<"#));
        assert!(copy.contains("sample_1/output"));
    }

    #[test]
    fn test_sequential_rerun_keeps_t0_and_cube() {
        let fixture = Fixture::new();
        let mut config = fixture.config();
        config.valuation.program = engine(fixture.dir.path());

        let mut cubes = Vec::new();
        for _ in 0..2 {
            let inputs = BenchmarkInputs::load(&config).unwrap();
            assert_eq!(inputs.t0, Date::from_ymd(2025, 1, 1).unwrap());
            let summary = BenchmarkRun::from_config(&config, &inputs)
                .unwrap()
                .run(|ws| ProcessValuationService::for_workspace(&config.valuation, ws))
                .unwrap();
            assert!(summary.is_complete(), "{:?}", summary.failed);
            cubes.push(fs::read(fixture.path("Output/cube.csv")).unwrap());
        }
        assert_eq!(cubes[0], cubes[1]);

        let rows = sorted(fixture.cube());
        assert_eq!(rows[0].asof, Date::from_ymd(2026, 1, 1).unwrap());
        assert_relative_eq!(rows[0].time, 365.0 / 365.25);
    }

    #[test]
    fn test_failed_engine_still_restores_descriptor() {
        let fixture = Fixture::new();
        let mut config = fixture.config();
        config.valuation.program = script(fixture.dir.path(), "broken.sh", "exit 3\n");

        let inputs = BenchmarkInputs::load(&config).unwrap();
        let summary = BenchmarkRun::from_config(&config, &inputs)
            .unwrap()
            .run(|ws| ProcessValuationService::for_workspace(&config.valuation, ws))
            .unwrap();

        assert_eq!(summary.failed.len(), 2);
        assert_eq!(summary.failed[0].asof, Date::from_ymd(2026, 1, 1).ok());
        assert_eq!(asof_of(&fixture.path("Input/ore.xml")), "2025-01-01");
        assert_eq!(
            BenchmarkInputs::load(&config).unwrap().t0,
            Date::from_ymd(2025, 1, 1).unwrap()
        );
    }
}
