use sinterfit::data::parser::read_experiment_csv;
use sinterfit::json::{self, AnalysisConfig, BootstrapRequest, MasterCurveRequest};
use sinterfit::prelude::*;

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("sinterfit_{}_{}", std::process::id(), name))
}

#[test]
fn csv_file_round_trip_into_fit() {
    let truth = KineticParameters::new(70.0, 5.0);
    let mut paths = Vec::new();
    for temperature in [1000.0, 1060.0] {
        let experiment = SyntheticExperiment::new(truth, (0..8).map(|i| i as f64 * 25.0).collect())
            .isothermal(temperature)
            .generate("csv")
            .unwrap();
        let mut text = String::from("Time_s,Temperature_C,DensidadePct\n");
        for s in experiment.samples() {
            text.push_str(&format!("{:?},{:?},{:?}\n", s.time_s, s.temperature_c, s.density_pct));
        }
        let path = temp_path(&format!("{}.csv", temperature));
        std::fs::write(&path, text).unwrap();
        paths.push(path);
    }

    let experiments: Vec<Experiment> = paths
        .iter()
        .map(|p| read_experiment_csv(p, p.display().to_string()).unwrap())
        .collect();
    for p in &paths {
        let _ = std::fs::remove_file(p);
    }

    let result = fit(&experiments, &FitOptions::default()).unwrap();
    assert!((result.params.ea_kj - 70.0).abs() < 0.01, "{}", result.params);
}

#[test]
fn missing_csv_is_io_error() {
    let err = read_experiment_csv(temp_path("missing.csv"), "missing").unwrap_err();
    assert!(matches!(err, SinterError::Io(_)));
}

#[test]
fn master_curve_request_from_json() {
    let request: MasterCurveRequest = serde_json::from_str(
        r#"{
            "records": [
                {"time": 0, "temperature": 100, "density": 40},
                {"time": 1, "temperature": 110, "density": 45},
                {"time": 2, "temperature": 120, "density": 52},
                {"time": 3, "temperature": 130, "density": 60}
            ],
            "activation_energy": 50
        }"#,
    )
    .unwrap();
    let response = json::master_curve(&request).unwrap();
    let text = json::to_json(&response).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["master_time"].as_array().unwrap().len(), 4);
    assert_eq!(value["activation_energy"], 50.0);
}

#[test]
fn bootstrap_request_uses_config_options() {
    let config = AnalysisConfig::from_json_str(r#"{"bootstrap": {"n_resamples": 40, "seed": 9}}"#)
        .unwrap();
    let experiment = |t: f64, d: [f64; 3]| {
        d.iter()
            .enumerate()
            .map(|(i, density)| json::SinteringRecord {
                time: 10.0 * i as f64,
                temperature: t,
                density: *density,
            })
            .collect::<Vec<_>>()
    };
    let request = BootstrapRequest {
        experiments: vec![
            experiment(1000.0, [0.0, 20.0, 35.0]),
            experiment(1050.0, [0.0, 30.0, 50.0]),
            experiment(1100.0, [0.0, 40.0, 65.0]),
        ],
        options: config.bootstrap,
    };
    let response = json::bootstrap(&request).unwrap();
    assert_eq!(response.n_successful + response.n_failed, 40);
    assert!(response.ci_low <= response.ci_high);
}

#[test]
fn report_renders_bootstrap_output() {
    let truth = KineticParameters::new(80.0, 10.0);
    let experiments: Vec<Experiment> = (0..6)
        .map(|i| {
            SyntheticExperiment::new(truth, (0..10).map(|t| t as f64 * 10.0).collect())
                .isothermal(1000.0 + 20.0 * i as f64)
                .with_noise(0.3, i as u64)
                .generate(format!("r{}", i))
                .unwrap()
        })
        .collect();
    let result = confidence_interval(
        &experiments,
        &BootstrapOptions::default().with_resamples(60).with_seed(5),
    )
    .unwrap();
    let p = shapiro_normality(&result.estimates).unwrap();
    let report = render_report(result.interval(), p, &result.estimates, ReportFormat::Markdown);
    assert!(report.contains("kJ/mol"));
    assert!(report.lines().filter(|l| l.contains(" .. ")).count() == 20);
}
