use crate::data::{Experiment, Sample};
use crate::error::SinterError;
use crate::kinetics::fit;
use crate::master::build;
use crate::stats::{confidence_interval, shapiro_normality};

use super::types::*;

/// Convert records to an experiment; the records must already be sorted by time
pub fn records_to_experiment(
    id: impl Into<String>,
    records: &[SinteringRecord],
) -> Result<Experiment, SinterError> {
    let samples = records
        .iter()
        .map(|r| Sample::new(r.time, r.temperature, r.density))
        .collect();
    Experiment::new(id, samples)
}

fn to_experiments(sets: &[Vec<SinteringRecord>]) -> Result<Vec<Experiment>, SinterError> {
    sets.iter()
        .enumerate()
        .map(|(i, records)| records_to_experiment(format!("experiment_{}", i + 1), records))
        .collect()
}

pub fn calibrate(request: &CalibrateRequest) -> Result<CalibrateResponse, SinterError> {
    let experiments = to_experiments(&request.experiments)?;
    let result = fit(&experiments, &request.options)?;
    let shapiro_p = shapiro_normality(&result.residuals).ok();
    Ok(CalibrateResponse {
        ea: result.params.ea_kj,
        a: result.params.a,
        r_squared: result.r_squared,
        n_points: result.n_points,
        ea_std_error: result.ea_std_error,
        shapiro_p,
    })
}

pub fn master_curve(request: &MasterCurveRequest) -> Result<MasterCurveResponse, SinterError> {
    let experiment = records_to_experiment("master_curve", &request.records)?;
    let curve = build(&experiment, request.activation_energy, &request.options)?;
    Ok(MasterCurveResponse {
        master_time: curve.master_times(),
        master_density: curve.points.iter().map(|p| p.master_density_pct).collect(),
        activation_energy: curve.ea_kj,
        reference_temperature: curve.reference_temperature_k,
    })
}

pub fn refine(request: &RefineRequest) -> Result<RefineResponse, SinterError> {
    let mut experiment = records_to_experiment("refine", &request.records)?;
    if request.time_range.is_some() || request.density_range.is_some() {
        experiment = experiment.refine(request.time_range, request.density_range)?;
    }
    if let Some(bin_size) = request.bin_size {
        experiment = experiment.bin_average(bin_size)?;
    }
    if let Some(smoothing) = request.smoothing {
        experiment = experiment.savitzky_golay(smoothing.window, smoothing.polyorder)?;
    }
    let records = experiment
        .samples()
        .iter()
        .map(|s| SinteringRecord {
            time: s.time_s,
            temperature: s.temperature_c,
            density: s.density_pct,
        })
        .collect();
    Ok(RefineResponse { records })
}

pub fn bootstrap(request: &BootstrapRequest) -> Result<BootstrapResponse, SinterError> {
    let experiments = to_experiments(&request.experiments)?;
    let result = confidence_interval(&experiments, &request.options)?;
    Ok(BootstrapResponse {
        ci_low: result.ci_low_kj,
        ci_high: result.ci_high_kj,
        n_successful: result.estimates.len(),
        n_failed: result.n_failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::to_json;

    fn records(temperature: f64, densities: &[f64]) -> Vec<SinteringRecord> {
        densities
            .iter()
            .enumerate()
            .map(|(i, d)| SinteringRecord {
                time: i as f64 * 10.0,
                temperature,
                density: *d,
            })
            .collect()
    }

    #[test]
    fn test_calibrate_two_temperatures() {
        let request = CalibrateRequest {
            experiments: vec![
                records(1000.0, &[0.0, 20.0, 36.5, 48.0]),
                records(1100.0, &[0.0, 40.5, 63.5, 78.9]),
            ],
            options: Default::default(),
        };
        let response = calibrate(&request).unwrap();
        assert!(response.ea > 0.0);
        assert_eq!(response.n_points, 6);
        assert!(response.shapiro_p.is_some());
    }

    #[test]
    fn test_nan_becomes_null() {
        let response = CalibrateResponse {
            ea: 60.0,
            a: 2.0,
            r_squared: 1.0,
            n_points: 2,
            ea_std_error: f64::NAN,
            shapiro_p: None,
        };
        let text = to_json(&response).unwrap();
        assert!(text.contains("\"ea_std_error\":null"));
        assert!(text.contains("\"shapiro_p\":null"));
    }

    #[test]
    fn test_master_curve_with_supplied_energy() {
        let request = MasterCurveRequest {
            records: records(1200.0, &[50.0, 55.0, 60.0]),
            activation_energy: Some(80.0),
            options: Default::default(),
        };
        let response = master_curve(&request).unwrap();
        assert_eq!(response.master_density, vec![50.0, 55.0, 60.0]);
        assert_eq!(response.activation_energy, 80.0);
    }

    #[test]
    fn test_refine_applies_filters_in_order() {
        let request: RefineRequest = serde_json::from_str(
            r#"{
                "records": [
                    {"time_s": 0, "temperature_c": 1000, "density_pct": 50},
                    {"time_s": 1, "temperature_c": 1000, "density_pct": 52},
                    {"time_s": 2, "temperature_c": 1000, "density_pct": 54},
                    {"time_s": 3, "temperature_c": 1000, "density_pct": 56},
                    {"time_s": 4, "temperature_c": 1000, "density_pct": 58}
                ],
                "time_range": [1, 4],
                "bin_size": 2
            }"#,
        )
        .unwrap();
        let response = refine(&request).unwrap();
        assert_eq!(response.records.len(), 3);
        assert_eq!(response.records[0].time, 1.0);
        assert_eq!(response.records[1].density, 55.0);
    }

    #[test]
    fn test_invalid_records_are_reported() {
        let request = MasterCurveRequest {
            records: records(1000.0, &[50.0]),
            activation_energy: Some(10.0),
            options: Default::default(),
        };
        assert!(master_curve(&request).is_err());
    }
}
