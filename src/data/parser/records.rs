use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::data::{Experiment, Sample};
use crate::error::SinterError;

/// Column aliases accepted in sintering CSV files, lower-cased
///
/// Headers are matched exactly against this table after lower-casing, so
/// `Time_s`, `TIME_S` and `time` all resolve to `time_s`.
const HEADER_ALIASES: &[(&str, &[&str])] = &[
    ("time_s", &["time_s", "time", "tempo_s"]),
    ("temperature_c", &["temperature_c", "temperature", "temp_c"]),
    ("density_pct", &["density_pct", "densidadepct", "density"]),
];

/// One row of a sintering CSV file
#[derive(Deserialize, Debug, Clone, Copy)]
struct Record {
    time_s: f64,
    temperature_c: f64,
    density_pct: f64,
}

fn canonical_header(header: &str) -> String {
    let lower = header.trim().to_lowercase();
    HEADER_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&lower.as_str()))
        .map(|(canonical, _)| canonical.to_string())
        .unwrap_or(lower)
}

/// Read a single experiment from a CSV file
///
/// The file must contain a header row with time (s), temperature (°C) and
/// relative density (%) columns; other columns are ignored. Lines starting
/// with `#` are treated as comments.
///
/// # Example
///
/// ```rust,no_run
/// use sinterfit::data::parser::read_experiment_csv;
///
/// let experiment = read_experiment_csv("runs/alumina_1350.csv", "alumina_1350").unwrap();
/// println!("{} samples", experiment.len());
/// ```
pub fn read_experiment_csv(
    path: impl AsRef<Path>,
    id: impl Into<String>,
) -> Result<Experiment, SinterError> {
    let file = std::fs::File::open(path)?;
    read_experiment_reader(file, id)
}

/// Read a single experiment from any CSV source
pub fn read_experiment_reader<R: Read>(
    reader: R,
    id: impl Into<String>,
) -> Result<Experiment, SinterError> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()?
        .iter()
        .map(canonical_header)
        .collect::<Vec<_>>();
    for (required, _) in HEADER_ALIASES {
        if !headers.iter().any(|h| h == required) {
            return Err(SinterError::invalid(format!(
                "missing required column '{}'",
                required
            )));
        }
    }
    reader.set_headers(csv::StringRecord::from(headers));

    let mut samples = Vec::new();
    for row in reader.deserialize() {
        let record: Record = row?;
        samples.push(Sample::new(
            record.time_s,
            record.temperature_c,
            record.density_pct,
        ));
    }
    tracing::debug!(rows = samples.len(), "read sintering CSV");

    Experiment::new(id, samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_legacy_headers() {
        let data = "\
# furnace log
Time_s,Temperature_C,DensidadePct,operator
0,1000,55.0,ana
10,1005,57.5,ana
20,1010,60.0,ana
";
        let exp = read_experiment_reader(data.as_bytes(), "legacy").unwrap();
        assert_eq!(exp.id(), "legacy");
        assert_eq!(exp.len(), 3);
        assert_eq!(exp.samples()[2].density_pct, 60.0);
        assert_eq!(exp.samples()[1].temperature_c, 1005.0);
    }

    #[test]
    fn test_reads_short_headers() {
        let data = "time, temperature, density\n0, 900, 40\n5, 900, 41\n";
        let exp = read_experiment_reader(data.as_bytes(), "short").unwrap();
        assert_eq!(exp.times(), vec![0.0, 5.0]);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let data = "time_s,temperature_c\n0,900\n1,900\n";
        let err = read_experiment_reader(data.as_bytes(), "bad").unwrap_err();
        assert!(matches!(err, SinterError::InvalidInput { .. }));
    }

    #[test]
    fn test_unparseable_value_is_csv_error() {
        let data = "time_s,temperature_c,density_pct\n0,900,abc\n1,900,2\n";
        let err = read_experiment_reader(data.as_bytes(), "bad").unwrap_err();
        assert!(matches!(err, SinterError::Csv(_)));
    }
}
