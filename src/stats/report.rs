use serde::{Deserialize, Serialize};
use std::fmt;

const HISTOGRAM_BINS: usize = 20;
const BAR_WIDTH: usize = 40;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Markdown,
    Html,
}

/// Counts of `values` in equally wide bins between their minimum and maximum
fn histogram(values: &[f64]) -> Vec<(f64, f64, usize)> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let (min, max) = match finite.iter().copied().fold(None, |acc: Option<(f64, f64)>, v| {
        Some(acc.map_or((v, v), |(lo, hi)| (lo.min(v), hi.max(v))))
    }) {
        Some(bounds) => bounds,
        None => return Vec::new(),
    };
    if max == min {
        return vec![(min, max, finite.len())];
    }

    let width = (max - min) / HISTOGRAM_BINS as f64;
    let mut counts = vec![0usize; HISTOGRAM_BINS];
    for v in &finite {
        let bin = (((v - min) / width) as usize).min(HISTOGRAM_BINS - 1);
        counts[bin] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| (min + width * i as f64, min + width * (i + 1) as f64, count))
        .collect()
}

fn write_histogram(f: &mut fmt::Formatter<'_>, values: &[f64]) -> fmt::Result {
    let bins = histogram(values);
    if bins.is_empty() {
        return writeln!(f, "(no values)");
    }
    let tallest = bins.iter().map(|b| b.2).max().unwrap_or(1).max(1);
    for (low, high, count) in bins {
        let bar = "#".repeat(count * BAR_WIDTH / tallest);
        writeln!(f, "{:>10.3} .. {:>10.3} | {:<40} {}", low, high, bar, count)?;
    }
    Ok(())
}

fn normality_verdict(p: f64) -> &'static str {
    if p >= 0.05 {
        "consistent with a normal distribution"
    } else {
        "departs from a normal distribution"
    }
}

/// Bootstrap interval, normality p-value and sample, rendered through [fmt::Display]
struct Report<'a> {
    ci: (f64, f64),
    shapiro_p: f64,
    sample: &'a [f64],
    format: ReportFormat,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (low, high) = self.ci;
        let verdict = normality_verdict(self.shapiro_p);
        match self.format {
            ReportFormat::Markdown => {
                writeln!(f, "## Statistical report\n")?;
                writeln!(f, "| Quantity | Value |")?;
                writeln!(f, "|---|---|")?;
                writeln!(f, "| Ea confidence interval | {:.2} – {:.2} kJ/mol |", low, high)?;
                writeln!(f, "| Shapiro–Wilk p-value | {:.3} |", self.shapiro_p)?;
                writeln!(f, "| Samples | {} |\n", self.sample.len())?;
                writeln!(f, "The sample is {}.\n", verdict)?;
                writeln!(f, "```text")?;
                write_histogram(f, self.sample)?;
                writeln!(f, "```")
            }
            ReportFormat::Html => {
                writeln!(f, "<h2>Statistical report</h2>")?;
                writeln!(f, "<table>")?;
                writeln!(
                    f,
                    "<tr><th>Ea confidence interval</th><td>{:.2} &ndash; {:.2} kJ/mol</td></tr>",
                    low, high
                )?;
                writeln!(
                    f,
                    "<tr><th>Shapiro&ndash;Wilk p-value</th><td>{:.3}</td></tr>",
                    self.shapiro_p
                )?;
                writeln!(f, "<tr><th>Samples</th><td>{}</td></tr>", self.sample.len())?;
                writeln!(f, "</table>")?;
                writeln!(f, "<p>The sample is {}.</p>", verdict)?;
                write!(f, "<pre>")?;
                write_histogram(f, self.sample)?;
                writeln!(f, "</pre>")
            }
        }
    }
}

/// Render the bootstrap interval, the Shapiro–Wilk p-value and a text histogram
///
/// `ci` is the `(low, high)` Ea interval in kJ/mol, typically
/// [BootstrapResult::interval](crate::stats::BootstrapResult::interval).
pub fn render_report(
    ci: (f64, f64),
    shapiro_p: f64,
    residual_sample: &[f64],
    format: ReportFormat,
) -> String {
    Report {
        ci,
        shapiro_p,
        sample: residual_sample,
        format,
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_counts_every_value() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let bins = histogram(&values);
        assert_eq!(bins.len(), HISTOGRAM_BINS);
        assert_eq!(bins.iter().map(|b| b.2).sum::<usize>(), 100);
        assert_eq!(bins[19].2, 5);
    }

    #[test]
    fn test_constant_sample_has_one_bin() {
        assert_eq!(histogram(&[2.0, 2.0, 2.0]), vec![(2.0, 2.0, 3)]);
        assert!(histogram(&[]).is_empty());
    }

    #[test]
    fn test_markdown_report() {
        let report = render_report((55.123, 64.987), 0.4321, &[60.0, 61.0, 59.5], ReportFormat::Markdown);
        assert!(report.contains("55.12 – 64.99 kJ/mol"));
        assert!(report.contains("0.432"));
        assert!(report.contains("consistent with a normal distribution"));
        assert!(report.contains("```text"));
    }

    #[test]
    fn test_html_report() {
        let report = render_report((1.0, 2.0), 0.01, &[], ReportFormat::Html);
        assert!(report.starts_with("<h2>"));
        assert!(report.contains("departs from a normal distribution"));
        assert!(report.contains("<pre>(no values)\n</pre>"));
    }

    #[test]
    fn test_histogram_lines_are_fenced() {
        let values: Vec<f64> = (0..40).map(|i| (i % 7) as f64).collect();
        let report = render_report((1.0, 2.0), 0.5, &values, ReportFormat::Markdown);
        let fenced: Vec<&str> = report
            .lines()
            .skip_while(|l| *l != "```text")
            .skip(1)
            .take_while(|l| *l != "```")
            .collect();
        assert_eq!(fenced.len(), HISTOGRAM_BINS);
        assert!(report.ends_with("```\n"));
    }
}
