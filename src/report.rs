//! Report persistence: pretty JSON per solve and an append-only CSV
//! summary for collecting runs across instances.

use crate::result::SolveReport;
use chrono::Local;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::Path;

/// Flat one-row summary of a report, for the CSV log.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    timestamp: String,
    instance: &'a str,
    variant: &'a str,
    optimal: bool,
    objective: Option<f64>,
    total_runtime: f64,
    iterations: usize,
    variables: usize,
    constraints: usize,
    cuts: usize,
    heuristic_bound: Option<f64>,
    failure: Option<String>,
}

/// Write the full report as pretty-printed JSON.
pub fn write_json<P: AsRef<Path>>(report: &SolveReport, path: P) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
}

/// Append a one-row summary to a CSV log, writing the header only when
/// the file is created.
pub fn append_csv<P: AsRef<Path>>(report: &SolveReport, path: P) -> std::io::Result<()> {
    let exists = path.as_ref().exists();
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new().has_headers(!exists).from_writer(file);
    writer.serialize(CsvRow {
        timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        instance: &report.name,
        variant: report.variant.as_str(),
        optimal: report.optimal,
        objective: report.objective,
        total_runtime: report.total_runtime,
        iterations: report.iteration_count,
        variables: report.variable_count,
        constraints: report.total_constraint_count,
        cuts: report.additional_constraint_count,
        heuristic_bound: report.heuristic_bound,
        failure: report.failure.as_ref().map(|f| f.to_string()),
    })?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Variant;
    use crate::result::ResultAccumulator;

    fn sample_report() -> SolveReport {
        let acc = ResultAccumulator::new("sample", Variant::Tsp);
        acc.finish_optimal(0.1, 10, 5, 0)
    }

    #[test]
    fn test_json_round_trip_via_file() {
        let dir = std::env::temp_dir().join("tspd_report_json_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("report.json");
        write_json(&sample_report(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let back: SolveReport = serde_json::from_str(&text).unwrap();
        assert_eq!(back.name, "sample");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_csv_appends_without_duplicate_header() {
        let dir = std::env::temp_dir().join("tspd_report_csv_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("runs.csv");
        std::fs::remove_file(&path).ok();

        append_csv(&sample_report(), &path).unwrap();
        append_csv(&sample_report(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let header_lines = text.lines().filter(|l| l.starts_with("timestamp")).count();
        assert_eq!(header_lines, 1);
        assert_eq!(text.lines().count(), 3);
        std::fs::remove_dir_all(&dir).ok();
    }
}
