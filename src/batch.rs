use std::collections::HashMap;
use std::io;

use serde::Serialize;

use crate::catalog;
use crate::risk::{self, RiskClassification, RiskThresholds};

pub const EXPORT_HEADER: [&str; 6] = [
    "Student ID",
    "Year",
    "Percentage",
    "Avg Attendance",
    "Risk Level",
    "Risk Score",
];

/// One spreadsheet row, header name to raw cell text. Cells missing from a
/// short row are absent from the map.
pub type CsvRow = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub struct StudentResult {
    pub student_id: String,
    pub year: u32,
    pub percentage: f64,
    pub avg_attendance: f64,
    pub classification: RiskClassification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ResultFilter {
    #[default]
    All,
    AtRisk,
    Safe,
}

impl ResultFilter {
    pub fn matches(self, result: &StudentResult) -> bool {
        match self {
            ResultFilter::All => true,
            ResultFilter::AtRisk => result.classification.risk_level.is_at_risk(),
            ResultFilter::Safe => !result.classification.risk_level.is_at_risk(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub at_risk: usize,
    pub safe: usize,
}

#[derive(Serialize)]
struct ExportRow<'a> {
    #[serde(rename = "Student ID")]
    student_id: &'a str,
    #[serde(rename = "Year")]
    year: u32,
    #[serde(rename = "Percentage")]
    percentage: String,
    #[serde(rename = "Avg Attendance")]
    avg_attendance: String,
    #[serde(rename = "Risk Level")]
    risk_level: &'static str,
    #[serde(rename = "Risk Score")]
    risk_score: String,
}

/// Reads a header line followed by data rows. Rows may be shorter or longer
/// than the header; blank rows are skipped.
pub fn read_rows<R: io::Read>(input: R) -> Result<Vec<CsvRow>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let row: CsvRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

fn cell<'a>(row: &'a CsvRow, column: &str) -> Option<&'a str> {
    row.get(column).map(String::as_str)
}

/// Reads `Year` the way spreadsheets write it: `2`, `2.0` and `2.7` are all
/// year 2. Anything that is not a positive whole year reads as year 1.
fn row_year(row: &CsvRow) -> u32 {
    risk::parse_numeric(cell(row, "Year"))
        .map(f64::trunc)
        .filter(|year| *year >= 1.0 && *year <= u32::MAX as f64)
        .map(|year| year as u32)
        .unwrap_or(catalog::FIRST_YEAR)
}

pub fn analyze_row(row: &CsvRow, thresholds: &RiskThresholds) -> StudentResult {
    let year = row_year(row);
    let subjects = catalog::subjects_for_year(year).unwrap_or(&[]);

    let (s1_column, s2_column) = catalog::attendance_columns(year);
    let avg_attendance = risk::compute_average_attendance(
        risk::coerce_numeric_or_zero(cell(row, &s1_column)),
        risk::coerce_numeric_or_zero(cell(row, &s2_column)),
    );

    let scores: HashMap<String, f64> = subjects
        .iter()
        .map(|subject| {
            let score = risk::coerce_numeric_or_zero(cell(row, &subject.csv_column(year)));
            (subject.column_key.to_string(), score)
        })
        .collect();
    let subject_scores: Vec<f64> = subjects
        .iter()
        .map(|subject| scores[subject.column_key])
        .collect();

    // A supplied Percentage of 0 is treated as absent.
    let percentage = match risk::parse_numeric(cell(row, "Percentage")) {
        Some(value) if value != 0.0 => risk::round2(value),
        _ => risk::compute_weighted_percentage(&scores, subjects),
    };

    let classification =
        risk::classify_risk(percentage, avg_attendance, thresholds, Some(&subject_scores));

    StudentResult {
        student_id: cell(row, "Student_ID").unwrap_or_default().to_string(),
        year,
        percentage,
        avg_attendance,
        classification,
    }
}

/// Classifies every row, keeping input order.
pub fn analyze_rows(rows: &[CsvRow], thresholds: &RiskThresholds) -> Vec<StudentResult> {
    rows.iter().map(|row| analyze_row(row, thresholds)).collect()
}

pub fn analyze_csv<R: io::Read>(
    input: R,
    thresholds: &RiskThresholds,
) -> Result<Vec<StudentResult>, csv::Error> {
    let rows = read_rows(input)?;
    tracing::info!(rows = rows.len(), "processing student records");
    let results = analyze_rows(&rows, thresholds);
    tracing::info!(
        at_risk = summarize(&results).at_risk,
        "bulk analysis complete"
    );
    Ok(results)
}

pub fn filter_results(results: &[StudentResult], filter: ResultFilter) -> Vec<&StudentResult> {
    results.iter().filter(|result| filter.matches(result)).collect()
}

pub fn summarize(results: &[StudentResult]) -> BatchSummary {
    let at_risk = results
        .iter()
        .filter(|result| result.classification.risk_level.is_at_risk())
        .count();
    BatchSummary {
        total: results.len(),
        at_risk,
        safe: results.len() - at_risk,
    }
}

pub fn export_csv<W: io::Write>(results: &[StudentResult], output: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(output);
    if results.is_empty() {
        writer.write_record(EXPORT_HEADER)?;
    }

    for result in results {
        writer.serialize(ExportRow {
            student_id: &result.student_id,
            year: result.year,
            percentage: format!("{:.2}", risk::round2(result.percentage)),
            avg_attendance: format!("{:.2}", risk::round2(result.avg_attendance)),
            risk_level: result.classification.risk_level.label(),
            risk_score: format!("{:.2}", risk::round2(result.classification.risk_score)),
        })?;
    }

    writer.flush()?;
    Ok(())
}
