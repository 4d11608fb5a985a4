use std::fmt::Write;

use crate::batch::{BatchSummary, ResultFilter, StudentResult};
use crate::models::Prediction;
use crate::risk::RiskThresholds;

fn factor_label(key: &str) -> String {
    let mut label = key.replace('_', " ");
    if let Some(first) = label.get(0..1) {
        let upper = first.to_uppercase();
        label.replace_range(0..1, &upper);
    }
    label
}

pub fn render_prediction(prediction: &Prediction) -> String {
    let mut output = String::new();
    let level = prediction.risk_level;

    let _ = writeln!(output, "# Risk Prediction");
    let _ = writeln!(
        output,
        "Prediction {} (created {})",
        prediction.id,
        prediction.created_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Risk level: {} ({:.1}% risk score)",
        level,
        prediction.risk_score * 100.0
    );
    let _ = writeln!(output, "{}", level.advice());
    let _ = writeln!(output);
    let _ = writeln!(output, "## Inputs");
    let _ = writeln!(output, "- Percentage: {:.2}%", prediction.percentage);
    let _ = writeln!(output, "- Average attendance: {:.2}%", prediction.avg_attendance);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Factors");

    if prediction.factors.is_empty() {
        let _ = writeln!(output, "No factors recorded.");
    } else {
        for (key, description) in &prediction.factors {
            let _ = writeln!(output, "- {}: {}", factor_label(key), description);
        }
    }

    output
}

pub fn render_lookup(prediction: Option<&Prediction>) -> String {
    match prediction {
        Some(prediction) => render_prediction(prediction),
        None => "Prediction not found.\n".to_string(),
    }
}

pub fn render_thresholds(thresholds: &RiskThresholds) -> String {
    let mut output = String::new();
    let bands = [
        ("High Risk", thresholds.high_risk),
        ("Risk", thresholds.risk),
        ("Low Risk", thresholds.low_risk),
    ];

    let _ = writeln!(output, "Risk thresholds (a student falls in a band when below either value):");
    for (label, band) in bands {
        let _ = writeln!(
            output,
            "- {label}: percentage < {}%, attendance < {}%",
            band.percentage, band.attendance
        );
    }
    output
}

pub fn render_batch(
    results: &[&StudentResult],
    summary: BatchSummary,
    filter: ResultFilter,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Bulk Student Analysis");
    let _ = writeln!(
        output,
        "Total students: {} | At risk: {} | Safe: {}",
        summary.total, summary.at_risk, summary.safe
    );
    let _ = writeln!(output);

    let heading = match filter {
        ResultFilter::All => "All Students",
        ResultFilter::AtRisk => "At Risk Students",
        ResultFilter::Safe => "Safe Students",
    };
    let _ = writeln!(output, "## {} ({})", heading, results.len());

    if results.is_empty() {
        let _ = writeln!(output, "No students match this filter.");
        return output;
    }

    let _ = writeln!(
        output,
        "{:<16} {:<6} {:>10} {:>10} {:<10} {:>10}",
        "Student ID", "Year", "Percentage", "Attendance", "Risk Level", "Risk Score"
    );
    for result in results {
        let _ = writeln!(
            output,
            "{:<16} {:<6} {:>9.2}% {:>9.2}% {:<10} {:>9.1}%",
            result.student_id,
            format!("Year {}", result.year),
            result.percentage,
            result.avg_attendance,
            result.classification.risk_level.label(),
            result.classification.risk_score * 100.0
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::batch;
    use crate::risk::RiskLevel;

    fn sample_prediction() -> Prediction {
        Prediction {
            id: Uuid::new_v4(),
            student_uuid: Uuid::new_v4(),
            performance_data_id: Uuid::new_v4(),
            risk_level: RiskLevel::Risk,
            risk_score: 0.60,
            percentage: 48.5,
            avg_attendance: 80.0,
            factors: BTreeMap::from([
                (
                    "performance".to_string(),
                    "Warning: Performance below 50%".to_string(),
                ),
                (
                    "failed_subjects".to_string(),
                    "2 subject(s) below passing grade (36)".to_string(),
                ),
            ]),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn prediction_report_lists_level_and_factors() {
        let report = render_prediction(&sample_prediction());
        assert!(report.contains("Risk level: Risk (60.0% risk score)"));
        assert!(report.contains("Moderate risk detected. Intervention recommended."));
        assert!(report.contains("- Percentage: 48.50%"));
        assert!(report.contains("- Failed subjects: 2 subject(s) below passing grade (36)"));
        assert!(report.contains("- Performance: Warning: Performance below 50%"));
    }

    #[test]
    fn lookup_reports_missing_prediction() {
        assert_eq!(render_lookup(None), "Prediction not found.\n");

        let prediction = sample_prediction();
        assert_eq!(
            render_lookup(Some(&prediction)),
            render_prediction(&prediction)
        );
    }

    #[test]
    fn thresholds_report_shows_each_band() {
        let report = render_thresholds(&RiskThresholds::default());
        assert!(report.contains("- High Risk: percentage < 36%, attendance < 50%"));
        assert!(report.contains("- Low Risk: percentage < 70%, attendance < 75%"));
    }

    #[test]
    fn batch_report_respects_filter() {
        let text = "Student_ID,Year,Attendance_Y1_S1,Attendance_Y1_S2,Percentage\nA1,1,90,90,88\nA2,1,30,30,88\n";
        let results = batch::analyze_csv(text.as_bytes(), &RiskThresholds::default()).unwrap();
        let summary = batch::summarize(&results);
        let safe = batch::filter_results(&results, ResultFilter::Safe);

        let report = render_batch(&safe, summary, ResultFilter::Safe);
        assert!(report.contains("Total students: 2 | At risk: 1 | Safe: 1"));
        assert!(report.contains("## Safe Students (1)"));
        assert!(report.contains("A1"));
        assert!(!report.contains("A2"));
    }

    #[test]
    fn empty_batch_report() {
        let summary = batch::summarize(&[]);
        let report = render_batch(&[], summary, ResultFilter::AtRisk);
        assert!(report.contains("No students match this filter."));
    }
}
