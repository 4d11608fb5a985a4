use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::SubjectDefinition;
use crate::error::ThresholdError;

pub const PASSING_SCORE: f64 = 36.0;

/// Severity buckets, ordered from safest to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "No Risk")]
    NoRisk,
    #[serde(rename = "Low Risk")]
    LowRisk,
    #[serde(rename = "Risk")]
    Risk,
    #[serde(rename = "High Risk")]
    HighRisk,
}

impl RiskLevel {
    pub fn risk_score(self) -> f64 {
        match self {
            RiskLevel::NoRisk => 0.10,
            RiskLevel::LowRisk => 0.35,
            RiskLevel::Risk => 0.60,
            RiskLevel::HighRisk => 0.85,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::NoRisk => "No Risk",
            RiskLevel::LowRisk => "Low Risk",
            RiskLevel::Risk => "Risk",
            RiskLevel::HighRisk => "High Risk",
        }
    }

    pub fn advice(self) -> &'static str {
        match self {
            RiskLevel::NoRisk => "Excellent performance! Student is on track for success.",
            RiskLevel::LowRisk => {
                "Minor concern. Encourage improvement in attendance or performance."
            }
            RiskLevel::Risk => "Moderate risk detected. Intervention recommended.",
            RiskLevel::HighRisk => "High risk! Immediate attention and support required.",
        }
    }

    pub fn is_at_risk(self) -> bool {
        self != RiskLevel::NoRisk
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "No Risk" => Ok(RiskLevel::NoRisk),
            "Low Risk" => Ok(RiskLevel::LowRisk),
            "Risk" => Ok(RiskLevel::Risk),
            "High Risk" => Ok(RiskLevel::HighRisk),
            other => Err(format!("unknown risk level `{other}`")),
        }
    }
}

/// Percentage and attendance cut-offs for one severity band. A record falls
/// into the band when either value is strictly below its cut-off.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandThreshold {
    pub percentage: f64,
    pub attendance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RiskThresholds {
    pub high_risk: BandThreshold,
    pub risk: BandThreshold,
    pub low_risk: BandThreshold,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high_risk: BandThreshold {
                percentage: 36.0,
                attendance: 50.0,
            },
            risk: BandThreshold {
                percentage: 50.0,
                attendance: 65.0,
            },
            low_risk: BandThreshold {
                percentage: 70.0,
                attendance: 75.0,
            },
        }
    }
}

impl RiskThresholds {
    /// Rejects cut-offs outside 0–100 and bands that are not ordered
    /// high risk <= risk <= low risk on each axis.
    pub fn validate(&self) -> Result<(), ThresholdError> {
        let bands = [
            ("high risk", self.high_risk),
            ("risk", self.risk),
            ("low risk", self.low_risk),
        ];
        for (band, threshold) in bands {
            for (axis, value) in [
                ("percentage", threshold.percentage),
                ("attendance", threshold.attendance),
            ] {
                if !(0.0..=100.0).contains(&value) {
                    return Err(ThresholdError::OutOfRange { band, axis, value });
                }
            }
        }

        if self.high_risk.percentage > self.risk.percentage
            || self.risk.percentage > self.low_risk.percentage
        {
            return Err(ThresholdError::Unordered { axis: "percentage" });
        }
        if self.high_risk.attendance > self.risk.attendance
            || self.risk.attendance > self.low_risk.attendance
        {
            return Err(ThresholdError::Unordered { axis: "attendance" });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskClassification {
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub factors: BTreeMap<String, String>,
}

/// Lenient numeric reading used for every form field and spreadsheet cell.
pub fn parse_numeric(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

/// Missing, blank or non-numeric input reads as 0.
pub fn coerce_numeric_or_zero(raw: Option<&str>) -> f64 {
    parse_numeric(raw).unwrap_or(0.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Credit-weighted mean of the subject scores, keyed by `column_key`.
/// Subjects without a score count as 0.
pub fn compute_weighted_percentage(
    scores: &HashMap<String, f64>,
    subjects: &[SubjectDefinition],
) -> f64 {
    let mut total_weighted = 0.0;
    let mut total_credits = 0.0;

    for subject in subjects {
        let credit = subject.credit_weight as f64;
        let score = scores.get(subject.column_key).copied().unwrap_or(0.0);
        total_weighted += score * credit;
        total_credits += credit;
    }

    if total_credits > 0.0 {
        round2(total_weighted / total_credits)
    } else {
        0.0
    }
}

pub fn compute_average_attendance(semester_1: f64, semester_2: f64) -> f64 {
    round2((semester_1 + semester_2) / 2.0)
}

pub fn classify_risk(
    percentage: f64,
    avg_attendance: f64,
    thresholds: &RiskThresholds,
    subject_scores: Option<&[f64]>,
) -> RiskClassification {
    let mut factors = BTreeMap::new();
    factors.insert(
        "performance".to_string(),
        performance_factor(percentage, thresholds),
    );
    factors.insert(
        "attendance".to_string(),
        attendance_factor(avg_attendance, thresholds),
    );

    if let Some(scores) = subject_scores {
        let failed = scores.iter().filter(|score| **score < PASSING_SCORE).count();
        if failed > 0 {
            factors.insert(
                "failed_subjects".to_string(),
                format!("{failed} subject(s) below passing grade ({PASSING_SCORE})"),
            );
        }
    }

    let risk_level = risk_level(percentage, avg_attendance, thresholds);
    RiskClassification {
        risk_level,
        risk_score: risk_level.risk_score(),
        factors,
    }
}

/// First matching band wins, checked from most to least severe.
pub fn risk_level(percentage: f64, avg_attendance: f64, thresholds: &RiskThresholds) -> RiskLevel {
    let below = |band: &BandThreshold| {
        percentage < band.percentage || avg_attendance < band.attendance
    };

    if below(&thresholds.high_risk) {
        RiskLevel::HighRisk
    } else if below(&thresholds.risk) {
        RiskLevel::Risk
    } else if below(&thresholds.low_risk) {
        RiskLevel::LowRisk
    } else {
        RiskLevel::NoRisk
    }
}

fn performance_factor(percentage: f64, thresholds: &RiskThresholds) -> String {
    band_description(
        "Performance",
        percentage,
        [
            thresholds.high_risk.percentage,
            thresholds.risk.percentage,
            thresholds.low_risk.percentage,
        ],
    )
}

fn attendance_factor(avg_attendance: f64, thresholds: &RiskThresholds) -> String {
    band_description(
        "Attendance",
        avg_attendance,
        [
            thresholds.high_risk.attendance,
            thresholds.risk.attendance,
            thresholds.low_risk.attendance,
        ],
    )
}

fn band_description(dimension: &str, value: f64, [critical, warning, moderate]: [f64; 3]) -> String {
    if value < critical {
        format!("Critical: {dimension} below {critical}%")
    } else if value < warning {
        format!("Warning: {dimension} below {warning}%")
    } else if value < moderate {
        format!("Moderate: {dimension} below {moderate}%")
    } else {
        format!("Good: {dimension} above {moderate}%")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::subjects_for_year;

    fn year_one_scores(values: [f64; 5]) -> HashMap<String, f64> {
        subjects_for_year(1)
            .unwrap()
            .iter()
            .zip(values)
            .map(|(subject, score)| (subject.column_key.to_string(), score))
            .collect()
    }

    #[test]
    fn weighted_percentage_uses_credits() {
        let subjects = subjects_for_year(1).unwrap();
        let scores = year_one_scores([80.0, 90.0, 70.0, 60.0, 100.0]);
        assert_eq!(compute_weighted_percentage(&scores, subjects), 80.0);
    }

    #[test]
    fn weighted_percentage_rounds_to_two_places() {
        let subjects = subjects_for_year(1).unwrap();
        // (4*33 + 3*0 + 3*0 + 3*0 + 3*0) / 16 = 8.25
        let scores = year_one_scores([33.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(compute_weighted_percentage(&scores, subjects), 8.25);

        // 1143 / 16 = 71.4375
        let scores = year_one_scores([75.0, 70.0, 70.0, 70.0, 71.0]);
        assert_eq!(compute_weighted_percentage(&scores, subjects), 71.44);
    }

    #[test]
    fn missing_scores_count_as_zero() {
        let subjects = subjects_for_year(1).unwrap();
        let mut scores = year_one_scores([80.0, 90.0, 70.0, 60.0, 100.0]);
        scores.remove("computer");
        assert_eq!(compute_weighted_percentage(&scores, subjects), 61.25);
    }

    #[test]
    fn empty_subject_list_yields_zero() {
        assert_eq!(compute_weighted_percentage(&HashMap::new(), &[]), 0.0);
    }

    #[test]
    fn average_attendance_is_mean_of_semesters() {
        assert_eq!(compute_average_attendance(80.0, 90.0), 85.0);
        assert_eq!(compute_average_attendance(0.0, 0.0), 0.0);
        assert_eq!(compute_average_attendance(72.5, 70.0), 71.25);
    }

    #[test]
    fn coercion_degrades_to_zero() {
        assert_eq!(coerce_numeric_or_zero(Some(" 72.5 ")), 72.5);
        assert_eq!(coerce_numeric_or_zero(Some("absent")), 0.0);
        assert_eq!(coerce_numeric_or_zero(Some("")), 0.0);
        assert_eq!(coerce_numeric_or_zero(Some("NaN")), 0.0);
        assert_eq!(coerce_numeric_or_zero(None), 0.0);
    }

    #[test]
    fn severity_increases_as_percentage_drops() {
        let thresholds = RiskThresholds::default();
        let levels: Vec<RiskLevel> = [70.0, 69.0, 50.0, 49.0, 36.0, 35.0]
            .into_iter()
            .map(|percentage| risk_level(percentage, 80.0, &thresholds))
            .collect();

        assert_eq!(
            levels,
            vec![
                RiskLevel::NoRisk,
                RiskLevel::LowRisk,
                RiskLevel::LowRisk,
                RiskLevel::Risk,
                RiskLevel::Risk,
                RiskLevel::HighRisk,
            ]
        );
        assert!(levels.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn attendance_alone_triggers_high_risk() {
        let thresholds = RiskThresholds::default();
        let result = classify_risk(80.0, 40.0, &thresholds, None);
        assert_eq!(result.risk_level, RiskLevel::HighRisk);
        assert_eq!(result.risk_score, 0.85);
        assert_eq!(result.factors["performance"], "Good: Performance above 70%");
        assert_eq!(result.factors["attendance"], "Critical: Attendance below 50%");
    }

    #[test]
    fn attendance_boundaries_are_exclusive() {
        let thresholds = RiskThresholds::default();
        assert_eq!(risk_level(90.0, 75.0, &thresholds), RiskLevel::NoRisk);
        assert_eq!(risk_level(90.0, 74.99, &thresholds), RiskLevel::LowRisk);
        assert_eq!(risk_level(90.0, 65.0, &thresholds), RiskLevel::LowRisk);
        assert_eq!(risk_level(90.0, 64.0, &thresholds), RiskLevel::Risk);
        assert_eq!(risk_level(90.0, 50.0, &thresholds), RiskLevel::Risk);
        assert_eq!(risk_level(90.0, 49.5, &thresholds), RiskLevel::HighRisk);
    }

    #[test]
    fn scores_are_fixed_per_level() {
        assert_eq!(RiskLevel::NoRisk.risk_score(), 0.10);
        assert_eq!(RiskLevel::LowRisk.risk_score(), 0.35);
        assert_eq!(RiskLevel::Risk.risk_score(), 0.60);
        assert_eq!(RiskLevel::HighRisk.risk_score(), 0.85);
    }

    #[test]
    fn failed_subjects_reported_even_without_risk() {
        let thresholds = RiskThresholds::default();
        let result = classify_risk(80.0, 90.0, &thresholds, Some(&[100.0, 100.0, 20.0, 35.9, 36.0]));
        assert_eq!(result.risk_level, RiskLevel::NoRisk);
        assert_eq!(
            result.factors["failed_subjects"],
            "2 subject(s) below passing grade (36)"
        );
        assert_eq!(result.factors.len(), 3);
    }

    #[test]
    fn no_failed_subject_factor_when_all_pass() {
        let thresholds = RiskThresholds::default();
        let result = classify_risk(55.0, 70.0, &thresholds, Some(&[40.0, 50.0]));
        assert_eq!(result.risk_level, RiskLevel::LowRisk);
        assert!(!result.factors.contains_key("failed_subjects"));
        assert_eq!(result.factors["performance"], "Moderate: Performance below 70%");
        assert_eq!(result.factors["attendance"], "Moderate: Attendance below 75%");
    }

    #[test]
    fn custom_thresholds_shift_bands() {
        let thresholds = RiskThresholds {
            high_risk: BandThreshold {
                percentage: 40.0,
                attendance: 60.0,
            },
            risk: BandThreshold {
                percentage: 55.0,
                attendance: 70.0,
            },
            low_risk: BandThreshold {
                percentage: 80.0,
                attendance: 85.0,
            },
        };
        let result = classify_risk(75.0, 90.0, &thresholds, None);
        assert_eq!(result.risk_level, RiskLevel::LowRisk);
        assert_eq!(result.factors["performance"], "Moderate: Performance below 80%");

        let result = classify_risk(38.0, 90.0, &thresholds, None);
        assert_eq!(result.risk_level, RiskLevel::HighRisk);
        assert_eq!(result.factors["performance"], "Critical: Performance below 40%");
    }

    #[test]
    fn thresholds_validation() {
        assert!(RiskThresholds::default().validate().is_ok());

        let mut thresholds = RiskThresholds::default();
        thresholds.risk.attendance = 120.0;
        assert!(matches!(
            thresholds.validate(),
            Err(ThresholdError::OutOfRange { band: "risk", axis: "attendance", .. })
        ));

        let mut thresholds = RiskThresholds::default();
        thresholds.high_risk.percentage = 60.0;
        assert!(matches!(
            thresholds.validate(),
            Err(ThresholdError::Unordered { axis: "percentage" })
        ));
    }

    #[test]
    fn risk_level_names_round_trip() {
        for level in [
            RiskLevel::NoRisk,
            RiskLevel::LowRisk,
            RiskLevel::Risk,
            RiskLevel::HighRisk,
        ] {
            assert_eq!(level.to_string().parse::<RiskLevel>(), Ok(level));
        }
        assert!("Severe".parse::<RiskLevel>().is_err());
        assert_eq!(
            serde_json::to_string(&RiskLevel::LowRisk).unwrap(),
            "\"Low Risk\""
        );
    }
}
