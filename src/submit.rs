use std::collections::HashMap;

use crate::catalog::{self, SubjectDefinition};
use crate::error::{SubmitError, ValidationError};
use crate::ids::IdAllocator;
use crate::models::{NewPerformance, NewStudent, Prediction, SubjectColumn};
use crate::predict::{self, PredictRiskRequest};
use crate::risk::{self, RiskThresholds};
use crate::store::RecordStore;

/// Raw single-student form input. Scores are keyed by subject `column_key`.
#[derive(Debug, Clone, Default)]
pub struct SubmissionForm {
    pub year: u32,
    pub attendance_s1: Option<String>,
    pub attendance_s2: Option<String>,
    pub scores: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceRecord {
    pub year: u32,
    pub attendance_s1: f64,
    pub attendance_s2: f64,
    pub avg_attendance: f64,
    pub percentage: f64,
    pub subject_scores: Vec<(SubjectDefinition, f64)>,
}

impl PerformanceRecord {
    pub fn scores(&self) -> Vec<f64> {
        self.subject_scores.iter().map(|(_, score)| *score).collect()
    }

    fn columns(&self) -> Vec<SubjectColumn> {
        self.subject_scores
            .iter()
            .map(|(subject, score)| SubjectColumn {
                score_column: subject.score_column(self.year),
                credit_column: subject.credit_column(self.year),
                score: *score,
                credit: subject.credit_weight,
            })
            .collect()
    }
}

pub const ATTENDANCE_S1_LABEL: &str = "Attendance (Semester 1)";
pub const ATTENDANCE_S2_LABEL: &str = "Attendance (Semester 2)";

fn is_present(value: Option<&String>) -> bool {
    value.is_some_and(|value| !value.trim().is_empty())
}

/// Entered values that read as numbers must lie in 0–100. Text that is not
/// a number is left to the zero coercion.
fn is_out_of_range(value: Option<&String>) -> bool {
    risk::parse_numeric(value.map(String::as_str))
        .is_some_and(|value| !(0.0..=100.0).contains(&value))
}

/// Checks that both attendance figures and every subject for the year were
/// entered and are within 0–100, returning that year's subjects. Every
/// missing field is reported at once.
pub fn validate(form: &SubmissionForm) -> Result<&'static [SubjectDefinition], ValidationError> {
    let subjects =
        catalog::subjects_for_year(form.year).ok_or(ValidationError::UnsupportedYear(form.year))?;

    let fields: Vec<(&str, Option<&String>)> = [
        (ATTENDANCE_S1_LABEL, form.attendance_s1.as_ref()),
        (ATTENDANCE_S2_LABEL, form.attendance_s2.as_ref()),
    ]
    .into_iter()
    .chain(
        subjects
            .iter()
            .map(|subject| (subject.name, form.scores.get(subject.column_key))),
    )
    .collect();

    let missing: Vec<String> = fields
        .iter()
        .filter(|(_, value)| !is_present(*value))
        .map(|(label, _)| label.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }

    let out_of_range: Vec<String> = fields
        .iter()
        .filter(|(_, value)| is_out_of_range(*value))
        .map(|(label, _)| label.to_string())
        .collect();
    if !out_of_range.is_empty() {
        return Err(ValidationError::OutOfRange(out_of_range));
    }

    Ok(subjects)
}

pub fn build_record(form: &SubmissionForm, subjects: &[SubjectDefinition]) -> PerformanceRecord {
    let attendance_s1 = risk::coerce_numeric_or_zero(form.attendance_s1.as_deref());
    let attendance_s2 = risk::coerce_numeric_or_zero(form.attendance_s2.as_deref());

    let subject_scores: Vec<(SubjectDefinition, f64)> = subjects
        .iter()
        .map(|subject| {
            let raw = form.scores.get(subject.column_key).map(String::as_str);
            (*subject, risk::coerce_numeric_or_zero(raw))
        })
        .collect();

    let by_key: HashMap<String, f64> = subject_scores
        .iter()
        .map(|(subject, score)| (subject.column_key.to_string(), *score))
        .collect();

    PerformanceRecord {
        year: form.year,
        attendance_s1,
        attendance_s2,
        avg_attendance: risk::compute_average_attendance(attendance_s1, attendance_s2),
        percentage: risk::compute_weighted_percentage(&by_key, subjects),
        subject_scores,
    }
}

pub struct RecordSubmitter<'a, S, I> {
    store: &'a S,
    ids: &'a I,
}

impl<'a, S: RecordStore, I: IdAllocator> RecordSubmitter<'a, S, I> {
    pub fn new(store: &'a S, ids: &'a I) -> Self {
        Self { store, ids }
    }

    /// Validates the form, writes the student and performance rows, then
    /// classifies and stores the prediction. A failed write stops the
    /// remaining steps.
    pub async fn submit(
        &self,
        form: &SubmissionForm,
        thresholds: &RiskThresholds,
    ) -> Result<Prediction, SubmitError> {
        let subjects = validate(form)?;
        let record = build_record(form, subjects);

        let student_id = self.ids.student_id(record.year);
        tracing::info!(%student_id, year = record.year, "submitting performance record");

        let student = self
            .store
            .insert_student(&NewStudent {
                student_id,
                year: record.year,
            })
            .await
            .inspect_err(|err| tracing::error!(%err, "student creation failed"))?;
        tracing::debug!(
            student_uuid = %student.id,
            student_id = %student.student_id,
            year = student.year,
            "student created"
        );

        let performance_data_id = self
            .store
            .insert_performance(&NewPerformance {
                student_uuid: student.id,
                year: record.year,
                attendance_s1: record.attendance_s1,
                attendance_s2: record.attendance_s2,
                avg_attendance: record.avg_attendance,
                percentage: record.percentage,
                subjects: record.columns(),
            })
            .await
            .inspect_err(|err| tracing::error!(%err, "performance data insert failed"))?;

        let request = PredictRiskRequest {
            performance_data_id,
            student_uuid: student.id,
            percentage: record.percentage,
            avg_attendance: record.avg_attendance,
            subject_scores: Some(record.scores()),
        };
        let prediction = predict::predict_risk(self.store, thresholds, &request)
            .await
            .inspect_err(|err| tracing::error!(%err, "prediction failed"))?;

        Ok(prediction)
    }
}
