use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::risk::RiskLevel;

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub student_id: String,
    pub year: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Student {
    pub id: Uuid,
    pub student_id: String,
    pub year: u32,
}

/// One subject's score and credit, stored under `{key}_y{year}_score` and
/// `{key}_y{year}_credit`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectColumn {
    pub score_column: String,
    pub credit_column: String,
    pub score: f64,
    pub credit: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPerformance {
    pub student_uuid: Uuid,
    pub year: u32,
    pub attendance_s1: f64,
    pub attendance_s2: f64,
    pub avg_attendance: f64,
    pub percentage: f64,
    pub subjects: Vec<SubjectColumn>,
}

#[derive(Debug, Clone)]
pub struct NewPrediction {
    pub student_uuid: Uuid,
    pub performance_data_id: Uuid,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub percentage: f64,
    pub avg_attendance: f64,
    pub factors: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub id: Uuid,
    pub student_uuid: Uuid,
    pub performance_data_id: Uuid,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub percentage: f64,
    pub avg_attendance: f64,
    pub factors: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}
