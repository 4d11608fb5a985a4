use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{NewPrediction, Prediction};
use crate::risk::{self, RiskLevel, RiskThresholds};
use crate::store::RecordStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRiskRequest {
    pub performance_data_id: Uuid,
    pub student_uuid: Uuid,
    pub percentage: f64,
    pub avg_attendance: f64,
    #[serde(default)]
    pub subject_scores: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictRiskResponse {
    Success {
        success: bool,
        prediction_id: Uuid,
        risk_level: RiskLevel,
        risk_score: f64,
        factors: BTreeMap<String, String>,
    },
    Failure {
        success: bool,
        error: String,
    },
}

impl PredictRiskResponse {
    pub fn from_prediction(prediction: &Prediction) -> Self {
        Self::Success {
            success: true,
            prediction_id: prediction.id,
            risk_level: prediction.risk_level,
            risk_score: prediction.risk_score,
            factors: prediction.factors.clone(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            success: false,
            error: error.into(),
        }
    }
}

/// Classifies an already stored performance record and persists the result
/// as a prediction. Every caller that needs a stored prediction goes through
/// here.
pub async fn predict_risk<S: RecordStore>(
    store: &S,
    thresholds: &RiskThresholds,
    request: &PredictRiskRequest,
) -> Result<Prediction, StoreError> {
    tracing::debug!(
        performance_data_id = %request.performance_data_id,
        percentage = request.percentage,
        avg_attendance = request.avg_attendance,
        "predicting risk"
    );

    let classification = risk::classify_risk(
        request.percentage,
        request.avg_attendance,
        thresholds,
        request.subject_scores.as_deref(),
    );

    let prediction = store
        .insert_prediction(&NewPrediction {
            student_uuid: request.student_uuid,
            performance_data_id: request.performance_data_id,
            risk_level: classification.risk_level,
            risk_score: classification.risk_score,
            percentage: request.percentage,
            avg_attendance: request.avg_attendance,
            factors: classification.factors,
        })
        .await?;

    tracing::info!(
        prediction_id = %prediction.id,
        risk_level = %prediction.risk_level,
        "prediction saved"
    );
    Ok(prediction)
}
