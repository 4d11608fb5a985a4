use std::future::Future;

use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{NewPerformance, NewPrediction, NewStudent, Prediction, Student};

/// Record store behind the submission, prediction and settings flows.
pub trait RecordStore: Sync {
    fn insert_student(
        &self,
        student: &NewStudent,
    ) -> impl Future<Output = Result<Student, StoreError>> + Send;

    /// Returns the id of the new performance row.
    fn insert_performance(
        &self,
        record: &NewPerformance,
    ) -> impl Future<Output = Result<Uuid, StoreError>> + Send;

    fn insert_prediction(
        &self,
        prediction: &NewPrediction,
    ) -> impl Future<Output = Result<Prediction, StoreError>> + Send;

    fn fetch_prediction(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<Prediction>, StoreError>> + Send;

    fn get_setting(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<serde_json::Value>, StoreError>> + Send;

    fn put_setting(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
