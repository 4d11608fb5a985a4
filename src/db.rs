use std::collections::BTreeMap;

use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{NewPerformance, NewPrediction, NewStudent, Prediction, Student};
use crate::store::RecordStore;

pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn prediction_from_row(row: &PgRow) -> Result<Prediction, StoreError> {
    let risk_level: String = row.try_get("risk_level")?;
    let factors: Json<BTreeMap<String, String>> = row.try_get("factors")?;

    Ok(Prediction {
        id: row.try_get("id")?,
        student_uuid: row.try_get("student_uuid")?,
        performance_data_id: row.try_get("performance_data_id")?,
        risk_level: risk_level.parse().map_err(StoreError::Malformed)?,
        risk_score: row.try_get("risk_score")?,
        percentage: row.try_get("percentage")?,
        avg_attendance: row.try_get("avg_attendance")?,
        factors: factors.0,
        created_at: row.try_get("created_at")?,
    })
}

const PREDICTION_COLUMNS: &str = "id, student_uuid, performance_data_id, risk_level, risk_score, \
     percentage, avg_attendance, factors, created_at";

impl RecordStore for PgStore {
    async fn insert_student(&self, student: &NewStudent) -> Result<Student, StoreError> {
        let id: Uuid = sqlx::query(
            r#"
            INSERT INTO academic_risk.students (id, student_id, year)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&student.student_id)
        .bind(student.year as i32)
        .fetch_one(&self.pool)
        .await?
        .try_get("id")?;

        Ok(Student {
            id,
            student_id: student.student_id.clone(),
            year: student.year,
        })
    }

    async fn insert_performance(&self, record: &NewPerformance) -> Result<Uuid, StoreError> {
        let mut columns = vec![
            "id".to_string(),
            "student_uuid".to_string(),
            "year".to_string(),
            "attendance_s1".to_string(),
            "attendance_s2".to_string(),
            "avg_attendance".to_string(),
            "percentage".to_string(),
        ];
        // Column names come from the subject catalog, never from user input.
        for subject in &record.subjects {
            columns.push(subject.score_column.clone());
            columns.push(subject.credit_column.clone());
        }
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
        let sql = format!(
            "INSERT INTO academic_risk.performance_data ({}) VALUES ({}) RETURNING id",
            columns.join(", "),
            placeholders.join(", ")
        );

        let mut query = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(record.student_uuid)
            .bind(record.year as i32)
            .bind(record.attendance_s1)
            .bind(record.attendance_s2)
            .bind(record.avg_attendance)
            .bind(record.percentage);
        for subject in &record.subjects {
            query = query.bind(subject.score).bind(subject.credit as i32);
        }

        let id: Uuid = query.fetch_one(&self.pool).await?.try_get("id")?;
        Ok(id)
    }

    async fn insert_prediction(&self, prediction: &NewPrediction) -> Result<Prediction, StoreError> {
        let sql = format!(
            "INSERT INTO academic_risk.predictions \
             (id, student_uuid, performance_data_id, risk_level, risk_score, percentage, avg_attendance, factors) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {PREDICTION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(prediction.student_uuid)
            .bind(prediction.performance_data_id)
            .bind(prediction.risk_level.label())
            .bind(prediction.risk_score)
            .bind(prediction.percentage)
            .bind(prediction.avg_attendance)
            .bind(Json(&prediction.factors))
            .fetch_one(&self.pool)
            .await?;

        prediction_from_row(&row)
    }

    async fn fetch_prediction(&self, id: Uuid) -> Result<Option<Prediction>, StoreError> {
        let sql = format!("SELECT {PREDICTION_COLUMNS} FROM academic_risk.predictions WHERE id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;

        row.as_ref().map(prediction_from_row).transpose()
    }

    async fn get_setting(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        let row = sqlx::query("SELECT value FROM academic_risk.settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    async fn put_setting(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO academic_risk.settings (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value, updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
