//! HTTP surface: the risk prediction function and prediction lookup.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::predict::{self, PredictRiskRequest, PredictRiskResponse};
use crate::settings;
use crate::store::RecordStore;

pub struct AppState<S> {
    pub store: Arc<S>,
}

impl<S> AppState<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

pub fn router<S>(state: AppState<S>) -> Router
where
    S: RecordStore + Send + Sync + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/functions/v1/predict-risk", post(predict_risk::<S>))
        .route("/predictions/:id", get(fetch_prediction::<S>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve<S>(state: AppState<S>, addr: std::net::SocketAddr) -> anyhow::Result<()>
where
    S: RecordStore + Send + Sync + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

async fn predict_risk<S>(
    State(state): State<AppState<S>>,
    payload: Result<Json<PredictRiskRequest>, JsonRejection>,
) -> (StatusCode, Json<PredictRiskResponse>)
where
    S: RecordStore + Send + Sync + 'static,
{
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "rejected predict-risk request");
            return (
                StatusCode::BAD_REQUEST,
                Json(PredictRiskResponse::failure(rejection.body_text())),
            );
        }
    };

    let store = state.store.as_ref();
    let thresholds = match settings::load_thresholds(store).await {
        Ok(thresholds) => thresholds,
        Err(err) => {
            tracing::error!(%err, "failed to load risk thresholds");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(PredictRiskResponse::failure(err.to_string())),
            );
        }
    };

    match predict::predict_risk(store, &thresholds, &request).await {
        Ok(prediction) => (
            StatusCode::OK,
            Json(PredictRiskResponse::from_prediction(&prediction)),
        ),
        Err(err) => {
            tracing::error!(%err, "error in predict-risk");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(PredictRiskResponse::failure(err.to_string())),
            )
        }
    }
}

async fn fetch_prediction<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<serde_json::Value>)
where
    S: RecordStore + Send + Sync + 'static,
{
    match state.store.fetch_prediction(id).await {
        Ok(Some(prediction)) => (StatusCode::OK, Json(json!(prediction))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Prediction not found" })),
        ),
        Err(err) => {
            tracing::error!(%err, %id, "failed to load prediction");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
        }
    }
}
