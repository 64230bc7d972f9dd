//! Axum REST API handlers

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::error::PipelineError;
use crate::service::{CancelSignal, InferenceRequest, InferenceService};
use crate::storage::{InferenceRecord, ResultStorage};

use super::dto::*;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Application state shared across handlers
pub struct AppState<S: ResultStorage> {
    pub service: Arc<InferenceService<S>>,
    /// Requests still running after this long are cancelled
    pub request_timeout: Duration,
}

/// Create the REST API router
pub fn create_rest_router<S: ResultStorage>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        // Inference
        .route("/api/models/classify", post(classify_handler::<S>))
        .route("/api/models/predict", post(predict_handler::<S>))
        .route("/api/models/detect", post(detect_handler::<S>))
        // Stored results
        .route("/api/results", get(list_results_handler::<S>))
        .route(
            "/api/results/:id",
            get(get_result_handler::<S>).delete(delete_result_handler::<S>),
        )
        // System endpoints
        .route("/health", get(health_handler::<S>))
        // Middleware
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024)) // base64 images are large
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Map a pipeline error onto a status code and error body
fn pipeline_error(e: PipelineError) -> ApiError {
    let status = match &e {
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        PipelineError::Cancelled => StatusCode::REQUEST_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!("Request failed: {}", e);
    } else {
        warn!("Request rejected: {}", e);
    }
    (status, Json(ErrorResponse::new(&e.to_string(), e.code())))
}

fn storage_error(e: anyhow::Error) -> ApiError {
    pipeline_error(PipelineError::storage(e))
}

/// Entry gate shared by the inference endpoints
fn parse_request(payload: Result<Json<InferenceRequestDto>, JsonRejection>) -> Result<InferenceRequest, ApiError> {
    let Json(dto) = payload.map_err(|rejection| {
        warn!("Malformed request body: {}", rejection.body_text());
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(&rejection.body_text(), "INVALID_INPUT")),
        )
    })?;
    dto.into_request().map_err(pipeline_error)
}

/// Classify an image as vehicle / non-vehicle
async fn classify_handler<S: ResultStorage>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<InferenceRequestDto>, JsonRejection>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    let request = parse_request(payload)?;
    let cancel = CancelSignal::new();
    let _timer = cancel.cancel_after(state.request_timeout);

    let result = state.service.classify(request, &cancel).await.map_err(pipeline_error)?;

    Ok(Json(ClassifyResponse {
        record_id: result.record_id,
        predicted_class: result.predicted_class,
        probability_scores: result.probability_scores,
        inference_time_ms: result.inference_time_ms,
    }))
}

/// Run a single model without persisting
async fn predict_handler<S: ResultStorage>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<InferenceRequestDto>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let request = parse_request(payload)?;
    let model_type = request.model_type;
    let cancel = CancelSignal::new();
    let _timer = cancel.cancel_after(state.request_timeout);

    let start = Instant::now();
    let result = state.service.predict(request, &cancel).await.map_err(pipeline_error)?;

    Ok(Json(PredictResponse {
        model_type: model_type.to_string(),
        result,
        inference_time_ms: start.elapsed().as_millis() as u64,
    }))
}

/// Vehicle then license plate detection
async fn detect_handler<S: ResultStorage>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<InferenceRequestDto>, JsonRejection>,
) -> Result<Json<DetectResponse>, ApiError> {
    let request = parse_request(payload)?;
    let cancel = CancelSignal::new();
    let _timer = cancel.cancel_after(state.request_timeout);

    let start = Instant::now();
    let outcome = state.service.detect_cascade(request, &cancel).await.map_err(pipeline_error)?;

    Ok(Json(DetectResponse::from_outcome(
        outcome,
        start.elapsed().as_millis() as u64,
    )))
}

/// List stored results
async fn list_results_handler<S: ResultStorage>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<InferenceRecord>>, ApiError> {
    let records = state.service.storage().get_all().await.map_err(storage_error)?;
    Ok(Json(records))
}

/// Get one stored result
async fn get_result_handler<S: ResultStorage>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<InferenceRecord>, ApiError> {
    state
        .service
        .storage()
        .get_by_id(&id)
        .await
        .map_err(storage_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, Json(ErrorResponse::new("Result not found", "NOT_FOUND"))))
}

/// Delete a stored result
async fn delete_result_handler<S: ResultStorage>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = state.service.storage().delete(&id).await.map_err(storage_error)?;

    if deleted {
        Ok(Json(DeleteResponse {
            success: true,
            message: "Result deleted successfully".to_string(),
        }))
    } else {
        Err((StatusCode::NOT_FOUND, Json(ErrorResponse::new("Result not found", "NOT_FOUND"))))
    }
}

/// Health check
async fn health_handler<S: ResultStorage>(State(state): State<Arc<AppState<S>>>) -> Json<HealthResponse> {
    let health = state.service.health();

    Json(HealthResponse {
        healthy: health.healthy,
        version: health.version,
        models_loaded: health.models_loaded,
    })
}
