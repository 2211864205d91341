//! HTTP API for heart-disease risk scoring.
//!
//! ## Endpoints
//!
//! - `GET /` - Landing page
//! - `GET /predict` - Measurement form
//! - `GET /about` - About page
//! - `GET /result` - Result page (reads the last prediction from session storage)
//! - `GET /health` - Liveness plus whether the model loaded
//! - `POST /predict_disease` - Score a form-encoded patient record
//!
//! Any other path serves the landing page with status 404.

pub mod pages;

use std::sync::Arc;

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::inference::domain::{PatientForm, Prediction, ValidationError};
use crate::inference::service::{ScoreError, ServiceContext};

use pages::Pages;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    ctx: Arc<ServiceContext>,
    pages: Arc<Pages>,
}

impl AppState {
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            pages: Arc::new(Pages::render()),
        }
    }

    pub fn context(&self) -> &ServiceContext {
        &self.ctx
    }
}

/// Error body for every non-2xx JSON response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub ready: bool,
    pub version: String,
}

/// Failure of the prediction endpoint, mapped to a status code.
#[derive(Debug)]
pub enum ApiError {
    /// The body was neither a urlencoded nor a multipart form.
    Body(String),
    Validation(ValidationError),
    Score(ScoreError),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl From<ScoreError> for ApiError {
    fn from(err: ScoreError) -> Self {
        ApiError::Score(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Body(reason) => (
                StatusCode::BAD_REQUEST,
                format!("Could not decode form data: {reason}"),
            ),
            ApiError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::Score(err @ ScoreError::ModelUnavailable) => {
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::Score(ScoreError::Internal(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Prediction error".to_string(),
            ),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Build the router with every page and API route.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/predict", get(predict_page_handler))
        .route("/about", get(about_handler))
        .route("/result", get(result_handler))
        .route("/health", get(health_handler))
        .route("/predict_disease", post(predict_disease_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

async fn index_handler(State(state): State<AppState>) -> Html<String> {
    Html(state.pages.index.clone())
}

async fn predict_page_handler(State(state): State<AppState>) -> Html<String> {
    Html(state.pages.predict.clone())
}

async fn about_handler(State(state): State<AppState>) -> Html<String> {
    Html(state.pages.about.clone())
}

async fn result_handler(State(state): State<AppState>) -> Html<String> {
    Html(state.pages.result.clone())
}

async fn not_found_handler(State(state): State<AppState>) -> (StatusCode, Html<String>) {
    (StatusCode::NOT_FOUND, Html(state.pages.index.clone()))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let ready = state.ctx.is_ready();
    Json(HealthResponse {
        status: if ready { "healthy" } else { "degraded" }.to_string(),
        ready,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Score one patient submitted as a urlencoded or multipart form.
async fn predict_disease_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<Prediction>, ApiError> {
    if let ServiceContext::Degraded { reason } = state.ctx.as_ref() {
        error!(%reason, "prediction requested while model is unavailable");
        return Err(ScoreError::ModelUnavailable.into());
    }

    let form = read_form(request).await.map_err(|err| {
        debug!(error = ?err, "undecodable form body");
        err
    })?;

    let record = form.validate()?;
    let prediction = state.ctx.score(&record)?;
    debug!(
        prediction = prediction.prediction,
        disease = prediction.probability.disease,
        "scored"
    );
    Ok(Json(prediction))
}

/// Decode the body into name/value pairs; the first value of a repeated
/// name wins in either encoding.
async fn read_form(request: Request) -> Result<PatientForm, ApiError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| {
            ct.trim_start()
                .to_ascii_lowercase()
                .starts_with("multipart/form-data")
        });

    if is_multipart {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| ApiError::Body(e.body_text()))?;
        let mut pairs = Vec::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::Body(e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            let value = field.text().await.map_err(|e| ApiError::Body(e.body_text()))?;
            pairs.push((name, value));
        }
        return Ok(PatientForm::from_pairs(pairs));
    }

    let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, &())
        .await
        .map_err(|e| ApiError::Body(e.body_text()))?;
    Ok(PatientForm::from_pairs(pairs))
}

#[cfg(test)]
mod tests;
