//! HTTP request handlers
//!
//! Axum handlers for the prediction service.

use crate::error::Error;
use crate::percentile::Colour;
use crate::server::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Banner served at `/`
pub const BANNER: &str = "ecolabel prediction service";

/// Error body returned by every failing endpoint
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{}", self.message);
        } else {
            tracing::debug!("Rejected request: {}", self.message);
        }
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

/// `datasetSize` as submitted: the browser extension sends the raw input string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DatasetSize {
    Number(f64),
    Text(String),
}

impl DatasetSize {
    pub fn value(&self) -> Result<f64, ApiError> {
        let value = match self {
            DatasetSize::Number(n) => *n,
            DatasetSize::Text(s) => s.trim().parse::<f64>().map_err(|_| {
                ApiError::bad_request(format!("datasetSize '{}' is not a number", s))
            })?,
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ApiError::bad_request("datasetSize must be finite"))
        }
    }
}

/// Prediction request
#[derive(Debug, Clone, Deserialize)]
pub struct PredictRequest {
    #[serde(rename = "datasetSize")]
    pub dataset_size: DatasetSize,
    pub domain: String,
}

/// Prediction response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Single-element list, kept for compatibility with existing clients
    pub prediction: Vec<f64>,
    pub colour_prediction: Colour,
}

/// Proxy request
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyRequest {
    pub url: String,
}

/// Proxy response; fetch failures are reported in-band
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProxyResponse {
    Content { content: String },
    Error { error: String },
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Number of values in the reference distribution
    pub reference_size: usize,
    /// Model feature names in coefficient order
    pub features: Vec<String>,
}

pub async fn index() -> &'static str {
    BANNER
}

/// Health check handler
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        reference_size: state.context.reference().len(),
        features: state.context.model().bundle().feature_names.clone(),
    })
}

/// Predict emissions for an auto-instrumented run
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(request) = payload?;
    let dataset_size = request.dataset_size.value()?;

    let prediction = state.context.predict(dataset_size, &request.domain)?;

    Ok(Json(PredictResponse {
        prediction: vec![prediction.value],
        colour_prediction: prediction.colour,
    }))
}

/// Empty answer for bare `OPTIONS /predict` (CORS headers come from the layer)
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Fetch a URL server-side and return its body
pub async fn proxy(
    State(state): State<AppState>,
    payload: Result<Json<ProxyRequest>, JsonRejection>,
) -> Result<Json<ProxyResponse>, ApiError> {
    let Json(request) = payload?;
    tracing::debug!("Proxying {}", request.url);

    let fetched = match state.http.get(&request.url).send().await {
        Ok(response) => response.text().await,
        Err(e) => Err(e),
    };

    Ok(Json(match fetched {
        Ok(content) => ProxyResponse::Content { content },
        Err(e) => {
            tracing::warn!("Proxy fetch of {} failed: {}", request.url, e);
            ProxyResponse::Error {
                error: e.to_string(),
            }
        }
    }))
}
