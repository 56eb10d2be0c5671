//! Axum REST API handlers

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Instant;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        DefaultBodyLimit, State,
        rejection::{BytesRejection, FailedToBufferBody},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use facecrop_core::{CropError, FaceCropper};
use facecrop_utils::sniff_mime;
use log::{debug, error, warn};

use super::dto::{ErrorResponse, HealthResponse};

/// MIME types `/facecrop` accepts, sniffed from the body's magic bytes.
pub const ACCEPTED_TYPES: [&str; 2] = ["image/png", "image/jpeg"];

/// Non-standard "client closed request".
const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Application state shared across handlers
pub struct AppState {
    pub cropper: Arc<FaceCropper>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(cropper: Arc<FaceCropper>) -> Self {
        Self {
            cropper,
            start_time: Instant::now(),
        }
    }
}

/// Create the REST API router
pub fn create_router(state: Arc<AppState>, body_limit: usize) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/facecrop", post(facecrop_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// A JSON error with its status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, code: &str) -> Self {
        Self {
            status,
            body: ErrorResponse::new(message, code),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.body.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<&CropError> for ApiError {
    fn from(err: &CropError) -> Self {
        let (status, code) = match err {
            CropError::EmptyInput | CropError::Decode(_) | CropError::ZeroDimensions { .. } => {
                (StatusCode::BAD_REQUEST, "INVALID_IMAGE")
            }
            CropError::NoFaceFound => (StatusCode::UNPROCESSABLE_ENTITY, "NO_FACE_FOUND"),
            CropError::NoFaceAfterAlignment => {
                (StatusCode::UNPROCESSABLE_ENTITY, "NO_FACE_AFTER_ALIGNMENT")
            }
            CropError::InvalidCropRect { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_CROP"),
            CropError::Cancelled => (
                StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                "CANCELLED",
            ),
            CropError::ModelPathRequired
            | CropError::ModelLoadFailed { .. }
            | CropError::InvalidOptions(_)
            | CropError::Detection(_)
            | CropError::Codec(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PROCESSING_FAILED"),
        };
        Self::new(status, err.to_string(), code)
    }
}

fn body_error(rejection: BytesRejection) -> ApiError {
    match rejection {
        BytesRejection::FailedToBufferBody(FailedToBufferBody::LengthLimitError(err)) => {
            ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, err.body_text(), "PAYLOAD_TOO_LARGE")
        }
        BytesRejection::FailedToBufferBody(FailedToBufferBody::UnknownBodyError(err)) => {
            debug!("request body ended early: {}", err.body_text());
            ApiError::new(
                StatusCode::BAD_REQUEST,
                "request body is incomplete",
                "INCOMPLETE_BODY",
            )
        }
        // Both rejection enums are non-exhaustive; axum classifies every
        // buffering failure above today.
        other => {
            warn!("failed to read request body: {}", other.body_text());
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to read request body",
                "BODY_READ_FAILED",
            )
        }
    }
}

/// Sets the flag when the handler future is dropped, e.g. because the client
/// went away before the crop was scheduled.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

async fn root_handler() -> Json<&'static str> {
    Json("OK")
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        detector: state.cropper.detector_kind().to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// `POST /facecrop`: raw PNG or JPEG body in, JPEG crop out.
async fn facecrop_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let content = body.map_err(body_error)?;
    if content.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "request body is empty",
            "EMPTY_BODY",
        ));
    }

    let mime = sniff_mime(&content);
    if !ACCEPTED_TYPES.contains(&mime) {
        return Err(ApiError::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            format!("unsupported content type {mime}"),
            "UNSUPPORTED_MEDIA_TYPE",
        ));
    }

    let cancelled = Arc::new(AtomicBool::new(false));
    let _guard = CancelOnDrop(cancelled.clone());
    let cropper = state.cropper.clone();
    let started = Instant::now();
    let result =
        tokio::task::spawn_blocking(move || cropper.process_cancellable(&content, &cancelled))
            .await
            .map_err(|err| {
                error!("crop task failed: {err}");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "error processing image",
                    "PROCESSING_FAILED",
                )
            })?;

    match result {
        Ok(jpeg) => {
            debug!(
                "cropped {mime} into {} byte JPEG in {:.2?}",
                jpeg.len(),
                started.elapsed()
            );
            let content_type = sniff_mime(&jpeg);
            Ok(([(header::CONTENT_TYPE, content_type)], jpeg).into_response())
        }
        Err(err) => {
            let api_error = ApiError::from(&err);
            if api_error.status().is_server_error() {
                error!("processing image: {err}");
            } else {
                debug!("rejected image: {err}");
            }
            Err(api_error)
        }
    }
}
