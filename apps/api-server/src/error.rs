use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use image_source::{AcquireError, GENERIC_IMAGE_ERROR};
use serde_json::json;

pub const NO_IMAGE_MESSAGE: &str =
    "Please upload an image, enter an image URL or pick a sample image.";
pub const CAPTION_FAILED_MESSAGE: &str = "Failed to generate a caption, please try again later.";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("no image source provided")]
    NoImage,
    #[error("invalid form: {0}")]
    Form(#[from] MultipartError),
    #[error(transparent)]
    Acquire(#[from] AcquireError),
    #[error("failed to generate caption: {0:#}")]
    Caption(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NoImage => StatusCode::BAD_REQUEST,
            ApiError::Form(e) => e.status(),
            ApiError::Acquire(_) => StatusCode::BAD_REQUEST,
            ApiError::Caption(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to users; the precise cause only goes to the logs.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::NoImage => NO_IMAGE_MESSAGE.to_string(),
            ApiError::Form(_) => GENERIC_IMAGE_ERROR.to_string(),
            ApiError::Acquire(e) => e.user_message().to_string(),
            ApiError::Caption(_) => CAPTION_FAILED_MESSAGE.to_string(),
        }
    }

    pub(crate) fn log(&self) {
        if self.status().is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        (self.status(), Json(json!({ "error": self.user_message() }))).into_response()
    }
}
