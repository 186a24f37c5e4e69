use std::path::PathBuf;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures while loading the model or running the recognition pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid class index file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid class index for {label:?}: {reason}")]
    ClassIndex { label: String, reason: String },

    #[error("weights file not found: {}", .0.display())]
    WeightsNotFound(PathBuf),

    #[error("weights file {} is not a .mpk record", .0.display())]
    WeightsFormat(PathBuf),

    #[error("incompatible weights: {0}")]
    IncompatibleWeights(String),

    #[error("{0}")]
    Image(#[from] image::ImageError),

    #[error("resize failed: {0}")]
    Resize(#[from] fast_image_resize::ResizeError),

    #[error("{0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("{0}")]
    Ort(#[from] ort::Error),

    #[error("inference failed: {0}")]
    Inference(String),
}

/// The outcome of a rejected `/reconocer` request.
#[derive(Debug, Error)]
pub enum RecognizeError {
    #[error("Modelo no cargado")]
    ModelNotLoaded,

    #[error("Falta imagen")]
    MissingImage,

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    Failed(String),
}

impl RecognizeError {
    pub fn status(&self) -> StatusCode {
        match self {
            RecognizeError::ModelNotLoaded => StatusCode::INTERNAL_SERVER_ERROR,
            RecognizeError::MissingImage => StatusCode::BAD_REQUEST,
            RecognizeError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            RecognizeError::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for RecognizeError {
    fn from(error: Error) -> Self {
        RecognizeError::Failed(error.to_string())
    }
}

impl IntoResponse for RecognizeError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(RecognizeError::ModelNotLoaded.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(RecognizeError::MissingImage.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            RecognizeError::PayloadTooLarge("too big".into()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(RecognizeError::Failed("boom".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn pipeline_errors_keep_their_message() {
        let error: RecognizeError = Error::Inference("empty output".into()).into();
        assert_eq!(error.to_string(), "inference failed: empty output");
    }
}
