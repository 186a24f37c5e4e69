use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::Html,
    routing::{get, post},
};
use tokio::task::spawn_blocking;

use crate::error::RecognizeError;
use crate::service::{Recognition, ServiceContext};

/// Multipart field carrying the uploaded image.
pub const IMAGE_FIELD: &str = "imagen";

pub const HEALTH_PAGE: &str = "<h1>✅ Servicio de IA Activo</h1>";

pub fn router(context: Arc<ServiceContext>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/reconocer", post(reconocer))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(context)
}

/// Liveness only, answers even when the model failed to load.
async fn home() -> (StatusCode, Html<&'static str>) {
    (StatusCode::OK, Html(HEALTH_PAGE))
}

async fn reconocer(
    State(context): State<Arc<ServiceContext>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Recognition>, RecognizeError> {
    context.classifier()?;

    let multipart = multipart.map_err(|rejection| {
        tracing::debug!(%rejection, "request is not a multipart form");
        RecognizeError::MissingImage
    })?;
    let image = read_image_field(multipart).await?;

    tracing::info!(bytes = image.len(), "received image");
    let result = spawn_blocking(move || context.recognize(&image))
        .await
        .map_err(|e| RecognizeError::Failed(e.to_string()))?;

    match result {
        Ok(recognition) => Ok(Json(recognition)),
        Err(e) => {
            tracing::error!(error = %e, "prediction failed");
            Err(e)
        }
    }
}

async fn read_image_field(mut multipart: Multipart) -> Result<Bytes, RecognizeError> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(RecognizeError::MissingImage),
            Err(e) => return Err(multipart_error(e)),
        };
        if field.name() == Some(IMAGE_FIELD) {
            return field.bytes().await.map_err(multipart_error);
        }
    }
}

fn multipart_error(error: axum::extract::multipart::MultipartError) -> RecognizeError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        RecognizeError::PayloadTooLarge(error.body_text())
    } else {
        tracing::debug!(error = %error, "unreadable multipart body");
        RecognizeError::MissingImage
    }
}
