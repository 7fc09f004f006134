use axum::{
    response::{IntoResponse, Response},
    Json,
};
use ut_core::{UploadError, UtResponse};

/// Axum view of a dispatch answer.
#[derive(Debug)]
pub struct UtAxumResponse(pub UtResponse);

impl From<UtResponse> for UtAxumResponse {
    fn from(res: UtResponse) -> Self {
        Self(res)
    }
}

impl IntoResponse for UtAxumResponse {
    fn into_response(self) -> Response {
        let UtResponse {
            status,
            headers,
            body,
        } = self.0;
        (status, headers, Json(body)).into_response()
    }
}

/// Lets app handlers next to the upload routes return `UploadError`s
/// with the same `{ error: { code, message } }` shape.
#[derive(Debug)]
pub struct UtAxumError(pub anyhow::Error);

impl From<anyhow::Error> for UtAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<UploadError> for UtAxumError {
    fn from(e: UploadError) -> Self {
        Self(e.into_anyhow())
    }
}

impl IntoResponse for UtAxumError {
    fn into_response(self) -> Response {
        // Keep code and status when an UploadError sits anywhere in the chain
        if let Some(ut) = UploadError::from_anyhow(&self.0) {
            return UtAxumResponse(UtResponse::error(ut)).into_response();
        }

        let err = UploadError::internal("Internal server error").with_source(self.0);
        ut_core::log_upload_error("Unhandled error", &err);
        UtAxumResponse(UtResponse::error(&err)).into_response()
    }
}
