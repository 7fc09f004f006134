use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use serde_json::{json, Value};

use crate::api::VERSION_HEADER;
use crate::errors::UploadError;
use crate::UPLOADTHING_VERSION;

/// The framework-neutral answer of the dispatch protocol.
///
/// Adapters turn this into their native response type.
#[derive(Debug, Clone)]
pub struct UtResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl UtResponse {
    fn new(status: StatusCode, body: Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static(VERSION_HEADER),
            HeaderValue::from_static(UPLOADTHING_VERSION),
        );
        Self {
            status,
            headers,
            body,
        }
    }

    /// `200 { "data": ... }`
    pub fn data(data: Value) -> Self {
        Self::new(StatusCode::OK, json!({ "data": data }))
    }

    /// `<status> { "error": { code, message, data? } }` without the cause.
    pub fn error(err: &UploadError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, json!({ "error": err.sanitize_for_client().to_json() }))
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn body_bytes(&self) -> Bytes {
        Bytes::from(self.body.to_string())
    }

    pub fn into_http(self) -> http::Response<Bytes> {
        let body = self.body_bytes();
        let mut res = http::Response::new(body);
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}
