//! # Errors
//!
//! UploadThing uses a small, stable set of error codes that clients can
//! branch on. Core goals:
//! - every code maps to one HTTP status
//! - an `UploadError` can be carried through `anyhow::Error` (user callbacks
//!   return `anyhow::Result`)
//! - the cause chain stays on the server; only `code`, `message` and the
//!   formatter's `data` are serialized

use std::fmt;

use anyhow::Error as AnyError;
use serde_json::{json, Value};

/// A convenience result type for ut-core APIs.
pub type UtResult<T> = std::result::Result<T, UploadError>;

/// Stable error codes + their HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    BadRequest,          // 400
    NotFound,            // 404
    Forbidden,           // 403
    FileLimitExceeded,   // 400
    ConfigError,         // 500
    MissingEnv,          // 500
    UploadFailed,        // 500
    UrlGenerationFailed, // 500
    InternalServerError, // 500
}

impl ErrorCode {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorCode::BadRequest => 400,
            ErrorCode::NotFound => 404,
            ErrorCode::Forbidden => 403,
            ErrorCode::FileLimitExceeded => 400,
            ErrorCode::ConfigError => 500,
            ErrorCode::MissingEnv => 500,
            ErrorCode::UploadFailed => 500,
            ErrorCode::UrlGenerationFailed => 500,
            ErrorCode::InternalServerError => 500,
        }
    }

    /// Wire name (e.g. "BAD_REQUEST").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::FileLimitExceeded => "FILE_LIMIT_EXCEEDED",
            ErrorCode::ConfigError => "CONFIG_ERROR",
            ErrorCode::MissingEnv => "MISSING_ENV",
            ErrorCode::UploadFailed => "UPLOAD_FAILED",
            ErrorCode::UrlGenerationFailed => "URL_GENERATION_FAILED",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Parse a wire name back into a code.
    pub fn parse(s: &str) -> Option<Self> {
        let code = match s {
            "BAD_REQUEST" => ErrorCode::BadRequest,
            "NOT_FOUND" => ErrorCode::NotFound,
            "FORBIDDEN" => ErrorCode::Forbidden,
            "FILE_LIMIT_EXCEEDED" => ErrorCode::FileLimitExceeded,
            "CONFIG_ERROR" => ErrorCode::ConfigError,
            "MISSING_ENV" => ErrorCode::MissingEnv,
            "UPLOAD_FAILED" => ErrorCode::UploadFailed,
            "URL_GENERATION_FAILED" => ErrorCode::UrlGenerationFailed,
            "INTERNAL_SERVER_ERROR" => ErrorCode::InternalServerError,
            _ => return None,
        };
        Some(code)
    }

    /// Classify a failed response from the UploadThing API by its status.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorCode::BadRequest,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            413 => ErrorCode::FileLimitExceeded,
            _ => ErrorCode::UrlGenerationFailed,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured upload error that can live inside `anyhow::Error`.
#[derive(Debug)]
pub struct UploadError {
    pub code: ErrorCode,
    pub message: String,
    pub data: Option<Value>,
    pub source: Option<AnyError>,
}

impl UploadError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
            source: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_source(mut self, source: impl Into<AnyError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn status_code(&self) -> u16 {
        self.code.status_code()
    }

    /// Convert into `anyhow::Error` so it can be returned from user callbacks.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Find an `UploadError` anywhere in an `anyhow::Error` chain.
    pub fn from_anyhow(err: &AnyError) -> Option<&UploadError> {
        err.chain().find_map(|e| e.downcast_ref::<UploadError>())
    }

    /// Turn any error into an UploadError:
    /// - if it's already an UploadError, keep it (lossless)
    /// - otherwise wrap it with `fallback` as the code
    pub fn normalize(err: AnyError, fallback: ErrorCode, message: &str) -> UploadError {
        match err.downcast::<UploadError>() {
            Ok(ut) => ut,
            Err(other) => UploadError::new(fallback, message).with_source(other),
        }
    }

    /// A copy suitable for untrusted clients: the `source` chain is dropped.
    pub fn sanitize_for_client(&self) -> UploadError {
        UploadError {
            code: self.code,
            message: self.message.clone(),
            data: self.data.clone(),
            source: None,
        }
    }

    /// `{ "code", "message", "data"? }`
    pub fn to_json(&self) -> Value {
        let mut base = json!({
            "code": self.code.as_str(),
            "message": self.message,
        });
        if let Some(d) = &self.data {
            base["data"] = d.clone();
        }
        base
    }

    // ---- Constructors ----

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, msg)
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, msg)
    }
    pub fn file_limit_exceeded(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::FileLimitExceeded, msg)
    }
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, msg)
    }
    pub fn missing_env(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::MissingEnv, msg)
    }
    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UploadFailed, msg)
    }
    pub fn url_generation_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UrlGenerationFailed, msg)
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalServerError, msg)
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.status_code(), self.message)
    }
}

impl std::error::Error for UploadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| &**e as &(dyn std::error::Error + 'static))
    }
}

/// Convenience helper for "bail with UploadError" inside `anyhow` callbacks.
#[macro_export]
macro_rules! bail_ut {
    ($ctor:ident, $msg:expr) => {
        return Err($crate::errors::UploadError::$ctor($msg).into_anyhow());
    };
    ($ctor:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::UploadError::$ctor(format!($fmt, $($arg)*)).into_anyhow());
    };
}
