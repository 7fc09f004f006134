use thiserror::Error;

/// Low-level failures of a single HTTP exchange.
///
/// Never shown to end users directly: they travel as the cause of an
/// `UPLOAD_FAILED` (or endpoint) `UploadError`.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl TransportError {
    pub fn request<S: Into<String>>(url: S, source: reqwest::Error) -> Self {
        Self::Request {
            url: url.into(),
            source,
        }
    }

    pub fn status<S: Into<String>>(url: S, status: u16, body: String) -> Self {
        Self::Status {
            url: url.into(),
            status,
            body,
        }
    }

    pub fn decode<S: Into<String>>(url: S, source: reqwest::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }
}
