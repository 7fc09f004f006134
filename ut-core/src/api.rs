//! Client for the hosted UploadThing API.
//!
//! The dispatch protocol only talks to [`UploadApi`]; [`HttpUploadApi`] is
//! the production implementation over `reqwest`.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::UtConfigSnapshot;
use crate::errors::{ErrorCode, UploadError, UtResult};
use crate::file::{FileUploadData, PresignedUpload};
use crate::UPLOADTHING_VERSION;

pub const API_KEY_HEADER: &str = "x-uploadthing-api-key";
pub const VERSION_HEADER: &str = "x-uploadthing-version";
pub const BE_ADAPTER_HEADER: &str = "x-uploadthing-be-adapter";

/// Body of `POST /v6/prepareUpload`.
///
/// `metadata` is stored by UploadThing and sent back in the completion
/// webhook; nothing is kept in this process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareUploadRequest {
    pub files: Vec<FileUploadData>,
    pub route_config: Value,
    pub metadata: Value,
    pub callback_url: String,
    pub callback_slug: String,
}

#[async_trait]
pub trait UploadApi: Send + Sync {
    /// Ask for one presigned target per file.
    async fn prepare_upload(&self, request: PrepareUploadRequest) -> UtResult<Vec<PresignedUpload>>;

    /// Tell UploadThing a client gave up on `file_key`.
    async fn report_failure(&self, file_key: &str) -> UtResult<()>;
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// HTTP client for the UploadThing API.
#[derive(Clone, Debug)]
pub struct HttpUploadApi {
    client: Client,
    base_url: String,
    api_key: String,
    adapter: String,
}

impl HttpUploadApi {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, adapter: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            adapter: adapter.into(),
        }
    }

    /// Fails with `MISSING_ENV` when no secret is configured.
    pub fn from_config(config: &UtConfigSnapshot, adapter: &str) -> UtResult<Self> {
        let secret = config.secret().ok_or_else(|| {
            UploadError::missing_env("Missing UPLOADTHING_SECRET; set it in the environment or config")
        })?;
        Ok(Self::new(secret, config.api_url(), adapter))
    }

    /// Use a preconfigured client (timeouts, proxies, ...).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body`; non-2xx answers become classified errors.
    async fn send<B>(&self, path: &str, body: &B) -> UtResult<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(VERSION_HEADER, UPLOADTHING_VERSION)
            .header(BE_ADAPTER_HEADER, &self.adapter)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                UploadError::url_generation_failed("Failed to reach UploadThing").with_source(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .ok()
                .and_then(|b| b.error.or(b.message))
                .unwrap_or_else(|| format!("UploadThing responded with {status}"));
            return Err(UploadError::new(ErrorCode::from_status(status.as_u16()), message)
                .with_source(anyhow::anyhow!("{path} failed with status {status}: {text}")));
        }

        Ok(response)
    }

    async fn post_json<T, B>(&self, path: &str, body: &B) -> UtResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(path, body).await?.json::<T>().await.map_err(|e| {
            UploadError::url_generation_failed("Invalid response from UploadThing").with_source(e)
        })
    }
}

#[async_trait]
impl UploadApi for HttpUploadApi {
    async fn prepare_upload(&self, request: PrepareUploadRequest) -> UtResult<Vec<PresignedUpload>> {
        self.post_json("/v6/prepareUpload", &request).await
    }

    async fn report_failure(&self, file_key: &str) -> UtResult<()> {
        self.send("/v6/failureCallback", &serde_json::json!({ "fileKey": file_key }))
            .await?;
        Ok(())
    }
}
