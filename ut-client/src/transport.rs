//! Moves file bytes to presigned storage URLs.
//!
//! The SDK server never sees the payload: it hands out a [`PresignedUpload`]
//! per file and the client PUTs straight to storage.

use futures::future::join_all;
use reqwest::header::{CONTENT_TYPE, RANGE};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use ut_core::api::VERSION_HEADER;
use ut_core::{log_deprecation_warning, PresignedUpload, UploadError, UtResult, UPLOADTHING_VERSION};

use crate::error::TransportError;
use crate::file::FileEsque;

/// What storage answers after a successful PUT.
///
/// `url` and `app_url` are kept for older callers; reading them logs a
/// deprecation warning every time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPutResult {
    #[serde(skip)]
    key: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    app_url: String,
    #[serde(default)]
    ufs_url: String,
    #[serde(default)]
    file_hash: String,
    #[serde(default)]
    server_data: Option<Value>,
}

impl UploadPutResult {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn url(&self) -> &str {
        log_deprecation_warning(
            "`file.url` is deprecated and will be removed in uploadthing v9. Use `file.ufsUrl` instead.",
        );
        &self.url
    }

    pub fn app_url(&self) -> &str {
        log_deprecation_warning(
            "`file.appUrl` is deprecated and will be removed in uploadthing v9. Use `file.ufsUrl` instead.",
        );
        &self.app_url
    }

    pub fn ufs_url(&self) -> &str {
        &self.ufs_url
    }

    pub fn file_hash(&self) -> &str {
        &self.file_hash
    }

    /// Whatever the route's `onUploadComplete` returned, if storage relayed it.
    pub fn server_data(&self) -> Option<&Value> {
        self.server_data.as_ref()
    }
}

/// PUT one file to its presigned URL.
pub async fn upload_file(
    http: &Client,
    file: &FileEsque,
    presigned: &PresignedUpload,
) -> UtResult<UploadPutResult> {
    let url = presigned.url.as_str();
    let failed = || UploadError::upload_failed(format!("Failed to upload file {}", file.name));

    let response = http
        .put(url)
        .header(RANGE, "bytes=0-")
        .header(VERSION_HEADER, UPLOADTHING_VERSION)
        .header(CONTENT_TYPE, file.mime_type.as_str())
        .body(file.body.clone())
        .send()
        .await
        .map_err(|e| failed().with_source(TransportError::request(url, e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(failed().with_source(TransportError::status(url, status.as_u16(), body)));
    }

    let json: Value = response
        .json()
        .await
        .map_err(|e| failed().with_source(TransportError::decode(url, e)))?;

    tracing::debug!(json = %json, key = %presigned.key, "File {} uploaded successfully", file.name);

    let mut result: UploadPutResult = serde_json::from_value(json)
        .map_err(|e| failed().with_source(e))?;
    result.key = presigned.key.clone();
    Ok(result)
}

/// Upload files concurrently; one result per file, in input order.
///
/// A failing file does not cancel the others. Files without a presigned
/// target fail with `UPLOAD_FAILED`.
pub async fn upload_files(
    http: &Client,
    files: &[FileEsque],
    presigned: &[PresignedUpload],
) -> Vec<UtResult<UploadPutResult>> {
    join_all(files.iter().enumerate().map(|(i, file)| async move {
        match presigned.get(i) {
            Some(target) => upload_file(http, file, target).await,
            None => Err(UploadError::upload_failed(format!(
                "No presigned URL for file {}",
                file.name
            ))),
        }
    }))
    .await
}
