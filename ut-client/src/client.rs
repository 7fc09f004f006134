use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use ut_core::{ErrorCode, FileUploadData, PresignedUpload, UploadError, UtResult};

use crate::error::TransportError;
use crate::file::FileEsque;
use crate::transport::{upload_files, UploadPutResult};

#[derive(Debug, Deserialize)]
struct DataBody<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorPayload,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    code: String,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// Drives a whole upload against an SDK endpoint
/// (e.g. `https://my.app/api/uploadthing`).
#[derive(Clone, Debug)]
pub struct UtClient {
    http: Client,
    endpoint: String,
}

impl UtClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn with_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post_action(&self, action: &str, slug: &str, body: Value) -> UtResult<Value> {
        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("actionType", action), ("slug", slug)])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                UploadError::url_generation_failed("Failed to reach the upload endpoint")
                    .with_source(TransportError::request(&self.endpoint, e))
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            UploadError::url_generation_failed("Failed to read the upload endpoint response")
                .with_source(TransportError::decode(&self.endpoint, e))
        })?;

        if !status.is_success() {
            // Keep the server's code so callers can branch on it
            let err = match serde_json::from_str::<ErrorBody>(&text) {
                Ok(ErrorBody { error }) => {
                    let code = ErrorCode::parse(&error.code)
                        .unwrap_or_else(|| ErrorCode::from_status(status.as_u16()));
                    let err = UploadError::new(code, error.message);
                    match error.data {
                        Some(data) => err.with_data(data),
                        None => err,
                    }
                }
                Err(_) => UploadError::new(
                    ErrorCode::from_status(status.as_u16()),
                    format!("Upload endpoint responded with {status}"),
                ),
            };
            return Err(err.with_source(TransportError::status(&self.endpoint, status.as_u16(), text)));
        }

        let DataBody { data } = serde_json::from_str::<DataBody<Value>>(&text).map_err(|e| {
            UploadError::url_generation_failed("Invalid response from the upload endpoint")
                .with_source(e)
        })?;
        Ok(data)
    }

    /// Ask the endpoint for one presigned target per file.
    pub async fn request_presigned(
        &self,
        slug: &str,
        files: &[FileUploadData],
        input: Value,
    ) -> UtResult<Vec<PresignedUpload>> {
        let data = self
            .post_action("upload", slug, json!({ "files": files, "input": input }))
            .await?;
        serde_json::from_value(data).map_err(|e| {
            UploadError::url_generation_failed("Invalid presigned upload list").with_source(e)
        })
    }

    /// Tell the endpoint a file will never arrive.
    pub async fn report_failure(&self, slug: &str, file_key: &str) -> UtResult<()> {
        self.post_action("failure", slug, json!({ "fileKey": file_key }))
            .await?;
        Ok(())
    }

    /// Request targets, upload every file concurrently and report the ones
    /// that failed. Returns the first failure after all reports were sent.
    pub async fn upload(
        &self,
        slug: &str,
        files: &[FileEsque],
        input: Value,
    ) -> UtResult<Vec<UploadPutResult>> {
        let descriptors: Vec<FileUploadData> = files.iter().map(FileEsque::descriptor).collect();
        let presigned = self.request_presigned(slug, &descriptors, input).await?;

        if presigned.len() != files.len() {
            return Err(UploadError::upload_failed(format!(
                "Expected {} presigned urls, got {}",
                files.len(),
                presigned.len()
            )));
        }

        let results = upload_files(&self.http, files, &presigned).await;

        let mut uploaded = Vec::with_capacity(results.len());
        let mut first_error = None;
        for (result, target) in results.into_iter().zip(&presigned) {
            match result {
                Ok(put) => uploaded.push(put),
                Err(err) => {
                    ut_core::log_upload_error("Upload failed", &err);
                    if let Err(report) = self.report_failure(slug, &target.key).await {
                        ut_core::log_upload_error("Failed to report upload failure", &report);
                    }
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(uploaded),
        }
    }
}
