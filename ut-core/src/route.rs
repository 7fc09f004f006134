//! A finalized file route and the callback types it runs.
//!
//! Callbacks are stored as `Arc<dyn Fn .. -> BoxFuture>` so a route can be
//! shared by every request without locking.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use http::{HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::errors::UploadError;
use crate::file::{ExpandedRouteConfig, FileUploadData, UploadedFileData};
use crate::validation::InputParser;

/// The parts of the incoming request middleware may inspect.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl RequestInfo {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Everything a route's middleware receives.
///
/// `adapter` carries framework-specific values (the raw event, extensions,
/// ...) and is never looked at by the dispatch protocol.
#[derive(Debug, Clone)]
pub struct MiddlewareArgs<A> {
    pub req: RequestInfo,
    pub files: Vec<FileUploadData>,
    pub input: Value,
    pub adapter: A,
}

impl<A> MiddlewareArgs<A> {
    /// Deserialize the (already validated) input.
    pub fn input_as<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        Ok(serde_json::from_value(self.input.clone())?)
    }
}

/// What middleware hands over to the completion callback.
///
/// The value travels to UploadThing with the prepare call and comes back in
/// the webhook, so it must be plain JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    value: Value,
    custom_ids: BTreeMap<usize, String>,
}

impl Metadata {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            custom_ids: BTreeMap::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new(json!({}))
    }

    /// Override the `customId` of the file at `index` in the request.
    pub fn with_custom_id(mut self, index: usize, custom_id: impl Into<String>) -> Self {
        self.custom_ids.insert(index, custom_id.into());
        self
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn apply_custom_ids(&self, files: &mut [FileUploadData]) {
        for (idx, id) in &self.custom_ids {
            if let Some(file) = files.get_mut(*idx) {
                file.custom_id = Some(id.clone());
            }
        }
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Value> for Metadata {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl From<()> for Metadata {
    fn from(_: ()) -> Self {
        Self::empty()
    }
}

/// Arguments of the upload-complete callback.
#[derive(Debug, Clone)]
pub struct UploadCompleteArgs {
    pub metadata: Value,
    pub file: UploadedFileData,
}

impl UploadCompleteArgs {
    pub fn metadata_as<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        Ok(serde_json::from_value(self.metadata.clone())?)
    }
}

/// Arguments of the router-level upload-error hook.
#[derive(Debug, Clone)]
pub struct UploadErrorArgs {
    pub slug: String,
    pub file_key: String,
}

pub type MiddlewareFn<A> =
    Arc<dyn Fn(MiddlewareArgs<A>) -> BoxFuture<'static, anyhow::Result<Metadata>> + Send + Sync>;

pub type UploadCompleteFn = Arc<
    dyn Fn(UploadCompleteArgs) -> BoxFuture<'static, anyhow::Result<Option<Value>>> + Send + Sync,
>;

pub type UploadErrorFn =
    Arc<dyn Fn(UploadErrorArgs) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Shapes the `data` of error bodies for one builder's routes.
pub type ErrorFormatter = Arc<dyn Fn(&UploadError) -> Option<Value> + Send + Sync>;

pub(crate) fn noop_middleware<A: Send + 'static>() -> MiddlewareFn<A> {
    Arc::new(|_args| Box::pin(async { Ok(Metadata::empty()) }))
}

/// A route as stored in a [`crate::FileRouter`].
pub struct FileRoute<A> {
    pub(crate) config: ExpandedRouteConfig,
    pub(crate) input: Option<InputParser>,
    pub(crate) middleware: MiddlewareFn<A>,
    pub(crate) on_upload_complete: UploadCompleteFn,
    pub(crate) error_formatter: Option<ErrorFormatter>,
}

impl<A> FileRoute<A> {
    pub fn config(&self) -> &ExpandedRouteConfig {
        &self.config
    }

    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    /// Apply this route's formatter (if any) to an error.
    pub(crate) fn format_error(&self, err: UploadError) -> UploadError {
        match &self.error_formatter {
            Some(f) => match f(&err) {
                Some(data) => err.with_data(data),
                None => err,
            },
            None => err,
        }
    }
}

impl<A> std::fmt::Debug for FileRoute<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRoute")
            .field("config", &self.config)
            .field("has_input", &self.input.is_some())
            .finish_non_exhaustive()
    }
}
