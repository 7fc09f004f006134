//! # Request dispatch protocol
//!
//! One HTTP call moves through:
//!
//! ```text
//! ParseAction ─┬─ GET ───────────────────────────────────────────► RespondJSON (route metadata)
//!              ├─ upload ──► ResolveRoute ─► RunMiddleware ─► RequestPresignedUpload ─► RespondJSON
//!              ├─ failure ─► ResolveRoute ─► report + onUploadError ─► RespondJSON
//!              └─ callback ► verify signature ─► ResolveRoute ─► UploadCompleteCallback ─► RespondJSON
//! ```
//!
//! Errors never leave this module: each one is logged with its cause chain
//! and turned into a `{ error: { code, message } }` body.
//!
//! Nothing is remembered between calls. Metadata produced by middleware
//! travels to UploadThing with the prepare call and comes back with the
//! completion webhook, which may be served by a different process.

use std::sync::Arc;

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Uri};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::Instrument;

use crate::api::{PrepareUploadRequest, UploadApi};
use crate::config::UtConfigSnapshot;
use crate::errors::{ErrorCode, UploadError, UtResult};
use crate::file::{FileUploadData, UploadedFileData};
use crate::logger::log_upload_error;
use crate::route::{FileRoute, MiddlewareArgs, RequestInfo, UploadCompleteArgs, UploadErrorArgs, UploadErrorFn};
use crate::router::FileRouter;
use crate::response::UtResponse;
use crate::signature::{verify_signature, SIGNATURE_HEADER};

pub const ACTION_QUERY: &str = "actionType";
pub const SLUG_QUERY: &str = "slug";
pub const HOOK_HEADER: &str = "uploadthing-hook";

/// What an incoming call asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// `GET`: list the routes and their limits.
    RouteMetadata,
    /// `POST ?actionType=upload`: a client wants presigned URLs.
    Upload,
    /// `POST ?actionType=failure`: a client gave up on a file.
    Failure,
    /// `POST` with `uploadthing-hook: callback`: UploadThing stored a file.
    Callback,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::RouteMetadata => "metadata",
            Action::Upload => "upload",
            Action::Failure => "failure",
            Action::Callback => "callback",
        }
    }
}

/// Read a query parameter (percent-decoded).
pub fn query_param(uri: &Uri, name: &str) -> Option<String> {
    let query = uri.query()?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

pub fn parse_action(method: &Method, uri: &Uri, headers: &HeaderMap) -> UtResult<Action> {
    if method == Method::GET {
        return Ok(Action::RouteMetadata);
    }
    if method != Method::POST {
        return Err(UploadError::bad_request(format!(
            "Unsupported method {method}"
        )));
    }

    if let Some(hook) = headers.get(HOOK_HEADER) {
        return match hook.to_str().ok() {
            Some("callback") => Ok(Action::Callback),
            other => Err(UploadError::bad_request(format!(
                "Invalid {HOOK_HEADER} header: {}",
                other.unwrap_or("<non-ascii>")
            ))),
        };
    }

    match query_param(uri, ACTION_QUERY).as_deref() {
        Some("upload") => Ok(Action::Upload),
        Some("failure") => Ok(Action::Failure),
        Some(other) => Err(UploadError::bad_request(format!(
            "Invalid action type {other:?}"
        ))),
        None => Err(UploadError::bad_request(format!(
            "Missing {ACTION_QUERY} query parameter"
        ))),
    }
}

/// Everything dispatch needs, shared by every request.
pub struct DispatchContext<A> {
    pub(crate) router: Arc<FileRouter<A>>,
    pub(crate) api: Arc<dyn UploadApi>,
    pub(crate) config: UtConfigSnapshot,
    pub(crate) adapter: &'static str,
    pub(crate) on_upload_error: Option<UploadErrorFn>,
}

impl<A> DispatchContext<A> {
    pub fn new(
        router: Arc<FileRouter<A>>,
        api: Arc<dyn UploadApi>,
        config: UtConfigSnapshot,
        adapter: &'static str,
    ) -> Self {
        Self {
            router,
            api,
            config,
            adapter,
            on_upload_error: None,
        }
    }

    pub fn with_upload_error_hook(mut self, hook: Option<UploadErrorFn>) -> Self {
        self.on_upload_error = hook;
        self
    }

    pub fn router(&self) -> &FileRouter<A> {
        &self.router
    }
}

#[derive(Debug, Deserialize)]
struct UploadActionBody {
    files: Vec<FileUploadData>,
    #[serde(default)]
    input: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FailureActionBody {
    file_key: String,
}

#[derive(Debug, Deserialize)]
struct CallbackBody {
    status: String,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    metadata: Value,
    file: UploadedFileData,
}

fn parse_body<T: for<'de> Deserialize<'de>>(body: &Bytes) -> UtResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| UploadError::bad_request("Invalid request body").with_source(e))
}

/// Run one request through the protocol. Never fails: errors become
/// JSON error responses.
pub async fn dispatch<A>(ctx: &DispatchContext<A>, req: http::Request<Bytes>, adapter_args: A) -> UtResponse
where
    A: Send + 'static,
{
    let (parts, body) = req.into_parts();

    let action = match parse_action(&parts.method, &parts.uri, &parts.headers) {
        Ok(action) => action,
        Err(err) => {
            log_upload_error("Invalid request", &err);
            return UtResponse::error(&err);
        }
    };

    let slug = query_param(&parts.uri, SLUG_QUERY);
    let span = tracing::info_span!(
        "uploadthing",
        adapter = ctx.adapter,
        action = action.as_str(),
        slug = slug.as_deref().unwrap_or(""),
    );

    async move {
        tracing::debug!("handling request");
        match action {
            Action::RouteMetadata => UtResponse::data(ctx.router.route_metadata()),
            Action::Upload => {
                let route = match resolve_route(ctx, slug.as_deref()) {
                    Ok(route) => route,
                    Err(err) => return fail::<A>(None, "Failed to resolve route", err),
                };
                let slug = slug.unwrap_or_default();
                match handle_upload(ctx, &route, &slug, &parts, &body, adapter_args).await {
                    Ok(data) => UtResponse::data(data),
                    Err(err) => fail(Some(&route), "Failed to handle upload request", err),
                }
            }
            Action::Failure => {
                let route = match resolve_route(ctx, slug.as_deref()) {
                    Ok(route) => route,
                    Err(err) => return fail::<A>(None, "Failed to resolve route", err),
                };
                let slug = slug.unwrap_or_default();
                match handle_failure(ctx, &slug, &body).await {
                    Ok(()) => UtResponse::data(Value::Null),
                    Err(err) => fail(Some(&route), "Failed to handle upload failure", err),
                }
            }
            Action::Callback => match handle_callback(ctx, slug, &parts.headers, &body).await {
                Ok(data) => UtResponse::data(data),
                Err((route, err)) => fail(route.as_ref(), "Failed to handle upload callback", err),
            },
        }
    }
    .instrument(span)
    .await
}

fn fail<A>(route: Option<&Arc<FileRoute<A>>>, context: &str, err: UploadError) -> UtResponse {
    log_upload_error(context, &err);
    let err = match route {
        Some(route) => route.format_error(err),
        None => err,
    };
    UtResponse::error(&err)
}

fn resolve_route<A>(ctx: &DispatchContext<A>, slug: Option<&str>) -> UtResult<Arc<FileRoute<A>>> {
    let slug = slug
        .filter(|s| !s.is_empty())
        .ok_or_else(|| UploadError::bad_request(format!("Missing {SLUG_QUERY} query parameter")))?;
    ctx.router
        .get(slug)
        .cloned()
        .ok_or_else(|| UploadError::bad_request(format!("No file route found for slug {slug:?}")))
}

async fn handle_upload<A>(
    ctx: &DispatchContext<A>,
    route: &FileRoute<A>,
    slug: &str,
    parts: &Parts,
    body: &Bytes,
    adapter_args: A,
) -> UtResult<Value>
where
    A: Send + 'static,
{
    let UploadActionBody { mut files, input } = parse_body(body)?;

    let input = match &route.input {
        Some(parse) => parse(&input)?,
        None => input,
    };

    let args = MiddlewareArgs {
        req: RequestInfo {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
        },
        files: files.clone(),
        input,
        adapter: adapter_args,
    };

    let metadata = (route.middleware)(args).await.map_err(|e| {
        UploadError::normalize(e, ErrorCode::InternalServerError, "Failed to run middleware")
    })?;

    route.config.check_files(&files)?;
    metadata.apply_custom_ids(&mut files);

    let request = PrepareUploadRequest {
        files,
        route_config: route.config.to_json(),
        metadata: metadata.into_value(),
        callback_url: callback_url(&ctx.config, parts),
        callback_slug: slug.to_string(),
    };

    let presigned = ctx.api.prepare_upload(request).await?;
    tracing::debug!(count = presigned.len(), "received presigned urls");

    Ok(json!(presigned))
}

async fn handle_failure<A>(ctx: &DispatchContext<A>, slug: &str, body: &Bytes) -> UtResult<()> {
    let FailureActionBody { file_key } = parse_body(body)?;

    ctx.api.report_failure(&file_key).await?;

    if let Some(hook) = &ctx.on_upload_error {
        hook(UploadErrorArgs {
            slug: slug.to_string(),
            file_key,
        })
        .await
        .map_err(|e| {
            UploadError::normalize(e, ErrorCode::InternalServerError, "Failed to run onUploadError")
        })?;
    }

    Ok(())
}

type CallbackFailure<A> = (Option<Arc<FileRoute<A>>>, UploadError);

async fn handle_callback<A>(
    ctx: &DispatchContext<A>,
    slug: Option<String>,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Value, CallbackFailure<A>> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let verified = ctx
        .config
        .secret()
        .is_some_and(|secret| verify_signature(body, signature, secret));
    if !verified {
        return Err((None, UploadError::bad_request("Invalid signature")));
    }

    let CallbackBody {
        status,
        slug: body_slug,
        metadata,
        file,
    } = parse_body(body).map_err(|e| (None, e))?;

    let slug = slug.or(body_slug);
    let route = resolve_route(ctx, slug.as_deref()).map_err(|e| (None, e))?;

    if status != "uploaded" {
        return Err((
            Some(route),
            UploadError::bad_request(format!("Unknown callback status {status:?}")),
        ));
    }

    tracing::debug!(key = %file.key, "running onUploadComplete");

    let result = (route.on_upload_complete)(UploadCompleteArgs { metadata, file })
        .await
        .map_err(|e| {
            let err = UploadError::normalize(
                e,
                ErrorCode::InternalServerError,
                "Failed to run onUploadComplete",
            );
            (Some(Arc::clone(&route)), err)
        })?;

    Ok(result.unwrap_or(Value::Null))
}

/// Where UploadThing should send the completion webhook.
fn callback_url(config: &UtConfigSnapshot, parts: &Parts) -> String {
    if let Some(url) = config.callback_url() {
        return url.to_string();
    }

    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
    };

    let proto = header("x-forwarded-proto")
        .or_else(|| parts.uri.scheme_str().map(str::to_string))
        .unwrap_or_else(|| "http".to_string());
    let host = header("x-forwarded-host")
        .or_else(|| header("host"))
        .or_else(|| parts.uri.authority().map(|a| a.to_string()))
        .unwrap_or_else(|| "localhost".to_string());

    format!("{proto}://{host}{}", parts.uri.path())
}
