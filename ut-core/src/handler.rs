//! # Adapter handler
//!
//! Bridges a framework's native event `E` into the framework-neutral
//! dispatch protocol:
//!
//! ```text
//! E ─► extract_adapter_args(&E) ─► A
//!   └► extract_web_request(E)   ─► http::Request<Bytes>
//!                                     │
//!                      dispatch(req, A) ─► UtResponse ─► adapter's native response
//! ```
//!
//! Configuration is resolved once, when the handler is made. A missing
//! secret is a construction error, not a per-request one.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;

use crate::api::{HttpUploadApi, UploadApi};
use crate::config::UtConfig;
use crate::dispatch::{dispatch, DispatchContext};
use crate::errors::{ErrorCode, UploadError, UtResult};
use crate::logger::log_upload_error;
use crate::response::UtResponse;
use crate::route::{UploadErrorArgs, UploadErrorFn};
use crate::router::FileRouter;

/// What an adapter needs to serve a router.
pub struct RouteHandlerOptions<A> {
    pub router: Arc<FileRouter<A>>,
    pub config: UtConfig,
    pub api: Option<Arc<dyn UploadApi>>,
    pub on_upload_error: Option<UploadErrorFn>,
}

impl<A> RouteHandlerOptions<A> {
    /// Options for `router`, configured from `UPLOADTHING_*` env vars.
    pub fn new(router: impl Into<Arc<FileRouter<A>>>) -> Self {
        Self {
            router: router.into(),
            config: UtConfig::from_env(),
            api: None,
            on_upload_error: None,
        }
    }

    pub fn config(mut self, config: UtConfig) -> Self {
        self.config = config;
        self
    }

    /// Talk to something other than the hosted API.
    pub fn api(mut self, api: Arc<dyn UploadApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Runs after a client-reported failure was forwarded to UploadThing.
    pub fn on_upload_error<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(UploadErrorArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_upload_error = Some(Arc::new(
            move |args: UploadErrorArgs| -> BoxFuture<'static, anyhow::Result<()>> {
                Box::pin(f(args))
            },
        ));
        self
    }
}

type ExtractArgsFn<E, A> = Arc<dyn Fn(&E) -> anyhow::Result<A> + Send + Sync>;
type ExtractRequestFn<E> =
    Arc<dyn Fn(E) -> BoxFuture<'static, anyhow::Result<http::Request<Bytes>>> + Send + Sync>;

/// A ready-to-serve handler for native events of type `E`.
pub struct AdapterHandler<E, A> {
    ctx: Arc<DispatchContext<A>>,
    body_limit: usize,
    extract_args: ExtractArgsFn<E, A>,
    extract_request: ExtractRequestFn<E>,
}

impl<E, A> Clone for AdapterHandler<E, A> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
            body_limit: self.body_limit,
            extract_args: Arc::clone(&self.extract_args),
            extract_request: Arc::clone(&self.extract_request),
        }
    }
}

pub fn make_adapter_handler<E, A, X, R, Fut>(
    extract_adapter_args: X,
    extract_web_request: R,
    opts: RouteHandlerOptions<A>,
    adapter_name: &'static str,
) -> UtResult<AdapterHandler<E, A>>
where
    E: Send + 'static,
    A: Send + 'static,
    X: Fn(&E) -> anyhow::Result<A> + Send + Sync + 'static,
    R: Fn(E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<http::Request<Bytes>>> + Send + 'static,
{
    let RouteHandlerOptions {
        router,
        config,
        api,
        on_upload_error,
    } = opts;
    let config = config.snapshot();

    let api: Arc<dyn UploadApi> = match api {
        Some(api) => api,
        None => Arc::new(HttpUploadApi::from_config(&config, adapter_name)?),
    };

    tracing::debug!(
        adapter = adapter_name,
        routes = ?router.route_names(),
        "uploadthing handler ready"
    );

    let body_limit = config.body_limit();
    let ctx = DispatchContext::new(router, api, config, adapter_name)
        .with_upload_error_hook(on_upload_error);

    Ok(AdapterHandler {
        ctx: Arc::new(ctx),
        body_limit,
        extract_args: Arc::new(extract_adapter_args),
        extract_request: Arc::new(
            move |event: E| -> BoxFuture<'static, anyhow::Result<http::Request<Bytes>>> {
                Box::pin(extract_web_request(event))
            },
        ),
    })
}

impl<E, A> AdapterHandler<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    /// Serve one native event.
    pub fn handle(&self, event: E) -> BoxFuture<'static, UtResponse> {
        let this = self.clone();
        Box::pin(async move {
            let args = match (this.extract_args)(&event) {
                Ok(args) => args,
                Err(e) => return extraction_failed(e, "Failed to read adapter arguments"),
            };
            let req = match (this.extract_request)(event).await {
                Ok(req) => req,
                Err(e) => return extraction_failed(e, "Failed to read request"),
            };
            if req.body().len() > this.body_limit {
                return extraction_failed(
                    anyhow::anyhow!("body is {} bytes", req.body().len()),
                    &format!("Request body exceeds {} bytes", this.body_limit),
                );
            }
            dispatch(&this.ctx, req, args).await
        })
    }

    /// Largest request body this handler accepts.
    pub fn body_limit(&self) -> usize {
        self.body_limit
    }

    pub fn router(&self) -> &FileRouter<A> {
        self.ctx.router()
    }
}

fn extraction_failed(err: anyhow::Error, message: &str) -> UtResponse {
    let err = UploadError::normalize(err, ErrorCode::BadRequest, message);
    log_upload_error("Adapter extraction failed", &err);
    UtResponse::error(&err)
}
