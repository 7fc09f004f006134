//! Edge-style adapter: `http::Request<Bytes> -> http::Response<Bytes>`.
//!
//! Useful for runtimes that hand over a fully-buffered request, and for
//! driving the protocol in tests without a web framework.
//!
//! ```rust,no_run
//! use ut_core::fetch::{create_route_handler, create_uploadthing};
//! use ut_core::{FileRouter, RouteConfig, RouteHandlerOptions, RouteLimits};
//!
//! # async fn run() -> ut_core::UtResult<()> {
//! let f = create_uploadthing(None);
//! let router = FileRouter::builder()
//!     .route(
//!         "document",
//!         f.route(RouteConfig::new().pdf(RouteLimits::new()))
//!             .on_upload_complete(|args| async move { Ok(args.file.key) }),
//!     )
//!     .build()?;
//!
//! let handler = create_route_handler(RouteHandlerOptions::new(router))?;
//! let res = handler(http::Request::get("/api/uploadthing").body(bytes::Bytes::new()).unwrap()).await;
//! assert!(res.status().is_success());
//! # Ok(())
//! # }
//! ```

use bytes::Bytes;
use futures::future::BoxFuture;

use crate::builder::{create_builder, CreateBuilderOptions, UploadBuilder};
use crate::errors::UtResult;
use crate::handler::{make_adapter_handler, RouteHandlerOptions};
use crate::route::RequestInfo;

pub const ADAPTER_NAME: &str = "fetch";

/// What fetch middleware gets besides the common arguments.
#[derive(Debug, Clone)]
pub struct FetchArgs {
    pub req: RequestInfo,
}

pub fn create_uploadthing(opts: Option<CreateBuilderOptions>) -> UploadBuilder<FetchArgs> {
    create_builder(opts)
}

pub fn create_route_handler(
    opts: RouteHandlerOptions<FetchArgs>,
) -> UtResult<impl Fn(http::Request<Bytes>) -> BoxFuture<'static, http::Response<Bytes>> + Clone + Send + Sync>
{
    let handler = make_adapter_handler(
        |req: &http::Request<Bytes>| {
            Ok(FetchArgs {
                req: RequestInfo {
                    method: req.method().clone(),
                    uri: req.uri().clone(),
                    headers: req.headers().clone(),
                },
            })
        },
        |req: http::Request<Bytes>| async move { Ok::<_, anyhow::Error>(req) },
        opts,
        ADAPTER_NAME,
    )?;

    Ok(move |req: http::Request<Bytes>| -> BoxFuture<'static, http::Response<Bytes>> {
        let fut = handler.handle(req);
        Box::pin(async move { fut.await.into_http() })
    })
}
