use axum::{
    body::Body,
    extract::{OriginalUri, Request},
    http::{Extensions, HeaderMap, Method, Uri},
    routing::get,
    Router,
};
use bytes::Bytes;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use ut_core::{
    create_builder, make_adapter_handler, CreateBuilderOptions, RouteHandlerOptions, UploadBuilder,
    UploadError, UtResult,
};

use crate::UtAxumResponse;

pub const ADAPTER_NAME: &str = "axum";

/// What axum middleware gets besides the common arguments.
///
/// `extensions` holds whatever earlier layers inserted (auth sessions,
/// connection info, ...).
#[derive(Debug, Clone)]
pub struct AxumArgs {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub extensions: Extensions,
}

impl AxumArgs {
    pub fn extension<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.extensions.get::<T>().cloned()
    }
}

pub fn create_uploadthing(opts: Option<CreateBuilderOptions>) -> UploadBuilder<AxumArgs> {
    create_builder(opts)
}

/// An axum `Router` answering `GET` and `POST` on `/`.
///
/// Nest it wherever the client expects the endpoint:
///
/// ```rust,no_run
/// # fn mount(router: ut_core::FileRouter<ut_axum::AxumArgs>) -> ut_core::UtResult<()> {
/// let uploads = ut_axum::create_route_handler(ut_core::RouteHandlerOptions::new(router))?;
/// let app: axum::Router = axum::Router::new().nest("/api/uploadthing", uploads);
/// # Ok(())
/// # }
/// ```
pub fn create_route_handler(opts: RouteHandlerOptions<AxumArgs>) -> UtResult<Router> {
    let body_limit = opts.config.snapshot().body_limit();

    let handler = make_adapter_handler(
        |req: &Request| {
            Ok(AxumArgs {
                method: req.method().clone(),
                uri: req
                    .extensions()
                    .get::<OriginalUri>()
                    .map(|OriginalUri(uri)| uri.clone())
                    .unwrap_or_else(|| req.uri().clone()),
                headers: req.headers().clone(),
                extensions: req.extensions().clone(),
            })
        },
        move |req: Request| read_body(req, body_limit),
        opts,
        ADAPTER_NAME,
    )?;

    let serve = move |req: Request| {
        let handler = handler.clone();
        async move { UtAxumResponse(handler.handle(req).await) }
    };

    Ok(Router::new().route("/", get(serve.clone()).post(serve)).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id()),
    ))
}

async fn read_body(req: Request, limit: usize) -> anyhow::Result<axum::http::Request<Bytes>> {
    let (mut parts, body): (_, Body) = req.into_parts();
    // Nesting strips the mount path; the callback URL needs the full one
    if let Some(OriginalUri(uri)) = parts.extensions.get::<OriginalUri>() {
        parts.uri = uri.clone();
    }
    let bytes = axum::body::to_bytes(body, limit).await.map_err(|e| {
        UploadError::bad_request(format!("Request body unreadable or over {limit} bytes"))
            .with_source(e)
            .into_anyhow()
    })?;
    Ok(axum::http::Request::from_parts(parts, bytes))
}

/// Bind `addr` and serve `app` until the process stops.
pub async fn listen<A>(app: Router, addr: A) -> anyhow::Result<()>
where
    A: tokio::net::ToSocketAddrs,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
