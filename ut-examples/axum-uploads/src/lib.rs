mod uploads;

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use ut_axum::{AxumArgs, UtAxumError};
use ut_core::{FileRouter, RouteHandlerOptions, UploadApi, UploadError, UtConfig};

pub use uploads::{file_router, DocumentInput};

/// The limits of one route, for clients that render their own pickers.
async fn route_config(
    State(router): State<Arc<FileRouter<AxumArgs>>>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, UtAxumError> {
    let route = router
        .get(&slug)
        .ok_or_else(|| UploadError::not_found(format!("No file route named {slug}")))?;
    Ok(Json(json!({ "slug": slug, "config": route.config().to_json() })))
}

/// The demo app: health check, route lookup and the upload endpoint.
///
/// `api` replaces the hosted UploadThing API (tests use a fake one).
pub fn build(config: UtConfig, api: Option<Arc<dyn UploadApi>>) -> Result<Router> {
    let mut opts = RouteHandlerOptions::new(file_router()?).config(config);
    if let Some(api) = api {
        opts = opts.api(api);
    }

    let uploads = ut_axum::create_route_handler(opts)?;

    let routes = Router::new()
        .route("/routes/{slug}", get(route_config))
        .with_state(Arc::new(file_router()?));

    Ok(Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(routes)
        .nest("/api/uploadthing", uploads))
}

/// `host:port` from `UPLOADTHING_HTTP_HOST` / `UPLOADTHING_HTTP_PORT`.
pub fn listen_addr(config: &UtConfig) -> String {
    let snap = config.snapshot();
    let host = snap
        .get_string("http.host")
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = snap
        .get_string("http.port")
        .unwrap_or_else(|| "3036".to_string());
    format!("{host}:{port}")
}
