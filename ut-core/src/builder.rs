//! # Route builder
//!
//! ```rust
//! use ut_core::{create_builder, FileRouter, RouteConfig, RouteLimits};
//! use serde_json::json;
//!
//! let f = create_builder::<()>(None);
//!
//! let router = FileRouter::builder()
//!     .route(
//!         "avatar",
//!         f.route(RouteConfig::new().image(RouteLimits::new().max_file_size("2MB")))
//!             .middleware(|_args| async move { Ok(json!({ "userId": "u_1" })) })
//!             .on_upload_complete(|args| async move {
//!                 Ok(json!({ "uploadedBy": args.metadata["userId"] }))
//!             }),
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(router.route_names(), vec!["avatar"]);
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use validator::Validate;

use crate::errors::{UploadError, UtResult};
use crate::file::RouteConfig;
use crate::route::{
    noop_middleware, ErrorFormatter, FileRoute, Metadata, MiddlewareArgs, MiddlewareFn,
    UploadCompleteArgs, UploadCompleteFn,
};
use crate::validation::{input_parser, InputParser};

/// Options shared by every route a builder creates.
#[derive(Clone, Default)]
pub struct CreateBuilderOptions {
    pub error_formatter: Option<ErrorFormatter>,
}

impl CreateBuilderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shape `error.data` for routes of this builder.
    pub fn error_formatter<F>(mut self, f: F) -> Self
    where
        F: Fn(&UploadError) -> Option<Value> + Send + Sync + 'static,
    {
        self.error_formatter = Some(Arc::new(f));
        self
    }
}

/// Creates route definitions for one adapter type `A`.
pub struct UploadBuilder<A> {
    options: CreateBuilderOptions,
    _marker: PhantomData<fn() -> A>,
}

pub fn create_builder<A>(opts: Option<CreateBuilderOptions>) -> UploadBuilder<A> {
    UploadBuilder {
        options: opts.unwrap_or_default(),
        _marker: PhantomData,
    }
}

impl<A> UploadBuilder<A>
where
    A: Send + 'static,
{
    /// Start a route accepting the given file kinds.
    pub fn route(&self, config: RouteConfig) -> RouteDefinition<A> {
        RouteDefinition {
            config,
            input: None,
            middleware: None,
            on_upload_complete: None,
            error_formatter: self.options.error_formatter.clone(),
        }
    }
}

/// A route under construction. Checked when the router is built.
pub struct RouteDefinition<A> {
    config: RouteConfig,
    input: Option<InputParser>,
    middleware: Option<MiddlewareFn<A>>,
    on_upload_complete: Option<UploadCompleteFn>,
    error_formatter: Option<ErrorFormatter>,
}

impl<A> RouteDefinition<A>
where
    A: Send + 'static,
{
    /// Validate the client's `input` as `T`.
    pub fn input<T>(mut self) -> Self
    where
        T: DeserializeOwned + Validate + Serialize + 'static,
    {
        self.input = Some(input_parser::<T>());
        self
    }

    /// Use a hand-written input parser.
    pub fn input_parser(mut self, parser: InputParser) -> Self {
        self.input = Some(parser);
        self
    }

    pub fn middleware<F, Fut, M>(mut self, f: F) -> Self
    where
        F: Fn(MiddlewareArgs<A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<M>> + Send + 'static,
        M: Into<Metadata>,
    {
        self.middleware = Some(Arc::new(
            move |args: MiddlewareArgs<A>| -> BoxFuture<'static, anyhow::Result<Metadata>> {
                let fut = f(args);
                Box::pin(async move { fut.await.map(Into::into) })
            },
        ));
        self
    }

    /// Runs when UploadThing reports a stored file. The returned value is
    /// sent back as the webhook acknowledgment; `()` means none.
    pub fn on_upload_complete<F, Fut, R>(mut self, f: F) -> Self
    where
        F: Fn(UploadCompleteArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: Serialize,
    {
        self.on_upload_complete = Some(Arc::new(
            move |args: UploadCompleteArgs| -> BoxFuture<'static, anyhow::Result<Option<Value>>> {
                let fut = f(args);
                Box::pin(async move {
                    let out = serde_json::to_value(fut.await?)?;
                    Ok((!out.is_null()).then_some(out))
                })
            },
        ));
        self
    }

    pub(crate) fn finalize(self, name: &str) -> UtResult<FileRoute<A>> {
        let config = self
            .config
            .expand()
            .map_err(|e| UploadError::config_error(format!("Route {name:?}: {}", e.message)))?;

        let on_upload_complete = self.on_upload_complete.ok_or_else(|| {
            UploadError::config_error(format!("Route {name:?} has no onUploadComplete callback"))
        })?;

        Ok(FileRoute {
            config,
            input: self.input,
            middleware: self.middleware.unwrap_or_else(noop_middleware),
            on_upload_complete,
            error_formatter: self.error_formatter,
        })
    }
}
