//! ut-core: framework-agnostic core of the UploadThing Rust SDK.
//!
//! Declare file routes with [`create_builder`], collect them into a
//! [`FileRouter`], and serve them through an adapter built on
//! [`make_adapter_handler`]. The file bytes never pass through this server:
//! it hands out presigned URLs and receives a signed webhook when a file is
//! stored.

pub mod api;
pub mod builder;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod fetch;
pub mod file;
pub mod handler;
pub mod logger;
pub mod response;
pub mod route;
pub mod router;
pub mod signature;
pub mod validation;

/// Protocol version sent in `x-uploadthing-version`.
pub const UPLOADTHING_VERSION: &str = env!("CARGO_PKG_VERSION");

pub use api::{HttpUploadApi, PrepareUploadRequest, UploadApi};
pub use builder::{create_builder, CreateBuilderOptions, RouteDefinition, UploadBuilder};
pub use config::{UtConfig, UtConfigSnapshot};
pub use dispatch::{dispatch, Action, DispatchContext};
pub use errors::{ErrorCode, UploadError, UtResult};
pub use file::{
    guess_mime, parse_file_size, ExpandedLimits, ExpandedRouteConfig, FileKind, FileUploadData,
    PresignedUpload, RouteConfig, RouteLimits, UploadedFileData,
};
pub use handler::{make_adapter_handler, AdapterHandler, RouteHandlerOptions};
pub use logger::{log_deprecation_warning, log_upload_error};
pub use response::UtResponse;
pub use route::{
    FileRoute, Metadata, MiddlewareArgs, RequestInfo, UploadCompleteArgs, UploadErrorArgs,
};
pub use router::{FileRouter, FileRouterBuilder};
pub use signature::{sign_payload, verify_signature};
pub use validation::{input_parser, validate_input, InputErrors, InputParser};
