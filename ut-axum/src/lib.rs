//! ut-axum: axum adapter for the UploadThing Rust SDK.
//!
//! Route definitions, limits and the dispatch protocol live in `ut-core`;
//! this crate only converts between axum's request/response types and the
//! framework-neutral ones.

mod handler;
mod response;

pub use handler::{create_route_handler, create_uploadthing, listen, AxumArgs, ADAPTER_NAME};
pub use response::{UtAxumError, UtAxumResponse};

pub use axum;
pub use ut_core;
