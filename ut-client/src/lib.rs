//! # ut-client: the client half of the UploadThing Rust SDK
//!
//! ```text
//! UtClient::upload
//!   ├─ POST <endpoint>?actionType=upload&slug=…   → presigned targets
//!   ├─ PUT  <presigned.url> (one per file, concurrent)
//!   └─ POST <endpoint>?actionType=failure&slug=…  for each file that failed
//! ```
//!
//! ```rust,no_run
//! use ut_client::{FileEsque, UtClient};
//!
//! # async fn run() -> ut_core::UtResult<()> {
//! let client = UtClient::new("http://localhost:3000/api/uploadthing");
//! let avatar = FileEsque::new("me.png", "image/png", std::fs::read("me.png").unwrap());
//!
//! let uploaded = client.upload("avatar", &[avatar], serde_json::Value::Null).await?;
//! println!("stored at {}", uploaded[0].ufs_url());
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod file;
mod transport;

pub use client::UtClient;
pub use error::TransportError;
pub use file::FileEsque;
pub use transport::{upload_file, upload_files, UploadPutResult};
