use std::path::Path;

use bytes::Bytes;
use ut_core::{guess_mime, FileUploadData};

use crate::error::TransportError;

/// Something that can be uploaded: a name, a MIME type and the bytes.
#[derive(Debug, Clone)]
pub struct FileEsque {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub body: Bytes,
}

impl FileEsque {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self {
            name: name.into(),
            size: body.len() as u64,
            mime_type: mime_type.into(),
            body,
        }
    }

    /// Read a file from disk; the MIME type is guessed from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let path = path.as_ref();
        let body = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let mime_type = guess_mime(&name);
        Ok(Self::new(name, mime_type, body))
    }

    /// What the server sees before the bytes move.
    pub fn descriptor(&self) -> FileUploadData {
        FileUploadData {
            name: self.name.clone(),
            size: self.size,
            file_type: self.mime_type.clone(),
            custom_id: None,
        }
    }
}
