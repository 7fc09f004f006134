use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{UploadError, UtResult};

/// The kinds of files a route can accept.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileKind {
    Image,
    Video,
    Audio,
    Pdf,
    Text,
    /// Anything not matched by a more specific kind on the same route.
    Blob,
    /// An exact MIME type such as `application/zip`.
    Mime(String),
}

impl FileKind {
    pub fn as_str(&self) -> &str {
        match self {
            FileKind::Image => "image",
            FileKind::Video => "video",
            FileKind::Audio => "audio",
            FileKind::Pdf => "pdf",
            FileKind::Text => "text",
            FileKind::Blob => "blob",
            FileKind::Mime(m) => m.as_str(),
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "image" => FileKind::Image,
            "video" => FileKind::Video,
            "audio" => FileKind::Audio,
            "pdf" => FileKind::Pdf,
            "text" => FileKind::Text,
            "blob" => FileKind::Blob,
            other => FileKind::Mime(other.to_ascii_lowercase()),
        }
    }

    /// Whether `mime` falls under this kind, ignoring `blob`.
    fn matches(&self, mime: &str) -> bool {
        match self {
            FileKind::Image => mime.starts_with("image/"),
            FileKind::Video => mime.starts_with("video/"),
            FileKind::Audio => mime.starts_with("audio/"),
            FileKind::Pdf => mime == "application/pdf",
            FileKind::Text => mime.starts_with("text/"),
            FileKind::Blob => false,
            FileKind::Mime(m) => m == mime,
        }
    }

    fn default_max_size(&self) -> &'static str {
        match self {
            FileKind::Image => "4MB",
            FileKind::Video => "16MB",
            FileKind::Audio => "8MB",
            FileKind::Pdf => "4MB",
            FileKind::Text => "64KB",
            FileKind::Blob | FileKind::Mime(_) => "8MB",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a human size like `"4MB"` or `"512KB"` into bytes (base 1024).
pub fn parse_file_size(input: &str) -> UtResult<u64> {
    let s = input.trim();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (num, unit) = s.split_at(split);

    let value: f64 = num
        .parse()
        .map_err(|_| UploadError::config_error(format!("Invalid file size: {input:?}")))?;

    let multiplier: u64 = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "KB" => 1024,
        "MB" => 1024 * 1024,
        "GB" => 1024 * 1024 * 1024,
        _ => {
            return Err(UploadError::config_error(format!(
                "Invalid file size unit: {input:?}"
            )))
        }
    };

    Ok((value * multiplier as f64) as u64)
}

/// Per-kind limits as declared by the application.
#[derive(Debug, Clone, Default)]
pub struct RouteLimits {
    pub max_file_size: Option<String>,
    pub max_file_count: Option<u32>,
    pub min_file_count: Option<u32>,
}

impl RouteLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_file_size(mut self, size: impl Into<String>) -> Self {
        self.max_file_size = Some(size.into());
        self
    }

    pub fn max_file_count(mut self, count: u32) -> Self {
        self.max_file_count = Some(count);
        self
    }

    pub fn min_file_count(mut self, count: u32) -> Self {
        self.min_file_count = Some(count);
        self
    }
}

/// Limits after defaults were applied and sizes were parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedLimits {
    pub max_file_size: String,
    pub max_file_bytes: u64,
    pub max_file_count: u32,
    pub min_file_count: u32,
}

/// What a route accepts, keyed by file kind.
///
/// ```rust
/// use ut_core::{FileKind, RouteConfig, RouteLimits};
///
/// let config = RouteConfig::new()
///     .kind(FileKind::Image, RouteLimits::new().max_file_size("2MB").max_file_count(4))
///     .kind(FileKind::Pdf, RouteLimits::new());
/// assert_eq!(config.kinds().count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RouteConfig {
    entries: BTreeMap<FileKind, RouteLimits>,
}

impl RouteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: FileKind, limits: RouteLimits) -> Self {
        self.entries.insert(kind, limits);
        self
    }

    pub fn image(self, limits: RouteLimits) -> Self {
        self.kind(FileKind::Image, limits)
    }

    pub fn video(self, limits: RouteLimits) -> Self {
        self.kind(FileKind::Video, limits)
    }

    pub fn audio(self, limits: RouteLimits) -> Self {
        self.kind(FileKind::Audio, limits)
    }

    pub fn pdf(self, limits: RouteLimits) -> Self {
        self.kind(FileKind::Pdf, limits)
    }

    pub fn text(self, limits: RouteLimits) -> Self {
        self.kind(FileKind::Text, limits)
    }

    pub fn blob(self, limits: RouteLimits) -> Self {
        self.kind(FileKind::Blob, limits)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &FileKind> {
        self.entries.keys()
    }

    /// Apply defaults and parse sizes. Fails with `CONFIG_ERROR`.
    pub fn expand(&self) -> UtResult<ExpandedRouteConfig> {
        if self.entries.is_empty() {
            return Err(UploadError::config_error(
                "A route must accept at least one file kind",
            ));
        }

        let mut expanded = BTreeMap::new();
        for (kind, limits) in &self.entries {
            let max_file_size = limits
                .max_file_size
                .clone()
                .unwrap_or_else(|| kind.default_max_size().to_string());
            let max_file_bytes = parse_file_size(&max_file_size)?;
            let max_file_count = limits.max_file_count.unwrap_or(1);
            let min_file_count = limits.min_file_count.unwrap_or(1);

            if max_file_count == 0 {
                return Err(UploadError::config_error(format!(
                    "maxFileCount for {kind} must be at least 1"
                )));
            }
            if min_file_count > max_file_count {
                return Err(UploadError::config_error(format!(
                    "minFileCount ({min_file_count}) for {kind} exceeds maxFileCount ({max_file_count})"
                )));
            }

            expanded.insert(
                kind.clone(),
                ExpandedLimits {
                    max_file_size,
                    max_file_bytes,
                    max_file_count,
                    min_file_count,
                },
            );
        }

        Ok(ExpandedRouteConfig { entries: expanded })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedRouteConfig {
    entries: BTreeMap<FileKind, ExpandedLimits>,
}

impl ExpandedRouteConfig {
    pub fn get(&self, kind: &FileKind) -> Option<&ExpandedLimits> {
        self.entries.get(kind)
    }

    /// Which configured kind a MIME type falls under.
    ///
    /// An exact MIME entry beats the generic kind it belongs to, and `blob`
    /// only takes what nothing else claimed.
    pub fn kind_for(&self, mime: &str) -> Option<&FileKind> {
        let mime = mime.to_ascii_lowercase();
        let keys = || self.entries.keys();
        keys()
            .find(|k| matches!(k, FileKind::Mime(_)) && k.matches(&mime))
            .or_else(|| keys().find(|k| k.matches(&mime)))
            .or_else(|| keys().find(|k| **k == FileKind::Blob))
    }

    /// Check a batch of files against the limits.
    pub fn check_files(&self, files: &[FileUploadData]) -> UtResult<()> {
        let mut counts: BTreeMap<&FileKind, u32> = BTreeMap::new();

        for file in files {
            let mime = file.mime_type();
            let kind = self.kind_for(mime).ok_or_else(|| {
                UploadError::file_limit_exceeded(format!(
                    "File type {mime} is not allowed for this route"
                ))
            })?;

            // kind_for only returns configured kinds
            let Some(limits) = self.entries.get(kind) else {
                continue;
            };

            if file.size > limits.max_file_bytes {
                return Err(UploadError::file_limit_exceeded(format!(
                    "File {} exceeds the {} limit for {kind}",
                    file.name, limits.max_file_size
                )));
            }

            *counts.entry(kind).or_insert(0) += 1;
        }

        for (kind, limits) in &self.entries {
            let count = counts.get(kind).copied().unwrap_or(0);
            if count > limits.max_file_count {
                return Err(UploadError::file_limit_exceeded(format!(
                    "You uploaded {count} {kind} files, the limit is {}",
                    limits.max_file_count
                )));
            }
            if count > 0 && count < limits.min_file_count {
                return Err(UploadError::file_limit_exceeded(format!(
                    "You uploaded {count} {kind} files, at least {} are required",
                    limits.min_file_count
                )));
            }
        }

        Ok(())
    }

    /// `{ "<kind>": { maxFileSize, maxFileCount, minFileCount } }` for the wire.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .entries
            .iter()
            .map(|(kind, limits)| {
                (
                    kind.to_string(),
                    serde_json::json!({
                        "maxFileSize": limits.max_file_size,
                        "maxFileCount": limits.max_file_count,
                        "minFileCount": limits.min_file_count,
                    }),
                )
            })
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

/// A file the client intends to upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadData {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type", default)]
    pub file_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
}

impl FileUploadData {
    /// The declared type, or a guess from the name when the client sent none.
    pub fn mime_type(&self) -> &str {
        if self.file_type.is_empty() {
            guess_mime(&self.name)
        } else {
            &self.file_type
        }
    }
}

/// MIME type for a file name, by extension. Unknown extensions are
/// `application/octet-stream`.
pub fn guess_mime(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

/// One presigned target issued by the UploadThing API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUpload {
    pub key: String,
    pub url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
}

/// A stored file as reported by the completion webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFileData {
    pub key: String,
    pub name: String,
    pub size: u64,
    #[serde(rename = "type", default)]
    pub file_type: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub app_url: String,
    #[serde(default)]
    pub ufs_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    #[serde(default)]
    pub file_hash: String,
}
