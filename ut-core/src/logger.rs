use crate::errors::UploadError;

/// Log a per-request error with its full cause chain.
///
/// 4xx answers are the caller's fault and log at `warn`; everything else
/// logs at `error`.
pub fn log_upload_error(context: &str, err: &UploadError) {
    let cause = err
        .source
        .as_ref()
        .map(|src| format!("{src:#}"))
        .unwrap_or_default();

    if err.status_code() < 500 {
        tracing::warn!(code = %err.code, cause = %cause, "{context}: {}", err.message);
    } else {
        tracing::error!(code = %err.code, cause = %cause, "{context}: {}", err.message);
    }
}

/// Advisory only: logged on every call, never deduplicated.
pub fn log_deprecation_warning(message: &str) {
    tracing::warn!(deprecated = true, "{message}");
}
