use std::path::Path;
use tracing::warn;

const FALLBACK_NAME: &str = "upload.pdf";

/// Reduces a client-supplied filename to a single safe path component.
///
/// Only the last component of the given name is kept, and reserved, quote and
/// control characters are replaced with `_`. The result must come through the
/// PDF tool's quote stripping unchanged. An empty result falls back to
/// `upload.pdf`.
pub fn sanitize_filename(filename: &str) -> String {
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        warn!("Path components stripped from uploaded filename: {}", filename);
    }

    // Windows separators are not separators for `Path` on unix hosts.
    let last = filename.rsplit(['/', '\\']).next().unwrap_or("");
    let name = Path::new(last)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control()
                || matches!(c, ':' | '*' | '?' | '"' | '\'' | '<' | '>' | '|')
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = sanitized.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}
