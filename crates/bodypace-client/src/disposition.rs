//! `content-disposition` parsing for fetched documents.
//!
//! The server sends the (encrypted) filename as
//! `attachment; filename="<base64-name>"`.

/// Extract the `filename` parameter. Returns `None` when the header has no
/// non-empty filename.
pub fn filename(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|param| param.strip_prefix("filename="))
        .map(|value| value.trim().trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}
