/// Project cover images, stored inline as data URIs.
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Map a file extension to its MIME content type.
pub fn content_type_for_ext(ext: Option<&str>) -> &'static str {
    match ext.map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

/// Build a `data:<mime>;base64,<payload>` URI. No size or format checks.
pub fn image_data_uri(file_name: &str, bytes: &[u8]) -> String {
    let ext = Path::new(file_name).extension().and_then(|s| s.to_str());
    format!(
        "data:{};base64,{}",
        content_type_for_ext(ext),
        STANDARD.encode(bytes)
    )
}

/// Read an image file and turn it into a data URI.
pub fn image_data_uri_from_path(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    Ok(image_data_uri(name, &bytes))
}
