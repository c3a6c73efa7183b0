//! Image file extensions for archive entries.

const KNOWN: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "avif", "bmp"];

/// Extension for a page: content type first, then the URL path, then magic bytes, else `img`.
pub fn image_extension(content_type: Option<&str>, url: &str, bytes: &[u8]) -> String {
    content_type
        .and_then(from_content_type)
        .or_else(|| from_url(url))
        .or_else(|| sniff(bytes))
        .unwrap_or("img")
        .to_string()
}

fn from_content_type(ct: &str) -> Option<&'static str> {
    let ct = ct.split(';').next()?.trim().to_ascii_lowercase();
    match ct.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/avif" => Some("avif"),
        "image/bmp" => Some("bmp"),
        _ => None,
    }
}

fn from_url(url: &str) -> Option<&'static str> {
    let parsed = url::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    let (_, ext) = last.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    let known = KNOWN.iter().copied().find(|k| *k == ext)?;
    Some(if known == "jpeg" { "jpg" } else { known })
}

/// Guess from leading magic bytes.
pub fn sniff(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpg")
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("png")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("gif")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("webp")
    } else if bytes.len() >= 12 && &bytes[4..12] == b"ftypavif" {
        Some("avif")
    } else if bytes.starts_with(b"BM") {
        Some("bmp")
    } else {
        None
    }
}
