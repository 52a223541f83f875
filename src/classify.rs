const BITMAP_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

/// Accepts absolute http(s) URLs pointing at a JPEG or PNG; vector formats are refused.
pub fn is_bitmap_url(candidate: &str) -> bool {
    let url = candidate.trim().to_lowercase();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return false;
    }
    if url.ends_with(".svg") || url.contains("format=svg") {
        return false;
    }
    BITMAP_EXTENSIONS
        .iter()
        .any(|ext| url.ends_with(ext) || url.contains(&format!("{ext}?")))
}

/// File extension to store a fetched asset under, derived from its URL.
pub fn file_extension(url: &str, fallback: &'static str) -> &'static str {
    let lower = url.to_lowercase();
    let path = lower.split(['?', '#']).next().unwrap_or_default();
    if path.ends_with(".png") {
        "png"
    } else if path.ends_with(".jpg") || path.ends_with(".jpeg") {
        "jpg"
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_relative_and_vector() {
        assert!(!is_bitmap_url("//upload.wikimedia.org/a.jpg"));
        assert!(!is_bitmap_url("https://example.org/a.SVG"));
        assert!(!is_bitmap_url("https://example.org/a.gif"));
    }

    #[test]
    fn extension_from_url() {
        assert_eq!(file_extension("https://x.org/a.JPEG?w=2", "png"), "jpg");
        assert_eq!(file_extension("https://x.org/sono/ffts/a.png", "jpg"), "png");
        assert_eq!(file_extension("https://x.org/a", "png"), "png");
    }
}
