//! Content type detection and topic parsing.

use std::path::Path;

use evoapp_protocol::constants::DEFAULT_CONTENT_TYPE;

/// Detects the MIME content type from a file extension.
///
/// Falls back to `text/plain` for unknown or missing extensions.
pub fn detect_content_type(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("html" | "htm") => "text/html",
        Some("css") => "text/css",
        Some("js" | "mjs" | "cjs") => "application/javascript",
        Some("json" | "map") => "application/json",
        Some("webmanifest") => "application/manifest+json",
        Some("wasm") => "application/wasm",
        Some("xml") => "application/xml",
        Some("pdf") => "application/pdf",
        Some("txt" | "md") => "text/plain",
        Some("csv") => "text/csv",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("svg") => "image/svg+xml",
        Some("avif") => "image/avif",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Parses a comma- or space-separated topic string into trimmed topics.
pub fn parse_topics(topics: &str) -> Vec<String> {
    topics
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_content_type_known() {
        assert_eq!(detect_content_type("index.html"), "text/html");
        assert_eq!(detect_content_type("assets/app.js"), "application/javascript");
        assert_eq!(detect_content_type("style.css"), "text/css");
        assert_eq!(detect_content_type("logo.svg"), "image/svg+xml");
        assert_eq!(detect_content_type("photo.jpeg"), "image/jpeg");
        assert_eq!(detect_content_type("font.woff2"), "font/woff2");
    }

    #[test]
    fn detect_content_type_unknown_defaults_to_plain() {
        assert_eq!(detect_content_type("archive.xyz"), "text/plain");
        assert_eq!(detect_content_type("noext"), "text/plain");
        assert_eq!(detect_content_type(""), "text/plain");
    }

    #[test]
    fn detect_content_type_case_insensitive() {
        assert_eq!(detect_content_type("IMAGE.PNG"), "image/png");
        assert_eq!(detect_content_type("Index.HTML"), "text/html");
    }

    #[test]
    fn parse_topics_commas_and_spaces() {
        assert_eq!(parse_topics("react,todo, warp"), vec!["react", "todo", "warp"]);
        assert_eq!(parse_topics("react todo"), vec!["react", "todo"]);
    }

    #[test]
    fn parse_topics_drops_empty() {
        assert!(parse_topics("").is_empty());
        assert_eq!(parse_topics(" ,, react ,"), vec!["react"]);
    }
}
