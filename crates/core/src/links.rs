//! Supported-link detection and URL cleaning.

use url::Url;

/// Hostnames the bot will attempt to download from.
const SUPPORTED_HOSTS: &[&str] = &[
    "instagram.com",
    "tiktok.com",
    "vm.tiktok.com",
    "vt.tiktok.com",
    "youtube.com",
    "youtu.be",
];

/// Extracts the first supported media link from a message, plus any text
/// that follows it.
///
/// The returned URL is cleaned (query and fragment stripped, trailing
/// slash trimmed). Returns `None` when no supported link is present.
pub fn extract_supported_link(text: &str) -> Option<(String, Option<String>)> {
    let words: Vec<&str> = text.split_whitespace().collect();

    for (i, word) in words.iter().enumerate() {
        if !word.starts_with("http://") && !word.starts_with("https://") {
            continue;
        }
        if let Some(cleaned) = clean_supported_url(word) {
            let extra = if i + 1 < words.len() {
                let rest = words[i + 1..].join(" ");
                let rest = rest.trim();
                (!rest.is_empty()).then(|| rest.to_string())
            } else {
                None
            };
            return Some((cleaned, extra));
        }
    }
    None
}

/// Validates a URL against the supported host list and strips query
/// parameters and fragments. Returns `None` for unsupported hosts or
/// unparseable input.
pub fn clean_supported_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let host = url.host_str()?.to_ascii_lowercase();
    let base_host = host.strip_prefix("www.").unwrap_or(&host);
    if !SUPPORTED_HOSTS.contains(&base_host) {
        return None;
    }

    url.set_query(None);
    url.set_fragment(None);

    let mut cleaned = url.to_string();
    // Keep the slash on bare domains, trim it on real paths.
    if cleaned.ends_with('/') && url.path().len() > 1 {
        cleaned.pop();
    }
    Some(cleaned)
}

/// Whether a message looks like a failed attempt to share a link, used to
/// decide if an "unsupported link" reply is appropriate.
pub fn looks_like_link_attempt(text: &str) -> bool {
    text.contains("http")
        || ["instagram", "tiktok", "youtu"]
            .iter()
            .any(|h| text.contains(h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_link_and_text() {
        let (url, extra) =
            extract_supported_link("https://www.tiktok.com/@u/video/123?x=1 nice one").unwrap();
        assert_eq!(url, "https://www.tiktok.com/@u/video/123");
        assert_eq!(extra.as_deref(), Some("nice one"));
    }

    #[test]
    fn test_extract_link_no_extra() {
        let (url, extra) =
            extract_supported_link("check https://youtu.be/abc123").unwrap();
        assert_eq!(url, "https://youtu.be/abc123");
        assert!(extra.is_none());
    }

    #[test]
    fn test_unsupported_host_rejected() {
        assert!(extract_supported_link("https://example.com/watch/1").is_none());
    }

    #[test]
    fn test_missing_scheme_rejected() {
        assert!(extract_supported_link("instagram.com/reel/xyz").is_none());
    }

    #[test]
    fn test_fragment_and_query_stripped() {
        let cleaned =
            clean_supported_url("https://instagram.com/reel/xyz/?igsh=1#frag").unwrap();
        assert_eq!(cleaned, "https://instagram.com/reel/xyz");
    }

    #[test]
    fn test_link_attempt_heuristic() {
        assert!(looks_like_link_attempt("tiktok video here"));
        assert!(looks_like_link_attempt("http:/broken"));
        assert!(!looks_like_link_attempt("hello there"));
    }
}
