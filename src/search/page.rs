//! Result-page fetching and text extraction

use lazy_static::lazy_static;
use regex::Regex;

/// Longest page extract kept for analysis context
const MAX_PAGE_TEXT: usize = 5000;

lazy_static! {
    static ref RE_SCRIPT: Regex = Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap();
    static ref RE_STYLE: Regex = Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap();
    static ref RE_COMMENTS: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    static ref RE_BLOCKS: Regex = Regex::new(r"(?i)</?(p|div|br|h[1-6]|li|tr)[^>]*>").unwrap();
    static ref RE_TAGS: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref RE_WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Fetch a page and return its cleaned text, capped at [`MAX_PAGE_TEXT`]
/// characters. Any failure returns `None`; page content is best-effort
/// enrichment, never required.
pub async fn fetch_text(client: &reqwest::Client, url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }

    let parsed = match url::Url::parse(url) {
        Ok(u) => u,
        Err(e) => {
            tracing::warn!(%url, error = %e, "invalid page URL");
            return None;
        }
    };
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return None;
    }

    let response = match client
        .get(parsed.as_str())
        .timeout(std::time::Duration::from_secs(10))
        .send()
        .await
    {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(%url, error = %e, "failed to fetch page");
            return None;
        }
    };

    if !response.status().is_success() {
        tracing::warn!(%url, status = %response.status(), "page fetch returned error status");
        return None;
    }

    let html = response.text().await.ok()?;
    let text = extract_text(&html);
    Some(text.chars().take(MAX_PAGE_TEXT).collect())
}

/// Strip markup down to readable text
pub fn extract_text(html: &str) -> String {
    let text = RE_SCRIPT.replace_all(html, "");
    let text = RE_STYLE.replace_all(&text, "");
    let text = RE_COMMENTS.replace_all(&text, "");
    let text = RE_BLOCKS.replace_all(&text, "\n");
    let text = RE_TAGS.replace_all(&text, "");

    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    RE_WHITESPACE.replace_all(&text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_strips_scripts_and_tags() {
        let html = r#"<html><head><style>body { color: red }</style>
            <script>alert("hi")</script></head>
            <body><h1>腾讯控股</h1><p>2023年营收 &amp; 利润增长</p></body></html>"#;

        let text = extract_text(html);
        assert!(text.contains("腾讯控股"));
        assert!(text.contains("营收 & 利润增长"));
        assert!(!text.contains("alert"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn test_extract_collapses_whitespace() {
        let text = extract_text("<p>a</p>\n\n\n<p>b</p>");
        assert_eq!(text, "a b");
    }
}
