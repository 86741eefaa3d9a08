//! Turns a web page into a [`NewDocument`] for URL ingestion.

use anyhow::{anyhow, Result};
use reqwest::{header, Client, Url};
use scraper::{Html, Selector};
use smartkeep_core::NewDocument;
use std::time::Duration;

const MAX_PAGE_BYTES: usize = 2 * 1024 * 1024;

pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Fetch `url` and extract its title and paragraph text.
    pub async fn fetch(&self, url: &Url) -> Result<NewDocument> {
        let resp = self.client.get(url.clone()).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("{url} answered {}", resp.status()));
        }
        if let Some(ct) = resp.headers().get(header::CONTENT_TYPE) {
            if let Ok(v) = ct.to_str() {
                if !v.starts_with("text/html") {
                    return Err(anyhow!("{url} is not an HTML page ({v})"));
                }
            }
        }
        let bytes = resp.bytes().await?;
        if bytes.len() > MAX_PAGE_BYTES {
            return Err(anyhow!("{url} is larger than {MAX_PAGE_BYTES} bytes"));
        }
        let body = String::from_utf8_lossy(&bytes);
        Ok(extract_document(&body, url))
    }
}

/// Parse and validate a submitted URL. Only http(s) is accepted.
pub fn parse_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(anyhow!("unsupported url `{raw}`"));
    }
    Ok(url)
}

/// Title from `<title>`, content from every `<p>` joined by newlines, domain
/// from the URL host and port.
pub fn extract_document(html: &str, url: &Url) -> NewDocument {
    let sel_title = Selector::parse("title").unwrap();
    let sel_p = Selector::parse("p").unwrap();

    let doc = Html::parse_document(html);
    let title = doc
        .select(&sel_title)
        .next()
        .map(|n| n.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "No Title".to_string());
    let content = doc
        .select(&sel_p)
        .map(|p| p.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    NewDocument {
        title,
        content,
        domain: domain_of(url),
        source_url: Some(url.to_string()),
    }
}

/// Host plus any non-default port, e.g. `example.com:8080`.
fn domain_of(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_keeps_explicit_port() {
        let html = "<title>t</title><p>body</p>";
        let doc = extract_document(html, &parse_url("http://x.test:8080/page").unwrap());
        assert_eq!(doc.domain.as_deref(), Some("x.test:8080"));
        // default ports are normalized away by the URL parser
        let doc = extract_document(html, &parse_url("https://x.test:443/").unwrap());
        assert_eq!(doc.domain.as_deref(), Some("x.test"));
    }

    #[test]
    fn extracts_title_paragraphs_and_domain() {
        let html = r#"<html><head><title> Ferris Facts </title></head>
            <body><h1>Header</h1><p>Crabs are <b>great</b>.</p><div>skip me</div><p>  </p><p>Rust too.</p></body></html>"#;
        let url = parse_url("https://rust.example.org/crabs?x=1").unwrap();
        let doc = extract_document(html, &url);
        assert_eq!(doc.title, "Ferris Facts");
        assert_eq!(doc.content, "Crabs are great.\nRust too.");
        assert_eq!(doc.domain.as_deref(), Some("rust.example.org"));
        assert_eq!(doc.source_url.as_deref(), Some("https://rust.example.org/crabs?x=1"));
    }

    #[test]
    fn missing_title_falls_back() {
        let url = parse_url("http://example.com").unwrap();
        let doc = extract_document("<p>body only</p>", &url);
        assert_eq!(doc.title, "No Title");
        assert_eq!(doc.content, "body only");
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(parse_url("ftp://example.com/file").is_err());
        assert!(parse_url("not a url").is_err());
        assert!(parse_url("https://example.com/page").is_ok());
    }
}
