use reqwest::blocking::{Client, Response};
use serde_json::Value;
use tracing::debug;

use crate::domain::Language;
use crate::error::EnrichError;
use crate::http::{LOOKUP_TIMEOUT, build_client, send_with_retries};
use crate::providers::{Lookup, Miss, non_empty};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSummary {
    pub title: String,
    pub text: String,
    pub page_url: String,
}

pub trait WikipediaClient: Send + Sync {
    /// Summary of the page titled exactly `title`.
    fn summary(&self, lang: &Language, title: &str) -> Lookup<PageSummary>;
    /// Title of the top full-text search hit for `query`.
    fn search_title(&self, lang: &Language, query: &str) -> Lookup<String>;
}

#[derive(Clone)]
pub struct WikipediaHttpClient {
    client: Client,
}

impl WikipediaHttpClient {
    pub fn new() -> Result<Self, EnrichError> {
        let client = build_client(LOOKUP_TIMEOUT)
            .map_err(|err| EnrichError::WikipediaHttp(err.to_string()))?;
        Ok(Self { client })
    }

    pub fn summary_url(lang: &Language, title: &str) -> String {
        format!(
            "https://{lang}.wikipedia.org/api/rest_v1/page/summary/{}?redirect=true",
            urlencoding::encode(title)
        )
    }

    fn api_url(lang: &Language) -> String {
        format!("https://{lang}.wikipedia.org/w/api.php")
    }

    fn handle_status(response: Response) -> Result<Response, EnrichError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "Wikipedia request failed".to_string());
        Err(EnrichError::WikipediaStatus { status, message })
    }
}

impl WikipediaClient for WikipediaHttpClient {
    fn summary(&self, lang: &Language, title: &str) -> Lookup<PageSummary> {
        let url = Self::summary_url(lang, title);
        debug!(lang = %lang, title = %title, "wikipedia.summary");
        let response = send_with_retries(|| self.client.get(&url))
            .map_err(|err| EnrichError::WikipediaHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let raw: Value = response
            .json()
            .map_err(|err| EnrichError::WikipediaHttp(err.to_string()))?;
        extract_summary(&raw, lang, title).ok_or(Miss::NoMatch)
    }

    fn search_title(&self, lang: &Language, query: &str) -> Lookup<String> {
        let url = Self::api_url(lang);
        let params = [
            ("action", "query"),
            ("list", "search"),
            ("format", "json"),
            ("srlimit", "1"),
            ("srprop", "snippet"),
            ("srsearch", query),
        ];
        debug!(lang = %lang, query = %query, "wikipedia.search");
        let response = send_with_retries(|| self.client.get(&url).query(&params))
            .map_err(|err| EnrichError::WikipediaHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let raw: Value = response
            .json()
            .map_err(|err| EnrichError::WikipediaHttp(err.to_string()))?;
        extract_search_title(&raw).ok_or(Miss::NoMatch)
    }
}

/// Long-form `extract`, else the short `description`; `None` when both are blank.
pub fn extract_summary(raw: &Value, lang: &Language, requested: &str) -> Option<PageSummary> {
    let text = non_empty(raw.get("extract").and_then(|v| v.as_str()))
        .or_else(|| non_empty(raw.get("description").and_then(|v| v.as_str())))?;
    let title = non_empty(raw.get("title").and_then(|v| v.as_str()))
        .unwrap_or_else(|| requested.to_string());
    let page_url = non_empty(
        raw.get("content_urls")
            .and_then(|v| v.get("desktop"))
            .and_then(|v| v.get("page"))
            .and_then(|v| v.as_str()),
    )
    .unwrap_or_else(|| {
        format!(
            "https://{lang}.wikipedia.org/wiki/{}",
            urlencoding::encode(&title.replace(' ', "_"))
        )
    });
    Some(PageSummary {
        title,
        text,
        page_url,
    })
}

pub fn extract_search_title(raw: &Value) -> Option<String> {
    non_empty(
        raw.get("query")
            .and_then(|v| v.get("search"))
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.first())
            .and_then(|v| v.get("title"))
            .and_then(|v| v.as_str()),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn summary_prefers_extract() {
        let lang: Language = "en".parse().unwrap();
        let raw = json!({
            "title": "Common blackbird",
            "description": "Species of bird",
            "extract": "The common blackbird is a species of true thrush.",
            "content_urls": {"desktop": {"page": "https://en.wikipedia.org/wiki/Common_blackbird"}}
        });
        let summary = extract_summary(&raw, &lang, "Turdus merula").unwrap();
        assert_eq!(summary.title, "Common blackbird");
        assert!(summary.text.starts_with("The common blackbird"));
        assert_eq!(summary.page_url, "https://en.wikipedia.org/wiki/Common_blackbird");
    }

    #[test]
    fn summary_falls_back_to_description() {
        let lang: Language = "es".parse().unwrap();
        let raw = json!({"extract": "  ", "description": "especie de ave"});
        let summary = extract_summary(&raw, &lang, "Turdus merula").unwrap();
        assert_eq!(summary.text, "especie de ave");
        assert_eq!(summary.page_url, "https://es.wikipedia.org/wiki/Turdus_merula");
        assert_eq!(extract_summary(&json!({"title": "X"}), &lang, "X"), None);
    }

    #[test]
    fn search_takes_top_hit() {
        let raw = json!({"query": {"search": [{"title": "Turdus merula"}, {"title": "Turdidae"}]}});
        assert_eq!(extract_search_title(&raw).as_deref(), Some("Turdus merula"));
        assert_eq!(extract_search_title(&json!({"query": {"search": []}})), None);
    }
}
