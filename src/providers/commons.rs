use reqwest::blocking::{Client, Response};
use serde_json::Value;
use tracing::debug;

use crate::classify::is_bitmap_url;
use crate::error::EnrichError;
use crate::http::{SEARCH_TIMEOUT, build_client, send_with_retries};
use crate::providers::{Lookup, Miss};

const COMMONS_API: &str = "https://commons.wikimedia.org/w/api.php";
const SEARCH_LIMIT: &str = "30";
const THUMB_WIDTH: &str = "1024";

pub trait CommonsClient: Send + Sync {
    /// First bitmap among the media repository's search hits for `name`.
    fn first_bitmap(&self, name: &str) -> Lookup<String>;
}

#[derive(Clone)]
pub struct CommonsHttpClient {
    client: Client,
}

impl CommonsHttpClient {
    pub fn new() -> Result<Self, EnrichError> {
        let client = build_client(SEARCH_TIMEOUT)
            .map_err(|err| EnrichError::CommonsHttp(err.to_string()))?;
        Ok(Self { client })
    }

    fn handle_status(response: Response) -> Result<Response, EnrichError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "Commons request failed".to_string());
        Err(EnrichError::CommonsStatus { status, message })
    }
}

impl CommonsClient for CommonsHttpClient {
    fn first_bitmap(&self, name: &str) -> Lookup<String> {
        let search = format!("{name} filetype:bitmap");
        let params = [
            ("action", "query"),
            ("generator", "search"),
            ("gsrsearch", search.as_str()),
            ("gsrlimit", SEARCH_LIMIT),
            ("prop", "imageinfo"),
            ("iiprop", "url"),
            ("iiurlwidth", THUMB_WIDTH),
            ("format", "json"),
            ("origin", "*"),
        ];
        debug!(query = %search, "commons.search");
        let response = send_with_retries(|| self.client.get(COMMONS_API).query(&params))
            .map_err(|err| EnrichError::CommonsHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let raw: Value = response
            .json()
            .map_err(|err| EnrichError::CommonsHttp(err.to_string()))?;
        extract_first_bitmap(&raw).ok_or(Miss::NoMatch)
    }
}

/// Walks `query.pages` in search-rank order and returns the first thumbnail or original
/// URL that is a bitmap.
pub fn extract_first_bitmap(raw: &Value) -> Option<String> {
    let pages = raw
        .get("query")
        .and_then(|v| v.get("pages"))
        .and_then(|v| v.as_object())?;
    let mut ranked: Vec<&Value> = pages.values().collect();
    ranked.sort_by_key(|page| page.get("index").and_then(|v| v.as_u64()).unwrap_or(u64::MAX));

    for page in ranked {
        let Some(info) = page
            .get("imageinfo")
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.first())
        else {
            continue;
        };
        for field in ["thumburl", "url"] {
            if let Some(url) = info.get(field).and_then(|v| v.as_str())
                && is_bitmap_url(url)
            {
                return Some(url.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn picks_lowest_index_bitmap() {
        let raw = json!({
            "query": {"pages": {
                "11": {"index": 2, "imageinfo": [{"url": "https://upload.wikimedia.org/b.jpg"}]},
                "12": {"index": 1, "imageinfo": [{"thumburl": "https://upload.wikimedia.org/thumb/a.jpg/1024px-a.jpg"}]}
            }}
        });
        assert_eq!(
            extract_first_bitmap(&raw).as_deref(),
            Some("https://upload.wikimedia.org/thumb/a.jpg/1024px-a.jpg")
        );
    }

    #[test]
    fn skips_vector_entries() {
        let raw = json!({
            "query": {"pages": {
                "1": {"index": 1, "imageinfo": [{"url": "https://upload.wikimedia.org/map.svg"}]},
                "2": {"index": 2, "imageinfo": []}
            }}
        });
        assert_eq!(extract_first_bitmap(&raw), None);
        assert_eq!(extract_first_bitmap(&json!({"batchcomplete": ""})), None);
    }
}
