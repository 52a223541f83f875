use reqwest::blocking::{Client, Response};
use serde_json::Value;
use tracing::debug;

use crate::error::EnrichError;
use crate::http::{OCCURRENCE_TIMEOUT, build_client, send_with_retries};
use crate::providers::{Lookup, Miss, non_empty};

const RECORDINGS_API: &str = "https://xeno-canto.org/api/2/recordings";

pub trait XenoCantoClient: Send + Sync {
    /// Sonogram image of the first recording matching `name`.
    fn sonogram_url(&self, name: &str) -> Lookup<String>;
}

#[derive(Clone)]
pub struct XenoCantoHttpClient {
    client: Client,
}

impl XenoCantoHttpClient {
    pub fn new() -> Result<Self, EnrichError> {
        let client = build_client(OCCURRENCE_TIMEOUT)
            .map_err(|err| EnrichError::XenoCantoHttp(err.to_string()))?;
        Ok(Self { client })
    }

    fn handle_status(response: Response) -> Result<Response, EnrichError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "Xeno-Canto request failed".to_string());
        Err(EnrichError::XenoCantoStatus { status, message })
    }
}

impl XenoCantoClient for XenoCantoHttpClient {
    fn sonogram_url(&self, name: &str) -> Lookup<String> {
        debug!(query = %name, "xeno_canto.recordings");
        let response =
            send_with_retries(|| self.client.get(RECORDINGS_API).query(&[("query", name)]))
                .map_err(|err| EnrichError::XenoCantoHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let raw: Value = response
            .json()
            .map_err(|err| EnrichError::XenoCantoHttp(err.to_string()))?;
        extract_sonogram_url(&raw).ok_or(Miss::NoMatch)
    }
}

/// `recordings[0].sono.med`, else `.small`; scheme-relative links get `https:`.
pub fn extract_sonogram_url(raw: &Value) -> Option<String> {
    let sono = raw
        .get("recordings")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|v| v.get("sono"))?;
    let url = non_empty(sono.get("med").and_then(|v| v.as_str()))
        .or_else(|| non_empty(sono.get("small").and_then(|v| v.as_str())))?;
    if url.starts_with("//") {
        return Some(format!("https:{url}"));
    }
    Some(url)
}
