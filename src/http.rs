use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::EnrichError;

pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(20);
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(25);
pub const OCCURRENCE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

pub fn user_agent() -> String {
    format!("taxon-enrich/{}", env!("CARGO_PKG_VERSION"))
}

pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&user_agent()) {
        headers.insert(USER_AGENT, value);
    }
    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
}

/// Sends the request built by `make_req`, retrying transient gateway and connect failures.
pub fn send_with_retries<F>(mut make_req: F) -> Result<Response, reqwest::Error>
where
    F: FnMut() -> RequestBuilder,
{
    const MAX_RETRIES: usize = 2;
    const BASE_DELAY_MS: u64 = 250;
    let mut attempt = 0usize;
    loop {
        match make_req().send() {
            Ok(resp) => {
                let status = resp.status().as_u16();
                if attempt < MAX_RETRIES && is_retryable_status(status) {
                    thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                    attempt += 1;
                    continue;
                }
                return Ok(resp);
            }
            Err(err) => {
                if attempt < MAX_RETRIES && err.is_connect() {
                    thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                    attempt += 1;
                    continue;
                }
                return Err(err);
            }
        }
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 502 | 503 | 504)
}

/// Fetches side-file bytes (cover images, spectrograms).
pub trait Downloader: Send + Sync {
    fn download(&self, url: &str) -> Result<Vec<u8>, EnrichError>;
}

#[derive(Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new() -> Result<Self, EnrichError> {
        let client =
            build_client(DOWNLOAD_TIMEOUT).map_err(|err| EnrichError::Download(err.to_string()))?;
        Ok(Self { client })
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str) -> Result<Vec<u8>, EnrichError> {
        let response = send_with_retries(|| self.client.get(url))
            .map_err(|err| EnrichError::Download(err.to_string()))?;
        if !response.status().is_success() {
            return Err(EnrichError::DownloadStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        let bytes = response
            .bytes()
            .map_err(|err| EnrichError::Download(err.to_string()))?;
        if bytes.is_empty() {
            return Err(EnrichError::EmptyDownload(url.to_string()));
        }
        Ok(bytes.to_vec())
    }
}
