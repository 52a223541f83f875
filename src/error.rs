use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum EnrichError {
    #[error("failed to read catalog at {0}")]
    CatalogRead(PathBuf),

    #[error("failed to parse catalog: {0}")]
    CatalogParse(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("invalid setting {name}: {message}")]
    InvalidSetting {
        name: &'static str,
        message: String,
    },

    #[error("invalid language code: {0}")]
    InvalidLanguage(String),

    #[error("Wikimedia Commons request failed: {0}")]
    CommonsHttp(String),

    #[error("Wikimedia Commons returned status {status}: {message}")]
    CommonsStatus { status: u16, message: String },

    #[error("GBIF request failed: {0}")]
    GbifHttp(String),

    #[error("GBIF returned status {status}: {message}")]
    GbifStatus { status: u16, message: String },

    #[error("Xeno-Canto request failed: {0}")]
    XenoCantoHttp(String),

    #[error("Xeno-Canto returned status {status}: {message}")]
    XenoCantoStatus { status: u16, message: String },

    #[error("Wikipedia request failed: {0}")]
    WikipediaHttp(String),

    #[error("Wikipedia returned status {status}: {message}")]
    WikipediaStatus { status: u16, message: String },

    #[error("download failed: {0}")]
    Download(String),

    #[error("download returned status {status}: {url}")]
    DownloadStatus { status: u16, url: String },

    #[error("download returned an empty body: {0}")]
    EmptyDownload(String),

    #[error("unexpected payload from {provider}: {message}")]
    Payload {
        provider: &'static str,
        message: String,
    },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
