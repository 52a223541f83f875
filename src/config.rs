use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::distribution::DEFAULT_MAX_OCCURRENCES;
use crate::domain::{AssetKind, Language, default_languages};
use crate::error::EnrichError;

pub const DEFAULT_CONFIG_FILE: &str = "taxon-enrich.json";
pub const DEFAULT_ASSET_PREFIX: &str = "assets/aves";
pub const DEFAULT_DELAY_SECS: f64 = 0.8;

/// Optional JSON run configuration. Every key may be overridden on the command line.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub db: Option<String>,
    #[serde(default)]
    pub out_db: Option<String>,
    #[serde(default)]
    pub base_dir: Option<String>,
    #[serde(default)]
    pub asset_prefix: Option<String>,
    #[serde(default)]
    pub delay: Option<f64>,
    #[serde(default)]
    pub max_occ: Option<usize>,
    #[serde(default)]
    pub overwrite: Option<bool>,
    #[serde(default)]
    pub only: Option<String>,
    #[serde(default)]
    pub assets: Option<Vec<AssetKind>>,
    #[serde(default)]
    pub languages: Option<Vec<String>>,
}

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub db: Option<String>,
    pub out_db: Option<String>,
    pub base_dir: Option<String>,
    pub asset_prefix: Option<String>,
    pub delay: Option<f64>,
    pub max_occ: Option<usize>,
    pub overwrite: bool,
    pub only: Option<String>,
    pub assets: Option<Vec<AssetKind>>,
    pub languages: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub catalog_path: Utf8PathBuf,
    pub output_path: Utf8PathBuf,
    pub base_dir: Utf8PathBuf,
    pub asset_prefix: String,
    pub delay: Duration,
    pub max_occurrences: usize,
    pub overwrite: bool,
    pub only: Option<String>,
    pub assets: Vec<AssetKind>,
    pub languages: Vec<Language>,
}

impl RunOptions {
    pub fn wants(&self, kind: AssetKind) -> bool {
        self.assets.contains(&kind)
    }

    /// Exact, case-insensitive match against the `--only` filter.
    pub fn selects(&self, scientific_name: &str) -> bool {
        match &self.only {
            Some(only) => only.trim().to_lowercase() == scientific_name.trim().to_lowercase(),
            None => true,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `path`, or `taxon-enrich.json` when present in the working directory.
    pub fn load(path: Option<&str>) -> Result<Config, EnrichError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| EnrichError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| EnrichError::ConfigParse(err.to_string()))
    }

    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<RunOptions, EnrichError> {
        let config = Self::load(path)?;
        Self::resolve_config(config, overrides)
    }

    pub fn resolve_config(
        config: Config,
        overrides: ConfigOverrides,
    ) -> Result<RunOptions, EnrichError> {
        let catalog_path = overrides
            .db
            .or(config.db)
            .map(Utf8PathBuf::from)
            .ok_or(EnrichError::MissingSetting("db"))?;
        let output_path = overrides
            .out_db
            .or(config.out_db)
            .map(Utf8PathBuf::from)
            .unwrap_or_else(|| catalog_path.clone());
        let base_dir = overrides
            .base_dir
            .or(config.base_dir)
            .map(Utf8PathBuf::from)
            .ok_or(EnrichError::MissingSetting("base_dir"))?;

        let delay = overrides
            .delay
            .or(config.delay)
            .unwrap_or(DEFAULT_DELAY_SECS);
        if !delay.is_finite() || delay < 0.0 {
            return Err(EnrichError::InvalidSetting {
                name: "delay",
                message: format!("expected a non-negative number of seconds, got {delay}"),
            });
        }

        let assets = overrides
            .assets
            .or(config.assets)
            .filter(|assets| !assets.is_empty())
            .unwrap_or_else(|| AssetKind::ALL.to_vec());

        let languages = match overrides.languages.or(config.languages) {
            Some(codes) if !codes.is_empty() => codes
                .iter()
                .map(|code| code.parse())
                .collect::<Result<Vec<Language>, EnrichError>>()?,
            _ => default_languages(),
        };
        let mut unique = Vec::with_capacity(languages.len());
        for lang in languages {
            if !unique.contains(&lang) {
                unique.push(lang);
            }
        }

        Ok(RunOptions {
            catalog_path,
            output_path,
            base_dir,
            asset_prefix: overrides
                .asset_prefix
                .or(config.asset_prefix)
                .unwrap_or_else(|| DEFAULT_ASSET_PREFIX.to_string()),
            delay: Duration::from_secs_f64(delay),
            max_occurrences: overrides
                .max_occ
                .or(config.max_occ)
                .unwrap_or(DEFAULT_MAX_OCCURRENCES),
            overwrite: overrides.overwrite || config.overwrite.unwrap_or(false),
            only: overrides
                .only
                .or(config.only)
                .filter(|value| !value.trim().is_empty()),
            assets,
            languages: unique,
        })
    }
}
