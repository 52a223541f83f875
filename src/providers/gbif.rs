use std::sync::LazyLock;

use regex::Regex;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::classify::is_bitmap_url;
use crate::domain::TaxonKey;
use crate::error::EnrichError;
use crate::http::{LOOKUP_TIMEOUT, OCCURRENCE_TIMEOUT, build_client, send_with_retries};
use crate::providers::{Lookup, Miss};

const GBIF_BASE: &str = "https://api.gbif.org/v1";
const IMAGE_SCAN_LIMIT: &str = "200";

static MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static LOOSE_BINOMIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z][a-zA-Z\-]+)\s+([a-z\-]+)").unwrap());

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceRecord {
    #[serde(default)]
    pub key: Option<i64>,
    #[serde(default)]
    pub decimal_latitude: Option<f64>,
    #[serde(default)]
    pub decimal_longitude: Option<f64>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub event_date: Option<String>,
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default)]
    pub basis_of_record: Option<String>,
    #[serde(default)]
    pub media: Vec<OccurrenceMedia>,
}

impl OccurrenceRecord {
    /// `(longitude, latitude)` when both are present.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.decimal_longitude?, self.decimal_latitude?))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OccurrenceMedia {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub references: Option<String>,
}

pub trait GbifClient: Send + Sync {
    fn species_key(&self, name: &str) -> Lookup<TaxonKey>;
    /// First bitmap still image attached to a geolocated occurrence of the taxon.
    fn occurrence_image(&self, key: TaxonKey) -> Lookup<String>;
    /// One page of geolocated occurrences. The returned vector keeps the raw page length.
    fn occurrence_page(
        &self,
        key: TaxonKey,
        offset: usize,
        limit: usize,
    ) -> Lookup<Vec<OccurrenceRecord>>;
}

#[derive(Clone)]
pub struct GbifHttpClient {
    client: Client,
}

impl GbifHttpClient {
    pub fn new() -> Result<Self, EnrichError> {
        let client = build_client(OCCURRENCE_TIMEOUT)
            .map_err(|err| EnrichError::GbifHttp(err.to_string()))?;
        Ok(Self { client })
    }

    pub fn occurrence_search_url(key: TaxonKey) -> String {
        format!("{GBIF_BASE}/occurrence/search?taxonKey={key}&hasCoordinate=true")
    }

    fn handle_status(response: Response) -> Result<Response, EnrichError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "GBIF request failed".to_string());
        Err(EnrichError::GbifStatus { status, message })
    }

    fn get_json(
        &self,
        path: &str,
        params: &[(&str, &str)],
        timeout: std::time::Duration,
    ) -> Result<Value, EnrichError> {
        let url = format!("{GBIF_BASE}/{path}");
        let response =
            send_with_retries(|| self.client.get(&url).query(params).timeout(timeout))
                .map_err(|err| EnrichError::GbifHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        response
            .json()
            .map_err(|err| EnrichError::GbifHttp(err.to_string()))
    }
}

impl GbifClient for GbifHttpClient {
    fn species_key(&self, name: &str) -> Lookup<TaxonKey> {
        let query = lookup_name(name);
        if query.is_empty() {
            return Err(Miss::NoMatch);
        }
        debug!(query = %query, "gbif.species.match");
        match self.get_json("species/match", &[("name", query.as_str())], LOOKUP_TIMEOUT) {
            Ok(raw) => {
                if let Some(key) = parse_match_key(&raw) {
                    return Ok(key);
                }
            }
            Err(err) => debug!(error = %err, "gbif.species.match failed"),
        }
        debug!(query = %query, "gbif.species.search");
        let raw = self.get_json(
            "species/search",
            &[("q", query.as_str()), ("limit", "1")],
            LOOKUP_TIMEOUT,
        )?;
        parse_search_key(&raw).ok_or(Miss::NoMatch)
    }

    fn occurrence_image(&self, key: TaxonKey) -> Lookup<String> {
        let taxon = key.to_string();
        let raw = self.get_json(
            "occurrence/search",
            &[
                ("taxonKey", taxon.as_str()),
                ("mediaType", "StillImage"),
                ("hasCoordinate", "true"),
                ("limit", IMAGE_SCAN_LIMIT),
            ],
            OCCURRENCE_TIMEOUT,
        )?;
        let records = parse_occurrence_page(&raw)?;
        first_occurrence_image(&records).ok_or(Miss::NoMatch)
    }

    fn occurrence_page(
        &self,
        key: TaxonKey,
        offset: usize,
        limit: usize,
    ) -> Lookup<Vec<OccurrenceRecord>> {
        let taxon = key.to_string();
        let limit = limit.to_string();
        let offset = offset.to_string();
        debug!(taxon_key = %taxon, offset = %offset, "gbif.occurrence.page");
        let raw = self.get_json(
            "occurrence/search",
            &[
                ("taxonKey", taxon.as_str()),
                ("hasCoordinate", "true"),
                ("limit", limit.as_str()),
                ("offset", offset.as_str()),
            ],
            OCCURRENCE_TIMEOUT,
        )?;
        Ok(parse_occurrence_page(&raw)?)
    }
}

/// Strips markup and underscores, then narrows to a `Genus species` pair when one is present.
pub fn lookup_name(name: &str) -> String {
    let cleaned = MARKUP.replace_all(name, "").replace('_', " ");
    let cleaned = WHITESPACE.replace_all(&cleaned, " ").trim().to_string();
    match LOOSE_BINOMIAL.captures(&cleaned) {
        Some(caps) => format!("{} {}", &caps[1], &caps[2]),
        None => cleaned,
    }
}

pub fn parse_match_key(raw: &Value) -> Option<TaxonKey> {
    ["usageKey", "speciesKey", "acceptedUsageKey"]
        .iter()
        .find_map(|field| raw.get(*field).and_then(|v| v.as_u64()).filter(|key| *key > 0))
        .map(TaxonKey)
}

pub fn parse_search_key(raw: &Value) -> Option<TaxonKey> {
    raw.get("results")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|v| v.get("key"))
        .and_then(|v| v.as_u64())
        .map(TaxonKey)
}

/// Decodes `results`; malformed entries are kept as empty records so the page length
/// still reflects what the server returned.
pub fn parse_occurrence_page(raw: &Value) -> Result<Vec<OccurrenceRecord>, EnrichError> {
    let results = raw
        .get("results")
        .and_then(|v| v.as_array())
        .ok_or_else(|| EnrichError::Payload {
            provider: "gbif",
            message: "occurrence search without results array".to_string(),
        })?;
    Ok(results
        .iter()
        .map(|item| serde_json::from_value(item.clone()).unwrap_or_default())
        .collect())
}

pub fn first_occurrence_image(records: &[OccurrenceRecord]) -> Option<String> {
    records
        .iter()
        .flat_map(|record| record.media.iter())
        .filter(|media| {
            media
                .kind
                .as_deref()
                .map(|kind| kind == "StillImage")
                .unwrap_or(true)
        })
        .flat_map(|media| [media.identifier.as_deref(), media.references.as_deref()])
        .flatten()
        .find(|url| is_bitmap_url(url))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn lookup_name_cleans_markup() {
        assert_eq!(lookup_name("<i>Turdus_merula</i> Linnaeus"), "Turdus merula");
        assert_eq!(lookup_name("  passer  "), "passer");
    }

    #[test]
    fn match_key_fallbacks() {
        assert_eq!(parse_match_key(&json!({"usageKey": 2490719})), Some(TaxonKey(2490719)));
        assert_eq!(parse_match_key(&json!({"acceptedUsageKey": 7})), Some(TaxonKey(7)));
        assert_eq!(parse_match_key(&json!({"matchType": "NONE"})), None);
    }

    #[test]
    fn occurrence_image_skips_sounds_and_vectors() {
        let raw = json!({"results": [
            {"media": [{"type": "Sound", "identifier": "https://x.org/a.png"}]},
            {"media": [{"type": "StillImage", "identifier": "https://x.org/a.svg",
                        "references": "https://x.org/b.jpeg"}]}
        ]});
        let records = parse_occurrence_page(&raw).unwrap();
        assert_eq!(
            first_occurrence_image(&records).as_deref(),
            Some("https://x.org/b.jpeg")
        );
    }
}
