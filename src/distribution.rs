use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::TaxonKey;
use crate::providers::Miss;
use crate::providers::gbif::{GbifClient, OccurrenceRecord};

pub const PAGE_SIZE: usize = 300;
pub const DEFAULT_MAX_OCCURRENCES: usize = 1200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: Point,
    pub properties: OccurrenceProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceProperties {
    pub key: Option<i64>,
    pub country: Option<String>,
    pub event_date: Value,
    pub basis_of_record: Option<String>,
}

impl Feature {
    pub fn point(longitude: f64, latitude: f64, properties: OccurrenceProperties) -> Self {
        Self {
            kind: "Feature".to_string(),
            geometry: Point {
                kind: "Point".to_string(),
                coordinates: [longitude, latitude],
            },
            properties,
        }
    }

    /// Point feature for a record, `None` when it lacks either coordinate.
    pub fn from_record(record: &OccurrenceRecord) -> Option<Self> {
        let (longitude, latitude) = record.coordinates()?;
        let event_date = match (&record.event_date, record.year) {
            (Some(date), _) if !date.is_empty() => Value::String(date.clone()),
            (_, Some(year)) => Value::from(year),
            _ => Value::Null,
        };
        Some(Self::point(
            longitude,
            latitude,
            OccurrenceProperties {
                key: record.key,
                country: record.country.clone(),
                event_date,
                basis_of_record: record.basis_of_record.clone(),
            },
        ))
    }
}

impl FeatureCollection {
    /// Builds the collection; `bbox` is set exactly when there is at least one feature.
    pub fn new(features: Vec<Feature>) -> Self {
        let bbox = bounding_box(&features);
        Self {
            kind: "FeatureCollection".to_string(),
            features,
            bbox,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// `[min_lon, min_lat, max_lon, max_lat]`
pub fn bounding_box(features: &[Feature]) -> Option<[f64; 4]> {
    let first = features.first()?.geometry.coordinates;
    let init = [first[0], first[1], first[0], first[1]];
    Some(features.iter().fold(init, |acc, feature| {
        let [lon, lat] = feature.geometry.coordinates;
        [acc[0].min(lon), acc[1].min(lat), acc[2].max(lon), acc[3].max(lat)]
    }))
}

/// Pages through geolocated occurrences until an empty page, a short page, or `max_records`.
///
/// The short-page test compares the raw page length against the requested size; records
/// without coordinates are dropped afterwards and do not influence it.
pub fn aggregate_occurrences<G: GbifClient + ?Sized>(
    gbif: &G,
    key: TaxonKey,
    max_records: usize,
    page_size: usize,
) -> FeatureCollection {
    let page_size = page_size.max(1);
    let mut features = Vec::new();
    let mut offset = 0usize;

    while offset < max_records {
        let requested = page_size.min(max_records - offset);
        let page = match gbif.occurrence_page(key, offset, requested) {
            Ok(page) => page,
            Err(Miss::NoMatch) => break,
            Err(Miss::Provider(err)) => {
                warn!(taxon_key = %key, offset, error = %err, "occurrence page failed");
                break;
            }
        };
        if page.is_empty() {
            break;
        }
        features.extend(page.iter().filter_map(Feature::from_record));
        offset += page_size;
        if page.len() < requested {
            break;
        }
    }

    debug!(taxon_key = %key, points = features.len(), "occurrences aggregated");
    FeatureCollection::new(features)
}
