//! The species catalog document.
//!
//! Records are kept as ordered JSON objects and read through accessors, so keys this crate
//! never touches keep their values and positions across a rewrite. A `null` anywhere reads
//! the same as an absent key.

use std::fs;

use camino::Utf8Path;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value, json};

use crate::domain::{Language, slugify};
use crate::error::EnrichError;
use crate::store::write_bytes_atomic;

const SPECIES: &str = "species";
const ASSETS: &str = "assets";
const IMAGE_COVER: &str = "image_cover";
const SPECTROGRAMS: &str = "spectrograms";
const DISTRIBUTION: &str = "distribution_geojson";
const DESCRIPTION: &str = "description";
const SOURCES: &str = "sources";
const ATTRIBUTION: &str = "attribution";

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub species: Vec<SpeciesRecord>,
    /// Top-level document; the `species` slot is a placeholder filled on serialization.
    root: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeciesRecord {
    fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Attribution {
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
    pub url: String,
}

impl From<Map<String, Value>> for SpeciesRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl SpeciesRecord {
    /// Any field of the record, `None` when absent or `null`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|value| !value.is_null())
    }

    pub fn species_id(&self) -> Option<&str> {
        non_blank(self.fields.get("species_id"))
    }

    pub fn scientific_name(&self) -> &str {
        self.fields
            .get("scientific_name")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn label(&self) -> &str {
        self.scientific_name().trim()
    }

    /// Stable folder name: the explicit id, else a slug of the scientific name.
    pub fn resolved_id(&self) -> String {
        match self.species_id() {
            Some(id) => id.to_string(),
            None => slugify(self.label()),
        }
    }

    pub fn image_cover(&self) -> Option<&str> {
        non_blank(self.asset(IMAGE_COVER))
    }

    pub fn first_spectrogram(&self) -> Option<&str> {
        non_blank(
            self.asset(SPECTROGRAMS)
                .and_then(Value::as_array)
                .and_then(|items| items.first()),
        )
    }

    pub fn distribution_geojson(&self) -> Option<&str> {
        non_blank(self.asset(DISTRIBUTION))
    }

    pub fn set_image_cover(&mut self, reference: String) {
        self.edit_assets(|assets| {
            assets.insert(IMAGE_COVER.to_string(), Value::String(reference));
        });
    }

    /// Replaces the first spectrogram reference, keeping any further entries.
    pub fn set_first_spectrogram(&mut self, reference: String) {
        self.edit_assets(|assets| {
            let slot = assets.entry(SPECTROGRAMS).or_insert(Value::Null);
            let mut items = match slot.take() {
                Value::Array(items) => items,
                _ => Vec::new(),
            };
            match items.first_mut() {
                Some(first) => *first = Value::String(reference),
                None => items.push(Value::String(reference)),
            }
            *slot = Value::Array(items);
        });
    }

    pub fn set_distribution_geojson(&mut self, reference: String) {
        self.edit_assets(|assets| {
            assets.insert(DISTRIBUTION.to_string(), Value::String(reference));
        });
    }

    pub fn description_for(&self, lang: &Language) -> Option<&str> {
        non_blank(
            self.fields
                .get(DESCRIPTION)
                .and_then(|texts| texts.get(lang.as_str())),
        )
    }

    /// Stores a description unless `text` is blank. Returns whether anything was written.
    pub fn set_description(&mut self, lang: &Language, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        edit_object(self.slot(DESCRIPTION), |texts| {
            texts.insert(lang.as_str().to_string(), Value::String(text.to_string()));
        });
        true
    }

    pub fn attribute(&mut self, kind: &str, source: &str, url: &str) {
        let entry = json!({ "type": kind, "source": source, "url": url });
        edit_object(self.slot(SOURCES), |sources| {
            let slot = sources.entry(ATTRIBUTION).or_insert(Value::Null);
            let mut entries = match slot.take() {
                Value::Array(entries) => entries,
                _ => Vec::new(),
            };
            entries.push(entry);
            *slot = Value::Array(entries);
        });
    }

    /// Well-formed attribution entries, in recorded order.
    pub fn attributions(&self) -> Vec<Attribution> {
        self.fields
            .get(SOURCES)
            .and_then(|sources| sources.get(ATTRIBUTION))
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
            .collect()
    }

    fn asset(&self, key: &str) -> Option<&Value> {
        self.fields.get(ASSETS).and_then(|assets| assets.get(key))
    }

    fn slot(&mut self, key: &str) -> &mut Value {
        self.fields.entry(key).or_insert(Value::Null)
    }

    fn edit_assets(&mut self, edit: impl FnOnce(&mut Map<String, Value>)) {
        edit_object(self.slot(ASSETS), edit);
    }
}

/// Runs `edit` on the object in `slot`, replacing a `null` or non-object value first.
fn edit_object(slot: &mut Value, edit: impl FnOnce(&mut Map<String, Value>)) {
    let mut object = match slot.take() {
        Value::Object(object) => object,
        _ => Map::new(),
    };
    edit(&mut object);
    *slot = Value::Object(object);
}

fn non_blank(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

impl Catalog {
    pub fn load(path: &Utf8Path) -> Result<Self, EnrichError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|_| EnrichError::CatalogRead(path.as_std_path().to_path_buf()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, EnrichError> {
        let document: Value = serde_json::from_str(content)
            .map_err(|err| EnrichError::CatalogParse(err.to_string()))?;
        Self::from_document(document)
    }

    pub fn from_document(document: Value) -> Result<Self, EnrichError> {
        let Value::Object(mut root) = document else {
            return Err(EnrichError::CatalogParse(
                "catalog root is not a JSON object".to_string(),
            ));
        };
        let species = match root.get_mut(SPECIES).map(Value::take) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| match item {
                    Value::Object(fields) => Ok(SpeciesRecord::from(fields)),
                    _ => Err(EnrichError::CatalogParse(format!(
                        "species[{index}] is not a JSON object"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(EnrichError::CatalogParse(
                    "`species` is not an array".to_string(),
                ));
            }
        };
        root.entry(SPECIES).or_insert(Value::Null);
        Ok(Self { species, root })
    }

    /// Top-level fields other than `species`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        if key == SPECIES {
            return None;
        }
        self.root.get(key).filter(|value| !value.is_null())
    }

    pub fn to_document(&self) -> Value {
        let mut root = self.root.clone();
        let species = self
            .species
            .iter()
            .map(|record| Value::Object(record.fields.clone()))
            .collect();
        root.insert(SPECIES.to_string(), Value::Array(species));
        Value::Object(root)
    }

    /// Replaces the whole document at `path` atomically.
    pub fn persist(&self, path: &Utf8Path) -> Result<(), EnrichError> {
        let mut content = serde_json::to_vec_pretty(&self.to_document())
            .map_err(|err| EnrichError::Filesystem(err.to_string()))?;
        content.push(b'\n');
        write_bytes_atomic(path, &content)
    }
}

impl Serialize for Catalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_document().serialize(serializer)
    }
}
