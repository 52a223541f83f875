use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::error::EnrichError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Spectrogram,
    Description,
    Distribution,
}

impl AssetKind {
    pub const ALL: [AssetKind; 4] = [
        AssetKind::Image,
        AssetKind::Spectrogram,
        AssetKind::Description,
        AssetKind::Distribution,
    ];
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Image => write!(f, "image"),
            AssetKind::Spectrogram => write!(f, "spectrogram"),
            AssetKind::Description => write!(f, "description"),
            AssetKind::Distribution => write!(f, "distribution"),
        }
    }
}

/// Wikipedia language edition code, e.g. `es` or `en`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Language(String);

impl Language {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Language {
    type Err = EnrichError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        let mut segments = normalized.split('-');
        let primary_ok = segments
            .next()
            .is_some_and(|head| head.len() >= 2 && head.chars().all(|ch| ch.is_ascii_lowercase()));
        let rest_ok = segments
            .all(|part| !part.is_empty() && part.chars().all(|ch| ch.is_ascii_lowercase()));
        if !(primary_ok && rest_ok) {
            return Err(EnrichError::InvalidLanguage(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

impl TryFrom<String> for Language {
    type Error = EnrichError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Language> for String {
    fn from(value: Language) -> Self {
        value.0
    }
}

pub fn default_languages() -> Vec<Language> {
    vec![Language("es".to_string()), Language("en".to_string())]
}

/// GBIF numeric taxon identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaxonKey(pub u64);

impl fmt::Display for TaxonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    WikimediaCommons,
    Gbif,
    XenoCanto,
    Wikipedia,
}

impl Provider {
    /// Name recorded in `sources.attribution[].source`.
    pub fn attribution_name(&self) -> &'static str {
        match self {
            Provider::WikimediaCommons => "Wikimedia Commons",
            Provider::Gbif => "GBIF",
            Provider::XenoCanto => "Xeno-Canto",
            Provider::Wikipedia => "Wikipedia",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::WikimediaCommons => write!(f, "commons"),
            Provider::Gbif => write!(f, "gbif"),
            Provider::XenoCanto => write!(f, "xeno-canto"),
            Provider::Wikipedia => write!(f, "wikipedia"),
        }
    }
}

pub fn slugify(text: &str) -> String {
    let ascii: String = text.nfkd().filter(|ch| ch.is_ascii()).collect();
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_sep = false;
    for ch in ascii.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(ch);
        } else {
            pending_sep = true;
        }
    }
    slug
}
