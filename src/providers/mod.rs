//! Adapters over the upstream data providers.
//!
//! Every adapter call yields a [`Lookup`]: either a value or a [`Miss`]. A miss is never
//! fatal; the resolver moves on to the next provider or candidate.

use std::fmt;

use crate::domain::Provider;
use crate::error::EnrichError;

pub mod commons;
pub mod gbif;
pub mod wikipedia;
pub mod xeno_canto;

#[derive(Debug)]
pub enum Miss {
    /// The provider answered but had nothing usable.
    NoMatch,
    /// Transport failure, non-success status or malformed payload.
    Provider(EnrichError),
}

impl fmt::Display for Miss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Miss::NoMatch => write!(f, "no result"),
            Miss::Provider(err) => write!(f, "{err}"),
        }
    }
}

impl From<EnrichError> for Miss {
    fn from(value: EnrichError) -> Self {
        Miss::Provider(value)
    }
}

pub type Lookup<T> = Result<T, Miss>;

/// A usable asset location together with the provider that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub value: String,
    pub provider: Provider,
}

impl ResolvedAsset {
    pub fn new(value: impl Into<String>, provider: Provider) -> Self {
        Self {
            value: value.into(),
            provider,
        }
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}
