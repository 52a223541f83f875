use tracing::{debug, warn};

use crate::domain::{Language, Provider, TaxonKey};
use crate::providers::commons::CommonsClient;
use crate::providers::gbif::GbifClient;
use crate::providers::wikipedia::{PageSummary, WikipediaClient};
use crate::providers::xeno_canto::XenoCantoClient;
use crate::providers::{Lookup, Miss, ResolvedAsset};
use crate::query::candidate_queries;

/// Walks each asset's provider chain and stops at the first usable answer.
#[derive(Clone)]
pub struct Resolver<C: CommonsClient, G: GbifClient, X: XenoCantoClient, W: WikipediaClient> {
    commons: C,
    gbif: G,
    xeno_canto: X,
    wikipedia: W,
}

impl<C: CommonsClient, G: GbifClient, X: XenoCantoClient, W: WikipediaClient> Resolver<C, G, X, W> {
    pub fn new(commons: C, gbif: G, xeno_canto: X, wikipedia: W) -> Self {
        Self {
            commons,
            gbif,
            xeno_canto,
            wikipedia,
        }
    }

    pub fn gbif(&self) -> &G {
        &self.gbif
    }

    /// Media repository search first, then a still image attached to an occurrence.
    pub fn resolve_image(&self, label: &str) -> Option<ResolvedAsset> {
        let query = candidate_queries(label)
            .into_iter()
            .next()
            .unwrap_or_else(|| label.trim().to_string());
        if let Some(url) = settle(
            self.commons.first_bitmap(&query),
            Provider::WikimediaCommons,
            "image",
        ) {
            return Some(ResolvedAsset::new(url, Provider::WikimediaCommons));
        }
        let key = self.resolve_taxon_key(label)?;
        settle(self.gbif.occurrence_image(key), Provider::Gbif, "image")
            .map(|url| ResolvedAsset::new(url, Provider::Gbif))
    }

    pub fn resolve_taxon_key(&self, label: &str) -> Option<TaxonKey> {
        settle(self.gbif.species_key(label), Provider::Gbif, "taxon key")
    }

    pub fn resolve_spectrogram(&self, label: &str) -> Option<ResolvedAsset> {
        settle(
            self.xeno_canto.sonogram_url(label.trim()),
            Provider::XenoCanto,
            "spectrogram",
        )
        .map(|url| ResolvedAsset::new(url, Provider::XenoCanto))
    }

    /// Description for one language. Every candidate is tried as an exact title before any
    /// search is issued.
    pub fn resolve_description(&self, label: &str, lang: &Language) -> Option<PageSummary> {
        self.describe(&candidate_queries(label), lang)
    }

    fn describe(&self, candidates: &[String], lang: &Language) -> Option<PageSummary> {
        for candidate in candidates {
            if let Some(summary) = settle(
                self.wikipedia.summary(lang, candidate),
                Provider::Wikipedia,
                "summary",
            ) {
                return Some(summary);
            }
        }
        debug!(lang = %lang, "no exact title matched, falling back to search");
        for candidate in candidates {
            let Some(title) = settle(
                self.wikipedia.search_title(lang, candidate),
                Provider::Wikipedia,
                "search",
            ) else {
                continue;
            };
            if let Some(summary) = settle(
                self.wikipedia.summary(lang, &title),
                Provider::Wikipedia,
                "summary",
            ) {
                return Some(summary);
            }
        }
        None
    }
}

/// Collapses a lookup into an option, logging provider failures.
fn settle<T>(lookup: Lookup<T>, provider: Provider, what: &str) -> Option<T> {
    match lookup {
        Ok(value) => Some(value),
        Err(Miss::NoMatch) => {
            debug!(%provider, what, "no result");
            None
        }
        Err(Miss::Provider(err)) => {
            warn!(%provider, what, error = %err, "provider failed");
            None
        }
    }
}
