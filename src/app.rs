use std::fmt;
use std::thread;

use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::{Catalog, SpeciesRecord};
use crate::classify::file_extension;
use crate::config::RunOptions;
use crate::distribution::{PAGE_SIZE, aggregate_occurrences};
use crate::domain::{AssetKind, Provider};
use crate::error::EnrichError;
use crate::http::Downloader;
use crate::providers::ResolvedAsset;
use crate::providers::commons::CommonsClient;
use crate::providers::gbif::{GbifClient, GbifHttpClient};
use crate::providers::wikipedia::WikipediaClient;
use crate::providers::xeno_canto::XenoCantoClient;
use crate::resolver::Resolver;
use crate::store::{AssetStore, COVER_STEM, RANGE_FILE, SPECTROGRAM_STEM, write_bytes_atomic};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetStatus {
    Updated,
    DownloadFailed,
    Error(String),
    NotFound,
    Skipped,
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetStatus::Updated => write!(f, "OK"),
            AssetStatus::DownloadFailed => write!(f, "FAIL (download)"),
            AssetStatus::Error(detail) => write!(f, "ERROR {detail}"),
            AssetStatus::NotFound => write!(f, "not found"),
            AssetStatus::Skipped => write!(f, "skip (exists)"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Species {
        index: usize,
        total: usize,
        label: String,
    },
    Asset {
        kind: AssetKind,
        status: AssetStatus,
    },
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub species_total: usize,
    pub species_visited: usize,
    pub updated: usize,
    pub not_found: usize,
    pub failed: usize,
    pub skipped: usize,
    pub output_path: String,
    pub started_at: String,
    pub finished_at: String,
}

impl RunSummary {
    fn record(&mut self, status: &AssetStatus) {
        match status {
            AssetStatus::Updated => self.updated += 1,
            AssetStatus::NotFound => self.not_found += 1,
            AssetStatus::Skipped => self.skipped += 1,
            AssetStatus::DownloadFailed | AssetStatus::Error(_) => self.failed += 1,
        }
    }
}

/// Drives one enrichment run over a catalog, persisting after every asset update.
pub struct App<C, G, X, W, D>
where
    C: CommonsClient,
    G: GbifClient,
    X: XenoCantoClient,
    W: WikipediaClient,
    D: Downloader,
{
    resolver: Resolver<C, G, X, W>,
    downloader: D,
    store: AssetStore,
    options: RunOptions,
}

struct Species<'a> {
    index: usize,
    id: &'a str,
    label: &'a str,
}

/// Where a downloaded asset lands inside the species folder.
struct SideFile {
    kind: AssetKind,
    stem: &'static str,
    fallback_ext: &'static str,
}

struct Placement {
    path: Utf8PathBuf,
    reference: String,
    /// The catalog already holds `reference`.
    kept: bool,
}

impl SideFile {
    fn new(kind: AssetKind, stem: &'static str, fallback_ext: &'static str) -> Self {
        Self {
            kind,
            stem,
            fallback_ext,
        }
    }
}

impl<C, G, X, W, D> App<C, G, X, W, D>
where
    C: CommonsClient,
    G: GbifClient,
    X: XenoCantoClient,
    W: WikipediaClient,
    D: Downloader,
{
    pub fn new(resolver: Resolver<C, G, X, W>, downloader: D, options: RunOptions) -> Self {
        let store = AssetStore::new(options.base_dir.clone(), &options.asset_prefix);
        Self {
            resolver,
            downloader,
            store,
            options,
        }
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    /// Visits every selected species in order: image, spectrogram, description, distribution.
    pub fn run(&self, catalog: &mut Catalog, sink: &dyn ProgressSink) -> RunSummary {
        let mut summary = RunSummary {
            species_total: catalog.species.len(),
            output_path: self.options.output_path.to_string(),
            started_at: iso_timestamp(),
            ..Default::default()
        };

        let total = catalog.species.len();
        for index in 0..total {
            let (id, label) = {
                let record = &catalog.species[index];
                (record.resolved_id(), record.label().to_string())
            };
            if !self.options.selects(&label) {
                continue;
            }
            summary.species_visited += 1;
            sink.event(ProgressEvent::Species {
                index: index + 1,
                total,
                label: if label.is_empty() { id.clone() } else { label.clone() },
            });

            let species = Species {
                index,
                id: &id,
                label: &label,
            };
            for kind in AssetKind::ALL {
                if !self.options.wants(kind) {
                    continue;
                }
                let status = match kind {
                    AssetKind::Image => self.update_image(catalog, &species),
                    AssetKind::Spectrogram => self.update_spectrogram(catalog, &species),
                    AssetKind::Description => self.update_description(catalog, &species),
                    AssetKind::Distribution => self.update_distribution(catalog, &species),
                };
                summary.record(&status);
                sink.event(ProgressEvent::Asset { kind, status });
            }
        }

        summary.finished_at = iso_timestamp();
        summary
    }

    fn update_image(&self, catalog: &mut Catalog, species: &Species<'_>) -> AssetStatus {
        let current = catalog.species[species.index]
            .image_cover()
            .map(str::to_string);
        if !self.options.overwrite && self.store.reference_exists(species.id, current.as_deref())
        {
            return AssetStatus::Skipped;
        }

        let resolved = self.resolver.resolve_image(species.label);
        let status = match resolved {
            Some(asset) => {
                let target = SideFile::new(AssetKind::Image, COVER_STEM, "jpg");
                self.store_download(
                    catalog,
                    species,
                    &asset,
                    target,
                    current.as_deref(),
                    |record, reference| record.set_image_cover(reference),
                )
            }
            None => AssetStatus::NotFound,
        };
        self.pause();
        status
    }

    fn update_spectrogram(&self, catalog: &mut Catalog, species: &Species<'_>) -> AssetStatus {
        let current = catalog.species[species.index]
            .first_spectrogram()
            .map(str::to_string);
        if !self.options.overwrite && self.store.reference_exists(species.id, current.as_deref())
        {
            return AssetStatus::Skipped;
        }

        let resolved = self.resolver.resolve_spectrogram(species.label);
        let status = match resolved {
            Some(asset) => {
                let target = SideFile::new(AssetKind::Spectrogram, SPECTROGRAM_STEM, "png");
                self.store_download(
                    catalog,
                    species,
                    &asset,
                    target,
                    current.as_deref(),
                    |record, reference| record.set_first_spectrogram(reference),
                )
            }
            None => AssetStatus::NotFound,
        };
        self.pause();
        status
    }

    /// Each language is resolved and checkpointed on its own.
    fn update_description(&self, catalog: &mut Catalog, species: &Species<'_>) -> AssetStatus {
        let pending: Vec<_> = {
            let record = &catalog.species[species.index];
            self.options
                .languages
                .iter()
                .filter(|lang| self.options.overwrite || record.description_for(lang).is_none())
                .cloned()
                .collect()
        };
        if pending.is_empty() {
            return AssetStatus::Skipped;
        }

        let mut written = 0usize;
        let mut persist_error = None;
        for lang in &pending {
            let Some(summary) = self.resolver.resolve_description(species.label, lang) else {
                continue;
            };
            let record = &mut catalog.species[species.index];
            if !record.set_description(lang, &summary.text) {
                continue;
            }
            record.attribute(
                "description",
                Provider::Wikipedia.attribution_name(),
                &summary.page_url,
            );
            written += 1;
            info!(
                species = species.id,
                lang = %lang,
                chars = summary.text.trim().chars().count(),
                title = %summary.title,
                "description stored"
            );
            if let Err(err) = self.checkpoint(catalog) {
                persist_error = Some(err);
            }
        }
        self.pause();

        match (written, persist_error) {
            (_, Some(err)) => AssetStatus::Error(err.to_string()),
            (0, None) => AssetStatus::NotFound,
            _ => AssetStatus::Updated,
        }
    }

    fn update_distribution(&self, catalog: &mut Catalog, species: &Species<'_>) -> AssetStatus {
        let current = catalog.species[species.index]
            .distribution_geojson()
            .map(str::to_string);
        if !self.options.overwrite && self.store.reference_exists(species.id, current.as_deref())
        {
            return AssetStatus::Skipped;
        }

        let status = self.fetch_distribution(catalog, species, current.as_deref());
        self.pause();
        status
    }

    fn fetch_distribution(
        &self,
        catalog: &mut Catalog,
        species: &Species<'_>,
        current: Option<&str>,
    ) -> AssetStatus {
        let Some(key) = self.resolver.resolve_taxon_key(species.label) else {
            info!(species = species.id, "no taxon key");
            return AssetStatus::NotFound;
        };
        let collection = aggregate_occurrences(
            self.resolver.gbif(),
            key,
            self.options.max_occurrences,
            PAGE_SIZE,
        );
        if collection.is_empty() {
            info!(species = species.id, taxon_key = %key, "no georeferenced occurrences");
            return AssetStatus::NotFound;
        }

        let placement = self.placement(species, current, RANGE_FILE);
        if let Err(err) = self.store.write_json(&placement.path, &collection) {
            warn!(species = species.id, error = %err, "failed to write range file");
            return AssetStatus::Error(err.to_string());
        }

        let record = &mut catalog.species[species.index];
        if !placement.kept {
            record.set_distribution_geojson(placement.reference.clone());
        }
        record.attribute(
            "distribution",
            Provider::Gbif.attribution_name(),
            &GbifHttpClient::occurrence_search_url(key),
        );
        info!(species = species.id, points = collection.features.len(), "distribution stored");
        let status = self.finish_update(catalog);
        if status == AssetStatus::Updated {
            self.discard_replaced(species, current, &placement);
        }
        status
    }

    /// Downloads `asset`, writes it as `<stem>.<ext>` (or under the name an existing
    /// reference already points at) and records the reference.
    fn store_download<F>(
        &self,
        catalog: &mut Catalog,
        species: &Species<'_>,
        asset: &ResolvedAsset,
        target: SideFile,
        current: Option<&str>,
        assign: F,
    ) -> AssetStatus
    where
        F: FnOnce(&mut SpeciesRecord, String),
    {
        let bytes = match self.downloader.download(&asset.value) {
            Ok(bytes) => bytes,
            Err(err @ (EnrichError::DownloadStatus { .. } | EnrichError::EmptyDownload(_))) => {
                warn!(species = species.id, error = %err, "download rejected");
                return AssetStatus::DownloadFailed;
            }
            Err(err) => {
                warn!(species = species.id, error = %err, "download failed");
                return AssetStatus::Error(err.to_string());
            }
        };

        let file_name = format!(
            "{}.{}",
            target.stem,
            file_extension(&asset.value, target.fallback_ext)
        );
        let placement = self.placement(species, current, &file_name);
        if let Err(err) = write_bytes_atomic(&placement.path, &bytes) {
            warn!(species = species.id, error = %err, "failed to write asset file");
            return AssetStatus::Error(err.to_string());
        }

        let record = &mut catalog.species[species.index];
        if !placement.kept {
            assign(record, placement.reference.clone());
        }
        record.attribute(
            &target.kind.to_string(),
            asset.provider.attribution_name(),
            &asset.value,
        );
        info!(species = species.id, provider = %asset.provider, file = %placement.path, "asset stored");
        let status = self.finish_update(catalog);
        if status == AssetStatus::Updated {
            self.discard_replaced(species, current, &placement);
        }
        status
    }

    /// Without overwrite, a reference whose file went missing is refilled in place and
    /// left as it is in the catalog.
    fn placement(
        &self,
        species: &Species<'_>,
        current: Option<&str>,
        file_name: &str,
    ) -> Placement {
        if !self.options.overwrite
            && let Some(reference) = current
            && let Some(path) = self.store.file_for_reference(species.id, reference)
        {
            return Placement {
                path,
                reference: reference.to_string(),
                kept: true,
            };
        }
        Placement {
            path: self.store.species_dir(species.id).join(file_name),
            reference: self.store.reference(species.id, file_name),
            kept: false,
        }
    }

    /// Removes the side file a replaced reference pointed at, once the new one is persisted.
    fn discard_replaced(
        &self,
        species: &Species<'_>,
        previous: Option<&str>,
        placement: &Placement,
    ) {
        if placement.kept {
            return;
        }
        let Some(old) =
            previous.and_then(|reference| self.store.file_for_reference(species.id, reference))
        else {
            return;
        };
        if old == placement.path {
            return;
        }
        match self.store.remove_file(&old) {
            Ok(true) => info!(species = species.id, file = %old, "replaced side file removed"),
            Ok(false) => {}
            Err(err) => {
                warn!(species = species.id, error = %err, "failed to remove replaced side file")
            }
        }
    }

    fn finish_update(&self, catalog: &Catalog) -> AssetStatus {
        match self.checkpoint(catalog) {
            Ok(()) => AssetStatus::Updated,
            Err(err) => AssetStatus::Error(err.to_string()),
        }
    }

    /// Write-through persistence of the whole catalog.
    fn checkpoint(&self, catalog: &Catalog) -> Result<(), EnrichError> {
        catalog.persist(&self.options.output_path).inspect_err(|err| {
            warn!(path = %self.options.output_path, error = %err, "failed to persist catalog");
        })
    }

    fn pause(&self) {
        if !self.options.delay.is_zero() {
            thread::sleep(self.options.delay);
        }
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
