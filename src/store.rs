use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::error::EnrichError;

pub const COVER_STEM: &str = "cover";
pub const SPECTROGRAM_STEM: &str = "spec_1";
pub const RANGE_FILE: &str = "range.geo.json";

/// Layout of per-species side files under the base asset directory.
#[derive(Debug, Clone)]
pub struct AssetStore {
    base_dir: Utf8PathBuf,
    reference_prefix: String,
}

impl AssetStore {
    pub fn new(base_dir: Utf8PathBuf, reference_prefix: &str) -> Self {
        Self {
            base_dir,
            reference_prefix: reference_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_dir(&self) -> &Utf8Path {
        &self.base_dir
    }

    pub fn species_dir(&self, species_id: &str) -> Utf8PathBuf {
        self.base_dir.join(species_id)
    }

    /// Path recorded in the catalog for a side file, e.g. `assets/aves/turdus_merula/cover.jpg`.
    pub fn reference(&self, species_id: &str, file_name: &str) -> String {
        if self.reference_prefix.is_empty() {
            return format!("{species_id}/{file_name}");
        }
        format!("{}/{species_id}/{file_name}", self.reference_prefix)
    }

    /// Maps a catalog reference back to the file it names inside the species folder.
    pub fn file_for_reference(&self, species_id: &str, reference: &str) -> Option<Utf8PathBuf> {
        let file_name = Utf8Path::new(reference.trim()).file_name()?;
        Some(self.species_dir(species_id).join(file_name))
    }

    pub fn reference_exists(&self, species_id: &str, reference: Option<&str>) -> bool {
        reference
            .filter(|value| !value.trim().is_empty())
            .and_then(|value| self.file_for_reference(species_id, value))
            .map(|path| path.as_std_path().is_file())
            .unwrap_or(false)
    }

    /// Deletes a side file. Returns `false` when there was nothing to delete.
    pub fn remove_file(&self, path: &Utf8Path) -> Result<bool, EnrichError> {
        match fs::remove_file(path.as_std_path()) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(EnrichError::Filesystem(format!("remove {path}: {err}"))),
        }
    }

    pub fn write_json<T: Serialize>(&self, path: &Utf8Path, value: &T) -> Result<(), EnrichError> {
        let content = serde_json::to_vec_pretty(value)
            .map_err(|err| EnrichError::Filesystem(err.to_string()))?;
        write_bytes_atomic(path, &content)
    }
}

pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), EnrichError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
        _ => Utf8PathBuf::from("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| EnrichError::Filesystem(format!("create {parent}: {err}")))?;
    let mut temp = tempfile::Builder::new()
        .prefix(".taxon-enrich")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| EnrichError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| EnrichError::Filesystem(err.to_string()))?;
    temp.as_file()
        .sync_all()
        .map_err(|err| EnrichError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| EnrichError::Filesystem(format!("persist {path}: {}", err.error)))?;
    Ok(())
}
