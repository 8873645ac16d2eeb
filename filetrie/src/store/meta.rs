//! Metadata Module.
//!
//! The metadata document lives next to the node tree as `{root}/filetrie`
//! and carries the configuration a store was created with together with
//! its distinct key counter. Field names match stores written by earlier
//! releases, which did not record a version.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{Result, StoreError};
use super::settings;
use super::StoreOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default = "legacy_version")]
    pub version: u32,

    #[serde(rename = "piecelen")]
    pub piece_length: usize,

    pub suffix: String,

    /// directory the store was created in, informational only.
    #[serde(rename = "rootpath", default)]
    pub root_path: PathBuf,

    /// number of distinct original keys.
    #[serde(rename = "keycount", default)]
    pub key_count: u64,

    /// arbitrary data attached by the user.
    #[serde(default)]
    pub data: Value,

    #[serde(rename = "randompoolfactor", default = "default_random_pool_factor")]
    pub random_pool_factor: usize,

    #[serde(rename = "fskeylen", default = "default_key_length_limit")]
    pub key_length_limit: usize,
}

fn legacy_version() -> u32 {
    1
}

fn default_random_pool_factor() -> usize {
    settings::DEFAULT_RANDOM_POOL_FACTOR
}

fn default_key_length_limit() -> usize {
    settings::DEFAULT_KEY_LENGTH_LIMIT
}

impl Metadata {
    pub fn new(root_path: impl Into<PathBuf>, opts: &StoreOptions) -> Self {
        Self {
            version: settings::METADATA_VERSION,
            piece_length: opts.piece_length,
            suffix: opts.suffix.clone(),
            root_path: root_path.into(),
            key_count: 0,
            data: Value::Null,
            random_pool_factor: opts.random_pool_factor,
            key_length_limit: opts.key_length_limit,
        }
    }

    /// Path of the metadata document inside `dir`.
    pub fn path(dir: &Path) -> PathBuf {
        dir.join(settings::METADATA_FILE_NAME)
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let path = Self::path(dir);
        let content = fs::read_to_string(&path)?;
        let mut meta: Metadata = serde_json::from_str(&content)?;

        if meta.version > settings::METADATA_VERSION {
            return Err(StoreError::UnsupportedVersion(
                meta.version,
                settings::METADATA_VERSION,
            ));
        }

        // older documents may carry values later releases reject.
        meta.piece_length = meta.piece_length.max(1);
        meta.random_pool_factor = meta.random_pool_factor.max(1);

        info!(
            "loaded metadata from {}: piece length {}, key length limit {}, {} keys",
            path.display(),
            meta.piece_length,
            meta.key_length_limit,
            meta.key_count
        );

        Ok(meta)
    }

    /// Write to a temp file first, then rename over the document.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = Self::path(dir);
        let temp_path = path.with_extension("tmp");

        let mut content = serde_json::to_string(self)?;
        content.push('\n');

        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &path)?;

        debug!("saved metadata to {}, {} keys", path.display(), self.key_count);

        Ok(())
    }
}
