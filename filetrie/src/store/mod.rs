//! Store Module.

pub mod arc;
pub mod error;
pub mod meta;
pub mod record;
pub mod scan;
pub mod settings;
pub mod sort;
pub mod storage;

use log::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// maximum characters per directory level.
    pub(crate) piece_length: usize,

    // sanitized keys are cut to this length before encoding, 0 for no limit.
    // keys agreeing on this many characters share a record file.
    pub(crate) key_length_limit: usize,

    pub(crate) suffix: String,

    /// random sampling draws from `limit * random_pool_factor` records.
    pub(crate) random_pool_factor: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            piece_length: settings::DEFAULT_PIECE_LENGTH,
            key_length_limit: settings::DEFAULT_KEY_LENGTH_LIMIT,
            suffix: settings::DEFAULT_FILE_SUFFIX.to_string(),
            random_pool_factor: settings::DEFAULT_RANDOM_POOL_FACTOR,
        }
    }
}

impl StoreOptions {
    /// Replace unusable values with defaults.
    pub(crate) fn validated(mut self) -> Self {
        // node directories are alphanumeric, so a leaf name needs one other
        // character to never collide with them.
        let suffix = self.suffix.trim();
        if suffix.len() > settings::MAX_FILENAME_LEN
            || suffix.contains(['/', '\\'])
            || suffix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            warn!("invalid suffix {:?}, use default", &self.suffix);
            self.suffix = settings::DEFAULT_FILE_SUFFIX.to_string();
        } else {
            self.suffix = suffix.to_string();
        }

        if self.piece_length == 0
            || self.piece_length + self.suffix.len() > settings::MAX_FILENAME_LEN
        {
            warn!("invalid piece length {}, use default", self.piece_length);
            self.piece_length = settings::DEFAULT_PIECE_LENGTH;
        }

        if self.random_pool_factor == 0 {
            self.random_pool_factor = settings::DEFAULT_RANDOM_POOL_FACTOR;
        }

        self
    }
}

pub type Store = storage::FileTrie;

pub use arc::{OpenOptions, SharedTrie};
