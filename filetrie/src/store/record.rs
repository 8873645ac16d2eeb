//! Record File Module.
//!
//! A record file is the leaf document of the trie. It maps every original
//! key whose sanitized, truncated form encodes to this path onto its value
//! and occurrence count.

use std::collections::btree_map::{self, BTreeMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::trace;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::Result;
use crate::utils::sanitize::sanitize;

/// Value and occurrence count of one original key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub value: Value,

    pub count: u64,
}

/// In-memory copy of one leaf document.
#[derive(Debug)]
pub struct RecordFile {
    path: PathBuf,
    records: BTreeMap<String, Record>,
}

impl RecordFile {
    /// Load the document at `path`. A missing file reads as empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let records = match fs::read(path) {
            Ok(buf) => serde_json::from_slice(&buf)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.records.get(key)
    }

    /// Look `key` up as typed, then by its full sanitized form.
    ///
    /// When several original keys sanitize alike, the first one in key
    /// order answers.
    pub fn lookup(&self, key: &str) -> Option<&Record> {
        if let Some(record) = self.records.get(key) {
            return Some(record);
        }

        let clean = sanitize(key);
        self.records
            .iter()
            .find(|(original, _)| sanitize(original.as_str()) == clean)
            .map(|(_, record)| record)
    }

    /// Store `value` under `key`, bumping its count.
    /// Return `true` if the key was not present before.
    pub fn upsert(&mut self, key: &str, value: Value) -> bool {
        match self.records.get_mut(key) {
            Some(record) => {
                record.value = value;
                record.count += 1;
                false
            }
            None => {
                self.records
                    .insert(key.to_string(), Record { value, count: 1 });
                true
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Record> {
        self.records.remove(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Record> {
        self.records.iter()
    }

    /// Overwrite the document on disk.
    ///
    /// An empty document is never written; its file is deleted instead.
    pub fn save(&self) -> Result<()> {
        if self.records.is_empty() {
            trace!("record file `{}` is empty, remove it.", self.path.display());

            return match fs::remove_file(&self.path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }

        fs::write(&self.path, serde_json::to_vec(&self.records)?)?;
        trace!(
            "wrote {} records to `{}`",
            self.records.len(),
            self.path.display()
        );

        Ok(())
    }
}

impl<'a> IntoIterator for &'a RecordFile {
    type Item = (&'a String, &'a Record);
    type IntoIter = btree_map::Iter<'a, String, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
