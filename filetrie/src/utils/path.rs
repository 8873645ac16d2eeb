//! path utils
//!
//! Maps sanitized keys onto the node tree. A key is truncated to the key
//! length limit and cut into pieces of the piece length; every piece is a
//! directory level and the last one also names the leaf file.

use std::path::{Path, PathBuf};

/// Location of a key inside the node tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePath {
    /// pieces of the truncated key, in order.
    pub segments: Vec<String>,

    /// last piece, empty for an empty key.
    pub node_name: String,

    /// name of the leaf file, `node_name` plus suffix.
    pub file_name: String,

    /// directory holding the leaf file.
    pub node_dir: PathBuf,

    /// full path of the leaf file.
    pub file_path: PathBuf,
}

/// Deterministic key to path mapping for one store.
#[derive(Debug, Clone)]
pub struct PathEncoder {
    root: PathBuf,
    piece_length: usize,
    key_length_limit: usize,
    suffix: String,
}

impl PathEncoder {
    pub fn new(
        root: impl Into<PathBuf>,
        piece_length: usize,
        key_length_limit: usize,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            piece_length: piece_length.max(1),
            key_length_limit,
            suffix: suffix.into(),
        }
    }

    /// Root node directory, the top of the tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Encode an already sanitized key.
    ///
    /// Keys that agree on their first `key_length_limit` characters share a
    /// path. The empty key encodes to the root node with an empty node name.
    pub fn encode(&self, sanitized: &str) -> NodePath {
        let mut chars: Vec<char> = sanitized.chars().collect();
        if self.key_length_limit > 0 && chars.len() > self.key_length_limit {
            chars.truncate(self.key_length_limit);
        }

        let segments: Vec<String> = chars
            .chunks(self.piece_length)
            .map(|piece| piece.iter().collect())
            .collect();

        let node_name = segments.last().cloned().unwrap_or_default();
        let file_name = format!("{}{}", node_name, self.suffix);

        let mut node_dir = self.root.clone();
        if let Some((_, parents)) = segments.split_last() {
            node_dir.extend(parents);
        }
        let file_path = node_dir.join(&file_name);

        NodePath {
            segments,
            node_name,
            file_name,
            node_dir,
            file_path,
        }
    }
}
