//! Prefix scanning.
//!
//! A scan starts in the directory holding the prefix's last piece. Only
//! entries of that directory whose names begin with the last piece belong
//! to the prefix; everything below them does. The walk is a depth first
//! traversal over an explicit stack and stops once enough records have
//! been collected.

use std::fs;
use std::path::{Path, PathBuf};

use glob::{glob, Pattern};
use log::{trace, warn};
use serde_json::Value;

use super::error::Result;
use super::record::RecordFile;
use super::sort::Entry;
use crate::utils::path::PathEncoder;
use crate::utils::sanitize::sanitize;

/// Per-scan state, owned by a single call.
struct ScanContext<F> {
    /// sanitized prefix every collected key must start with.
    prefix: String,

    /// stop after this many records, 0 for no limit.
    limit: usize,

    filter: F,

    results: Vec<Entry>,
}

impl<F> ScanContext<F>
where
    F: FnMut(&str, &Value, u64) -> bool,
{
    fn below_limit(&self) -> bool {
        self.limit == 0 || self.results.len() < self.limit
    }

    fn collect(&mut self, file: &RecordFile) {
        for (key, record) in file {
            if !self.below_limit() {
                break;
            }

            // only reachable for prefixes longer than the key length limit.
            if !sanitize(key).starts_with(&self.prefix) {
                continue;
            }

            if !(self.filter)(key.as_str(), &record.value, record.count) {
                continue;
            }

            self.results.push(Entry {
                key: key.clone(),
                value: record.value.clone(),
                count: record.count,
            });
        }
    }
}

/// Node waiting on the traversal stack.
struct Pending {
    path: PathBuf,
    is_dir: bool,
}

/// Walks the node tree below a prefix.
pub struct PrefixScanner<'a> {
    encoder: &'a PathEncoder,
}

impl<'a> PrefixScanner<'a> {
    pub fn new(encoder: &'a PathEncoder) -> Self {
        Self { encoder }
    }

    /// Collect up to `limit` records (0 for all) whose sanitized key starts
    /// with the sanitized `prefix` and that pass `filter`.
    ///
    /// Siblings are visited in name order.
    pub fn scan<F>(&self, prefix: &str, limit: usize, filter: F) -> Result<Vec<Entry>>
    where
        F: FnMut(&str, &Value, u64) -> bool,
    {
        let clean = sanitize(prefix);
        let node = self.encoder.encode(&clean);

        let mut ctx = ScanContext {
            prefix: clean,
            limit,
            filter,
            results: Vec::new(),
        };

        if !node.node_dir.is_dir() {
            trace!("no node directory {}, nothing to scan", node.node_dir.display());
            return Ok(ctx.results);
        }

        let pattern = format!(
            "{}/{}*",
            Pattern::escape(&node.node_dir.to_string_lossy()),
            node.node_name
        );
        trace!("scan prefix `{}` with pattern: {}", &ctx.prefix, &pattern);

        // glob yields names in order; the stack pops from the back.
        let mut stack = Vec::new();
        for path in glob(&pattern)? {
            let path = path?;
            let is_dir = path.is_dir();
            stack.push(Pending { path, is_dir });
        }
        stack.reverse();

        while ctx.below_limit() {
            let Some(pending) = stack.pop() else {
                break;
            };

            if pending.is_dir {
                let mut children = Vec::new();
                for entry in fs::read_dir(&pending.path)? {
                    let entry = entry?;
                    children.push(Pending {
                        path: entry.path(),
                        is_dir: entry.file_type()?.is_dir(),
                    });
                }
                children.sort_by(|a, b| b.path.cmp(&a.path));
                stack.extend(children);
            } else if self.is_leaf(&pending.path) {
                let file = RecordFile::open(&pending.path)?;
                ctx.collect(&file);
            } else {
                warn!("skip foreign file {} in node tree", pending.path.display());
            }
        }

        trace!(
            "scan prefix `{}` collected {} records",
            &ctx.prefix,
            ctx.results.len()
        );

        Ok(ctx.results)
    }

    fn is_leaf(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .map_or(false, |name| name.ends_with(self.encoder.suffix()))
    }
}
