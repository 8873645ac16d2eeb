//! Result ordering.

use std::cmp::Ordering;
use std::fmt::Display;
use std::str::FromStr;

use rand::seq::SliceRandom;
use serde_json::Value;

use super::error::{Result, StoreError};

/// Ordering applied to prefix scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Order found during traversal, not stable across filesystems.
    #[default]
    None,
    /// Random sample drawn from a pool of `limit * random_pool_factor`.
    Random,
    CountAsc,
    CountDesc,
    KeyAsc,
    KeyDesc,
    ValueAsc,
    ValueDesc,
}

impl SortMode {
    /// Limit the scan should stop at for a caller `limit`.
    pub fn scan_limit(&self, limit: usize, random_pool_factor: usize) -> usize {
        match self {
            SortMode::Random => limit.saturating_mul(random_pool_factor),
            _ => limit,
        }
    }
}

impl FromStr for SortMode {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        let mode = match s {
            "none" => SortMode::None,
            "random" => SortMode::Random,
            "count-asc" => SortMode::CountAsc,
            "count-desc" => SortMode::CountDesc,
            "key-asc" => SortMode::KeyAsc,
            "key-desc" => SortMode::KeyDesc,
            "value-asc" => SortMode::ValueAsc,
            "value-desc" => SortMode::ValueDesc,
            _ => return Err(StoreError::UnknownSortMode(s.to_string())),
        };
        Ok(mode)
    }
}

impl Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SortMode::None => "none",
            SortMode::Random => "random",
            SortMode::CountAsc => "count-asc",
            SortMode::CountDesc => "count-desc",
            SortMode::KeyAsc => "key-asc",
            SortMode::KeyDesc => "key-desc",
            SortMode::ValueAsc => "value-asc",
            SortMode::ValueDesc => "value-desc",
        };
        f.write_str(name)
    }
}

/// One prefix scan result.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// original key as inserted.
    pub key: String,

    pub value: Value,

    /// number of times the key was inserted.
    pub count: u64,
}

/// Order `entries` by `mode`, then cut them down to `limit` (0 keeps all).
///
/// Value ordering fails before touching `entries` if the values have no
/// common ordering.
pub fn order(entries: &mut Vec<Entry>, mode: SortMode, limit: usize) -> Result<()> {
    match mode {
        SortMode::None => {}
        SortMode::Random => entries.shuffle(&mut rand::thread_rng()),
        SortMode::CountAsc => entries.sort_by(|a, b| a.count.cmp(&b.count)),
        SortMode::CountDesc => entries.sort_by(|a, b| b.count.cmp(&a.count)),
        SortMode::KeyAsc => entries.sort_by(|a, b| a.key.cmp(&b.key)),
        SortMode::KeyDesc => entries.sort_by(|a, b| b.key.cmp(&a.key)),
        SortMode::ValueAsc => {
            check_sortable(entries)?;
            entries.sort_by(|a, b| compare_values(&a.value, &b.value));
        }
        SortMode::ValueDesc => {
            check_sortable(entries)?;
            entries.sort_by(|a, b| compare_values(&b.value, &a.value));
        }
    }

    if limit > 0 {
        entries.truncate(limit);
    }

    Ok(())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Nulls order with anything; every other value must be a scalar of one kind.
fn check_sortable(entries: &[Entry]) -> Result<()> {
    let mut seen: Option<&'static str> = None;

    for entry in entries {
        match &entry.value {
            Value::Null => continue,
            Value::Array(_) | Value::Object(_) => {
                return Err(StoreError::UnsortableValue(format!(
                    "key '{}' holds {} value",
                    entry.key,
                    kind(&entry.value)
                )));
            }
            value => match seen {
                None => seen = Some(kind(value)),
                Some(k) if k == kind(value) => {}
                Some(k) => {
                    return Err(StoreError::UnsortableValue(format!(
                        "mixed {} and {} values",
                        k,
                        kind(value)
                    )));
                }
            },
        }
    }

    Ok(())
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
                a.cmp(&b)
            } else if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
                a.cmp(&b)
            } else {
                let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
        }
        // excluded by check_sortable.
        _ => Ordering::Equal,
    }
}
