//! Store Module.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info, trace};
use serde_json::Value;

use super::error::{Result, StoreError};
use super::meta::Metadata;
use super::record::{Record, RecordFile};
use super::scan::PrefixScanner;
use super::settings;
use super::sort::{self, Entry, SortMode};
use super::StoreOptions;
use crate::utils::path::PathEncoder;
use crate::utils::sanitize::sanitize;

/// Trie implementation methods.
pub trait Trie {
    /// Store `value` under `key`, counting one more occurrence of `key`.
    fn insert(&mut self, key: &str, value: impl Into<Value>) -> Result<()>;

    /// Get value by key from the store.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Return `true` if the store contains the given key.
    fn has(&self, key: &str) -> Result<bool>;

    /// Number of times `key` was inserted, 0 if absent.
    fn count(&self, key: &str) -> Result<u64>;

    /// Remove key from the store. Only the original key as inserted matches.
    /// Return `false` if there was nothing to remove.
    fn remove(&mut self, key: &str) -> Result<bool>;

    /// Entries whose sanitized key starts with the sanitized `prefix`.
    ///
    /// At most `limit` entries are returned, 0 for all of them, ordered by
    /// `sort`.
    fn prefixed(&self, prefix: &str, limit: usize, sort: SortMode) -> Result<Vec<Entry>> {
        self.prefixed_filtered(prefix, limit, sort, |_, _, _| true)
    }

    /// Same as [`Trie::prefixed`], keeping only entries for which `filter`
    /// returns `true`. `filter` receives the original key, value and count.
    fn prefixed_filtered<F>(
        &self,
        prefix: &str,
        limit: usize,
        sort: SortMode,
        filter: F,
    ) -> Result<Vec<Entry>>
    where
        F: FnMut(&str, &Value, u64) -> bool;

    /// Return total number of distinct keys in the store.
    fn key_count(&self) -> u64;

    /// Check store is empty or not.
    fn is_empty(&self) -> bool {
        self.key_count() == 0
    }

    /// Persist the store metadata.
    fn sync(&mut self) -> Result<()>;

    /// Close the store, persisting its metadata.
    fn close(&mut self) -> Result<()>;
}

/// Trie kept entirely on the filesystem.
///
/// Nothing is cached between calls: every operation reads and writes the
/// node tree directly. There is no locking of any kind. A store directory
/// must have a single owner at a time, and calls mutating it from several
/// threads or processes have to be serialized by the caller, for example
/// through [`SharedTrie`](super::arc::SharedTrie) within one process.
#[derive(Debug)]
pub struct FileTrie {
    /// directory for the store.
    path: PathBuf,

    /// maps keys onto the node tree under `{path}/root`.
    encoder: PathEncoder,

    /// configuration and counters, mirrored to `{path}/filetrie`.
    meta: Metadata,
}

impl FileTrie {
    /// Open the store at the given path with default options.
    /// If the given path is not a store yet, a new one will be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, StoreOptions::default())
    }

    /// Open store directory with custom options.
    ///
    /// Options only apply to newly created stores; an existing store keeps
    /// the configuration it was created with.
    pub fn open_with_options(path: impl AsRef<Path>, opts: StoreOptions) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() && !path.is_dir() {
            return Err(StoreError::NotADirectory(path.to_path_buf()));
        }

        let root_node = path.join(settings::ROOT_NODE);
        let meta = if Metadata::path(path).is_file() && root_node.is_dir() {
            info!("open store path: {}", path.display());
            Metadata::load(path)?
        } else {
            info!("create store path: {}", path.display());
            fs::create_dir_all(&root_node)?;

            let opts = opts.validated();
            let meta = Metadata::new(fs::canonicalize(path)?, &opts);
            meta.save(path)?;
            meta
        };

        let encoder = PathEncoder::new(
            root_node,
            meta.piece_length,
            meta.key_length_limit,
            meta.suffix.clone(),
        );

        Ok(Self {
            path: path.to_path_buf(),
            encoder,
            meta,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn piece_length(&self) -> usize {
        self.meta.piece_length
    }

    pub fn key_length_limit(&self) -> usize {
        self.meta.key_length_limit
    }

    pub fn suffix(&self) -> &str {
        &self.meta.suffix
    }

    pub fn random_pool_factor(&self) -> usize {
        self.meta.random_pool_factor
    }

    /// Change the random pool factor of this store. 0 is ignored.
    pub fn set_random_pool_factor(&mut self, factor: usize) -> Result<()> {
        if factor == 0 {
            return Ok(());
        }
        self.meta.random_pool_factor = factor;
        self.meta.save(&self.path)
    }

    /// Data attached to the store by the user.
    pub fn data(&self) -> &Value {
        &self.meta.data
    }

    /// Attach arbitrary data to the store, replacing previous data.
    pub fn set_data(&mut self, data: impl Into<Value>) -> Result<()> {
        self.meta.data = data.into();
        self.meta.save(&self.path)
    }

    fn record(&self, key: &str) -> Result<Option<Record>> {
        let clean = sanitize(key);
        if clean.is_empty() {
            trace!("key `{}` sanitizes to nothing, treat as absent", key);
            return Ok(None);
        }

        let node = self.encoder.encode(&clean);
        let file = RecordFile::open(&node.file_path)?;

        Ok(file.lookup(key).cloned())
    }

    /// Delete `dir` and its ancestors for as long as they are empty,
    /// stopping below the root node.
    fn prune(&self, dir: &Path) -> Result<()> {
        let root = self.encoder.root();
        let mut dir = dir.to_path_buf();

        while dir != root && dir.starts_with(root) {
            if fs::read_dir(&dir)?.next().is_some() {
                break;
            }

            fs::remove_dir(&dir)?;
            debug!("removed empty node directory {}", dir.display());

            if !dir.pop() {
                break;
            }
        }

        Ok(())
    }
}

impl Trie for FileTrie {
    fn insert(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        let clean = sanitize(key);
        if clean.is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }

        let node = self.encoder.encode(&clean);
        let mut file = RecordFile::open(&node.file_path)?;

        if file.is_empty() {
            // a leftover empty directory from an earlier failed insert is reused.
            fs::create_dir_all(&node.node_dir)?;
            debug!("new record file at: {}", node.file_path.display());
        }

        let created = file.upsert(key, value.into());
        file.save()?;
        trace!("insert key `{}` into {}", key, node.file_path.display());

        if created {
            self.meta.key_count += 1;
            self.meta.save(&self.path)?;
        }

        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.record(key)?.map(|r| r.value))
    }

    fn has(&self, key: &str) -> Result<bool> {
        Ok(self.record(key)?.is_some())
    }

    fn count(&self, key: &str) -> Result<u64> {
        Ok(self.record(key)?.map_or(0, |r| r.count))
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        let clean = sanitize(key);
        if clean.is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }

        let node = self.encoder.encode(&clean);
        let mut file = RecordFile::open(&node.file_path)?;

        if file.remove(key).is_none() {
            trace!("remove key `{}`, but it not found in store", key);
            return Ok(false);
        }

        trace!("remove key `{}` from {}", key, node.file_path.display());
        file.save()?;

        self.meta.key_count = self.meta.key_count.saturating_sub(1);
        self.meta.save(&self.path)?;

        if file.is_empty() {
            self.prune(&node.node_dir)?;
        }

        Ok(true)
    }

    fn prefixed_filtered<F>(
        &self,
        prefix: &str,
        limit: usize,
        sort: SortMode,
        filter: F,
    ) -> Result<Vec<Entry>>
    where
        F: FnMut(&str, &Value, u64) -> bool,
    {
        let scan_limit = sort.scan_limit(limit, self.meta.random_pool_factor);
        let mut entries = PrefixScanner::new(&self.encoder).scan(prefix, scan_limit, filter)?;

        sort::order(&mut entries, sort, limit)?;

        Ok(entries)
    }

    fn key_count(&self) -> u64 {
        self.meta.key_count
    }

    fn sync(&mut self) -> Result<()> {
        self.meta.save(&self.path)
    }

    fn close(&mut self) -> Result<()> {
        self.sync()
    }
}

impl Drop for FileTrie {
    fn drop(&mut self) {
        if let Err(e) = self.sync() {
            error!(
                "failed to save metadata of store {}, got error: {}",
                self.path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::distributions::Alphanumeric;
    use rand::Rng;
    use serde_json::json;
    use tempdir::TempDir;

    use super::super::OpenOptions;
    use super::*;

    fn demo(db: &mut FileTrie) {
        db.insert("John Doe", "john@doe.com").unwrap();
        db.insert("JohnDoe", "aasdf@acme.com").unwrap();
        db.insert("John Smith", "j0hn@smith.com").unwrap();
        db.insert("John Smith", "j0hn@smith.com").unwrap();
        db.insert("Jane", "j4ne@acme.com").unwrap();
    }

    fn sorted_keys(entries: &[Entry]) -> Vec<&str> {
        let mut keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        keys.sort();
        keys
    }

    #[test]
    fn file_trie_should_get_insert() {
        let dir = TempDir::new("file-trie-test").unwrap();
        let mut db = FileTrie::open(dir.path()).unwrap();

        assert!(db.is_empty());
        assert_eq!(db.get("hello").unwrap(), None);
        assert!(!db.has("hello").unwrap());
        assert_eq!(db.count("hello").unwrap(), 0);

        db.insert("hello", "world").unwrap();

        assert_eq!(db.key_count(), 1);
        assert!(db.has("hello").unwrap());
        assert_eq!(db.get("hello").unwrap(), Some(json!("world")));

        db.insert("hello", json!({"planet": "underworld"})).unwrap();
        assert_eq!(db.get("hello").unwrap(), Some(json!({"planet": "underworld"})));
        assert_eq!(db.count("hello").unwrap(), 2);
        assert_eq!(db.key_count(), 1);

        assert!(db.remove("hello").unwrap());
        assert_eq!(db.get("hello").unwrap(), None);
        assert!(!db.has("hello").unwrap());
        assert_eq!(db.key_count(), 0);
    }

    #[test]
    fn file_trie_should_count_occurrences() {
        let dir = TempDir::new("file-trie-test").unwrap();
        let mut db = FileTrie::open(dir.path()).unwrap();

        for n in 1..=7 {
            db.insert("Repeated", n).unwrap();
            assert_eq!(db.count("Repeated").unwrap(), n);
        }
        assert_eq!(db.get("Repeated").unwrap(), Some(json!(7)));
        assert_eq!(db.key_count(), 1);
    }

    #[test]
    fn file_trie_should_reject_invalid_key() {
        let dir = TempDir::new("file-trie-test").unwrap();
        let mut db = FileTrie::open(dir.path()).unwrap();

        assert!(matches!(
            db.insert("...", "nothing"),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(db.remove("-"), Err(StoreError::InvalidKey(_))));
        assert_eq!(db.get("...").unwrap(), None);
        assert!(!db.has("").unwrap());
        assert_eq!(db.count("!!").unwrap(), 0);

        assert_eq!(db.key_count(), 0);
        let root = dir.path().join(settings::ROOT_NODE);
        assert_eq!(fs::read_dir(root).unwrap().count(), 0);
    }

    #[test]
    fn file_trie_should_run_demo_scenario() {
        let dir = TempDir::new("file-trie-test").unwrap();
        let mut db = FileTrie::open(dir.path()).unwrap();
        demo(&mut db);

        assert!(db.has("Jane").unwrap());
        assert_eq!(db.has("jane").unwrap(), db.has("Jane").unwrap());
        assert_eq!(db.count("John Smith").unwrap(), 2);
        assert_eq!(db.key_count(), 4);

        let found = db.prefixed("john", 0, SortMode::None).unwrap();
        assert_eq!(sorted_keys(&found), vec!["John Doe", "John Smith", "JohnDoe"]);
    }

    #[test]
    fn file_trie_should_read_by_sanitized_key() {
        let dir = TempDir::new("file-trie-test").unwrap();
        let mut db = FileTrie::open(dir.path()).unwrap();
        demo(&mut db);

        assert_eq!(db.get("JANE").unwrap(), Some(json!("j4ne@acme.com")));
        assert_eq!(db.count("john smith").unwrap(), 2);
        assert!(db.has("j.o.h.n.s.m.i.t.h").unwrap());
        assert!(!db.has("jan").unwrap());

        // exact originals answer for themselves.
        assert_eq!(db.get("JohnDoe").unwrap(), Some(json!("aasdf@acme.com")));
        assert_eq!(db.get("John Doe").unwrap(), Some(json!("john@doe.com")));
        // otherwise the first original in key order wins.
        assert_eq!(db.get("johndoe").unwrap(), Some(json!("john@doe.com")));

        // removal needs the original key.
        assert!(!db.remove("jane").unwrap());
        assert!(db.has("Jane").unwrap());
        assert!(db.remove("Jane").unwrap());
        assert!(!db.has("jane").unwrap());
    }

    #[test]
    fn file_trie_should_resolve_collisions_by_original_key() {
        let dir = TempDir::new("file-trie-test").unwrap();
        let mut db = OpenOptions::new()
            .key_length_limit(4)
            .open(dir.path())
            .unwrap();

        db.insert("John Doe", "first").unwrap();
        db.insert("JohnDoe", "second").unwrap();
        db.insert("johnny", "third").unwrap();

        // all three share root/joh/n.json.
        let leaf = dir.path().join("root").join("joh").join("n.json");
        assert_eq!(RecordFile::open(&leaf).unwrap().len(), 3);

        assert_eq!(db.get("John Doe").unwrap(), Some(json!("first")));
        assert_eq!(db.get("JohnDoe").unwrap(), Some(json!("second")));
        assert_eq!(db.get("johnny").unwrap(), Some(json!("third")));
        assert_eq!(db.key_count(), 3);

        assert!(db.remove("JohnDoe").unwrap());
        assert!(!db.remove("JohnDoe").unwrap());
        assert!(leaf.exists());
        assert_eq!(db.get("John Doe").unwrap(), Some(json!("first")));
    }

    #[test]
    fn file_trie_should_prune_empty_directories() {
        let dir = TempDir::new("file-trie-test").unwrap();
        let mut db = FileTrie::open(dir.path()).unwrap();
        let root = dir.path().join(settings::ROOT_NODE);

        db.insert("abcdef", 1).unwrap();
        assert!(root.join("abc").join("def.json").is_file());

        assert!(db.remove("abcdef").unwrap());
        assert!(!root.join("abc").exists());
        assert!(root.is_dir());
    }

    #[test]
    fn file_trie_should_keep_shared_directories() {
        let dir = TempDir::new("file-trie-test").unwrap();
        let mut db = FileTrie::open(dir.path()).unwrap();
        let root = dir.path().join(settings::ROOT_NODE);

        db.insert("abcdef", 1).unwrap();
        db.insert("abcxyz", 2).unwrap();

        assert!(db.remove("abcdef").unwrap());
        assert!(!root.join("abc").join("def.json").exists());
        assert!(root.join("abc").join("xyz.json").is_file());
        assert_eq!(db.get("abcxyz").unwrap(), Some(json!(2)));
    }

    #[test]
    fn file_trie_should_prune_up_to_first_shared_ancestor() {
        let dir = TempDir::new("file-trie-test").unwrap();
        let mut db = FileTrie::open(dir.path()).unwrap();
        let root = dir.path().join(settings::ROOT_NODE);

        db.insert("abc", 1).unwrap();
        db.insert("abcdefghi", 2).unwrap();
        db.insert("abcxyzuvw", 3).unwrap();

        assert!(db.remove("abcdefghi").unwrap());
        assert!(!root.join("abc").join("def").exists());
        assert!(root.join("abc").join("xyz").is_dir());

        assert!(db.remove("abcxyzuvw").unwrap());
        assert!(!root.join("abc").exists());
        assert!(root.join("abc.json").is_file());
    }

    #[test]
    fn file_trie_should_save_count_on_remove() {
        let dir = TempDir::new("file-trie-test").unwrap();
        let mut db = FileTrie::open(dir.path()).unwrap();

        db.insert("abcdefghi", 1).unwrap();
        db.insert("abcxyz", 2).unwrap();
        assert_eq!(Metadata::load(dir.path()).unwrap().key_count, 2);

        assert!(db.remove("abcdefghi").unwrap());
        assert_eq!(Metadata::load(dir.path()).unwrap().key_count, 1);
        assert!(!dir.path().join("root").join("abc").join("def").exists());
    }

    #[test]
    fn file_trie_should_persist() {
        let dir = TempDir::new("file-trie-test").unwrap();

        {
            let mut db = FileTrie::open(dir.path()).unwrap();
            db.insert("persistence", "check").unwrap();
            db.insert("removed", "entry").unwrap();
            db.remove("removed").unwrap();
            db.set_data(json!({"label": "contacts"})).unwrap();
        }

        {
            let db = FileTrie::open(dir.path()).unwrap();
            assert_eq!(db.get("persistence").unwrap(), Some(json!("check")));
            assert_eq!(db.get("removed").unwrap(), None);
            assert_eq!(db.key_count(), 1);
            assert_eq!(db.data(), &json!({"label": "contacts"}));
        }
    }

    #[test]
    fn file_trie_should_prefer_stored_options() {
        let dir = TempDir::new("file-trie-test").unwrap();

        {
            let mut db = OpenOptions::new()
                .piece_length(2)
                .key_length_limit(6)
                .suffix(".rec")
                .random_pool_factor(4)
                .open(dir.path())
                .unwrap();
            db.insert("abcdefgh", true).unwrap();
        }

        let db = OpenOptions::new().piece_length(5).open(dir.path()).unwrap();
        assert_eq!(db.piece_length(), 2);
        assert_eq!(db.key_length_limit(), 6);
        assert_eq!(db.suffix(), ".rec");
        assert_eq!(db.random_pool_factor(), 4);

        let leaf = dir.path().join("root").join("ab").join("cd").join("ef.rec");
        assert!(leaf.is_file());
        assert_eq!(db.get("abcdefgh").unwrap(), Some(json!(true)));
    }

    #[test]
    fn file_trie_should_keep_leaves_apart_from_nodes() {
        let dir = TempDir::new("file-trie-test").unwrap();
        let mut db = OpenOptions::new().suffix("x").open(dir.path()).unwrap();
        assert_eq!(db.suffix(), ".json");

        db.insert("ab", 1).unwrap();
        db.insert("abxdef", 2).unwrap();
        assert_eq!(db.get("ab").unwrap(), Some(json!(1)));
        assert_eq!(db.get("abxdef").unwrap(), Some(json!(2)));
    }

    #[test]
    fn file_trie_should_reject_file_as_store_path() {
        let dir = TempDir::new("file-trie-test").unwrap();
        let path = dir.path().join("plain");
        fs::write(&path, b"not a store").unwrap();

        assert!(matches!(
            FileTrie::open(&path),
            Err(StoreError::NotADirectory(_))
        ));
    }

    #[test]
    fn file_trie_should_match_prefixes() {
        let dir = TempDir::new("file-trie-test").unwrap();
        let mut db = FileTrie::open(dir.path()).unwrap();
        let mut rng = rand::thread_rng();

        let mut keys = Vec::new();
        for _ in 0..60 {
            let len = rng.gen_range(1..12);
            let key: String = (0..len)
                .map(|_| char::from(rng.sample(Alphanumeric)))
                .collect();
            db.insert(&key, key.len()).unwrap();
            keys.push(key);
        }
        keys.sort();
        keys.dedup();

        for prefix in ["", "a", "B", "7", "ab", "x.y", "abcd", "Q-9z", "zzzzzzzzzzzzz"] {
            let found = db.prefixed(prefix, 0, SortMode::None).unwrap();
            let found = sorted_keys(&found);

            let clean = sanitize(prefix);
            let expected: Vec<&str> = keys
                .iter()
                .filter(|k| sanitize(k).starts_with(&clean))
                .map(|k| k.as_str())
                .collect();

            assert_eq!(found, expected, "prefix {:?}", prefix);
        }
    }

    #[test]
    fn file_trie_should_honor_limit_for_every_sort() {
        let dir = TempDir::new("file-trie-test").unwrap();
        let mut db = FileTrie::open(dir.path()).unwrap();
        demo(&mut db);
        db.insert("Harry S. Truman", "trumanh@whitehouse.gov").unwrap();

        for mode in [
            SortMode::None,
            SortMode::Random,
            SortMode::CountAsc,
            SortMode::CountDesc,
            SortMode::KeyAsc,
            SortMode::KeyDesc,
            SortMode::ValueAsc,
            SortMode::ValueDesc,
        ] {
            let found = db.prefixed("", 3, mode).unwrap();
            assert_eq!(found.len(), 3, "sort mode {}", mode);
        }

        assert_eq!(db.prefixed("", 0, SortMode::Random).unwrap().len(), 5);
    }

    #[test]
    fn file_trie_should_sort_results() {
        let dir = TempDir::new("file-trie-test").unwrap();
        let mut db = FileTrie::open(dir.path()).unwrap();
        demo(&mut db);

        let found = db.prefixed("", 0, SortMode::KeyAsc).unwrap();
        let keys: Vec<&str> = found.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["Jane", "John Doe", "John Smith", "JohnDoe"]);

        let found = db.prefixed("", 0, SortMode::CountDesc).unwrap();
        assert_eq!(found[0].key, "John Smith");
        assert!(found.windows(2).all(|w| w[0].count >= w[1].count));

        let found = db.prefixed("j", 2, SortMode::ValueDesc).unwrap();
        let values: Vec<&Value> = found.iter().map(|e| &e.value).collect();
        assert_eq!(values, vec![&json!("john@doe.com"), &json!("j4ne@acme.com")]);
    }

    #[test]
    fn file_trie_should_fail_unsortable_values() {
        let dir = TempDir::new("file-trie-test").unwrap();
        let mut db = FileTrie::open(dir.path()).unwrap();
        db.insert("alpha", "text").unwrap();
        db.insert("beta", json!([1, 2])).unwrap();

        assert!(matches!(
            db.prefixed("", 0, SortMode::ValueAsc),
            Err(StoreError::UnsortableValue(_))
        ));
        assert_eq!(db.prefixed("", 0, SortMode::KeyAsc).unwrap().len(), 2);
    }

    #[test]
    fn file_trie_should_filter_results() {
        let dir = TempDir::new("file-trie-test").unwrap();
        let mut db = FileTrie::open(dir.path()).unwrap();
        demo(&mut db);

        let found = db
            .prefixed_filtered("john", 0, SortMode::KeyAsc, |_, _, count| count > 1)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, "John Smith");
        assert_eq!(found[0].count, 2);

        let mut seen = 0;
        let found = db
            .prefixed_filtered("", 2, SortMode::None, |key, _, _| {
                seen += 1;
                key.starts_with('J')
            })
            .unwrap();
        assert_eq!(found.len(), 2);
        assert!(seen >= 2);
    }

    #[test]
    fn file_trie_should_sample_from_pool() {
        let dir = TempDir::new("file-trie-test").unwrap();
        let mut db = OpenOptions::new()
            .random_pool_factor(3)
            .open(dir.path())
            .unwrap();

        for i in 0..40 {
            db.insert(&format!("key{i:02}"), i).unwrap();
        }

        let found = db.prefixed("key", 4, SortMode::Random).unwrap();
        assert_eq!(found.len(), 4);

        // the pool is the first 12 keys in scan order.
        let pool = db.prefixed("key", 12, SortMode::None).unwrap();
        for entry in &found {
            assert!(pool.contains(entry), "{} not in pool", entry.key);
        }

        db.set_random_pool_factor(100).unwrap();
        assert_eq!(db.random_pool_factor(), 100);
    }
}
