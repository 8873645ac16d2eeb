//! A prefix tree that is never loaded into memory.
//!
//! Keys are sanitized, truncated and cut into short pieces which become
//! directories under `{store}/root`; the last piece names a JSON leaf file
//! holding every original key that encodes to it. Lookups, inserts and
//! prefix scans are plain directory and file operations.
//!
//! ```no_run
//! use filetrie::{FileTrie, SortMode, Trie};
//!
//! let mut trie = FileTrie::open("contacts")?;
//! trie.insert("John Doe", "john@doe.com")?;
//! trie.insert("Jane", "j4ne@acme.com")?;
//!
//! assert!(trie.has("jane")?);
//! for entry in trie.prefixed("j", 10, SortMode::KeyAsc)? {
//!     println!("{} => {}", entry.key, entry.value);
//! }
//! # Ok::<(), filetrie::StoreError>(())
//! ```
//!
//! A store performs no locking. Mutating one store directory from several
//! threads or processes at once is undefined; serialize access yourself or,
//! within a process, share a [`SharedTrie`].

pub mod store;
pub mod utils;

pub use store::error::{Result, StoreError};
pub use store::sort::{Entry, SortMode};
pub use store::storage::{FileTrie, Trie};
pub use store::{OpenOptions, SharedTrie};
pub use utils::sanitize::sanitize;
