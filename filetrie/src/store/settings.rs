//! Default settings and on-disk names.

/// Suffix appended to every leaf file; must include the dot for real extensions.
pub const DEFAULT_FILE_SUFFIX: &str = ".json";

/// Maximum characters per directory segment.
pub const DEFAULT_PIECE_LENGTH: usize = 3;

/// Maximum sanitized key length used for paths, 0 for no limit.
pub const DEFAULT_KEY_LENGTH_LIMIT: usize = 20;

/// Candidate pool multiplier for random sampling.
pub const DEFAULT_RANDOM_POOL_FACTOR: usize = 10;

/// Name of the metadata document inside the store directory.
pub const METADATA_FILE_NAME: &str = "filetrie";

/// Name of the directory holding the trie nodes.
pub const ROOT_NODE: &str = "root";

/// Longest file name most filesystems accept.
pub const MAX_FILENAME_LEN: usize = 255;

/// Current metadata format version.
pub const METADATA_VERSION: u32 = 1;
