//! Key sanitizing.

/// Normalize a key into the form used on the filesystem.
///
/// Only ASCII letters and digits survive, lowercased. Dots are dropped
/// along with every other punctuation character, so leading, trailing or
/// repeated dots never reach a path. An empty result marks the key as
/// unusable for storage.
pub fn sanitize(key: impl AsRef<str>) -> String {
    key.as_ref()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
