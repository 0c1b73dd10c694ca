//! Stable id / fingerprint helpers, all blake3-backed for a consistent
//! hashing scheme across file, symbol, and content identifiers.

use crate::constants::STABLE_ID_VERSION;

/// Canonical `file_id` for a repository-relative path: a truncated blake3 hex
/// digest, stable across runs as long as the path doesn't change.
pub fn file_id(repo_relative_path: &str) -> String {
    let normalized = normalize_path(repo_relative_path);
    blake3::hash(normalized.as_bytes()).to_hex()[..32].to_string()
}

/// Content fingerprint over raw file bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Per-symbol id, scoped to a specific file + position so it changes when the
/// symbol moves within the file.
pub fn symbol_id(file_id: &str, kind: &str, line: u32, name: &str) -> String {
    let input = format!("{}|{}|{}|{}|{}", STABLE_ID_VERSION, file_id, kind, line, name);
    blake3::hash(input.as_bytes()).to_hex().to_string()
}

/// Normalize a path to forward slashes for hashing/classification so the same
/// logical file produces the same id regardless of platform path separators.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_id_is_deterministic() {
        assert_eq!(file_id("src/lib.rs"), file_id("src/lib.rs"));
    }

    #[test]
    fn file_id_normalizes_separators() {
        assert_eq!(file_id("src/lib.rs"), file_id("src\\lib.rs"));
    }

    #[test]
    fn file_id_differs_for_different_paths() {
        assert_ne!(file_id("src/lib.rs"), file_id("src/main.rs"));
    }

    #[test]
    fn content_hash_changes_with_bytes() {
        assert_ne!(content_hash(b"a"), content_hash(b"b"));
        assert_eq!(content_hash(b"a"), content_hash(b"a"));
    }

    #[test]
    fn symbol_id_changes_with_line() {
        let id1 = symbol_id("file1", "function", 10, "foo");
        let id2 = symbol_id("file1", "function", 20, "foo");
        assert_ne!(id1, id2);
    }
}
