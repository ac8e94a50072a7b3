//! Content hashing (xxh3). Used for change detection and backup checksums.

use xxhash_rust::xxh3::xxh3_64;

/// 64-bit xxh3 hash of a byte slice.
pub fn hash_content(bytes: &[u8]) -> u64 {
    xxh3_64(bytes)
}

/// Checksum string stored in backup records, e.g. `xxh3:00ff12ab34cd56ef`.
pub fn checksum(bytes: &[u8]) -> String {
    format!("xxh3:{:016x}", hash_content(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_stable_and_prefixed() {
        let a = checksum(b"const x = 1;\n");
        let b = checksum(b"const x = 1;\n");
        assert_eq!(a, b);
        assert!(a.starts_with("xxh3:"));
        assert_eq!(a.len(), "xxh3:".len() + 16);
        assert_ne!(a, checksum(b"const x = 2;\n"));
    }
}
