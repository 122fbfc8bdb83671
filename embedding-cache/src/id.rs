//! Content addressing: deterministic ids from `(model, normalized text)`.
//!
//! Identical text and model produce identical ids on any host, which is what
//! lets embeddings deduplicate across branches and developers.

use sha2::{Digest, Sha256};

/// Trim and collapse whitespace runs to single spaces.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cache id: first 16 hex digits of `SHA-256("{model}:{normalize(text)}")`.
pub fn cache_id(model: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update(b":");
    hasher.update(normalize(text).as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

/// Text hash stored alongside the id (first 32 hex of the normalized text).
pub fn text_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize(text).as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..32].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize("  a \t b\n\nc  "), "a b c");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn id_is_deterministic_and_model_scoped() {
        let a = cache_id("nomic-embed-text", "hello world");
        let b = cache_id("nomic-embed-text", " hello   world ");
        let c = cache_id("all-minilm", "hello world");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn id_matches_reference_derivation() {
        use sha2::{Digest, Sha256};
        let mut h = Sha256::new();
        h.update(b"m:abc");
        let expected = format!("{:x}", h.finalize());
        assert_eq!(cache_id("m", "abc"), expected[..16]);
    }
}
