//! Content hashing for chunk dedup
//!
//! Identity key: SHA-256 over NFKC-normalized, whitespace-collapsed,
//! trimmed text. Case is preserved so "FAQ" and "faq" stay distinct.
//! Vector-store keys are `{agent_id}_{document_id}_{content_hash}`.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

/// NFKC-normalize, collapse internal whitespace to single spaces, trim.
pub fn normalize_for_hash(text: &str) -> String {
    let normalized: String = text.nfkc().collect();
    normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Hex SHA-256 of the normalized content
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_for_hash(text).as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// Vector-store entry key for a chunk
pub fn chunk_key(agent_id: &str, document_id: &str, content_hash: &str) -> String {
    format!("{}_{}_{}", agent_id, document_id, content_hash)
}

/// Keys present before ingestion but absent from the current run:
/// `existing \ current`.
pub fn find_stale_keys(existing: &[String], current: &[String]) -> Vec<String> {
    let current: HashSet<&str> = current.iter().map(|k| k.as_str()).collect();
    existing
        .iter()
        .filter(|k| !current.contains(k.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_collapse() {
        assert_eq!(
            normalize_for_hash("  hello   world \n\t again  "),
            "hello world again"
        );
    }

    #[test]
    fn test_case_preserved() {
        assert_ne!(content_hash("Hello"), content_hash("hello"));
    }

    #[test]
    fn test_nfkc_equivalence() {
        // U+FB01 LATIN SMALL LIGATURE FI normalizes to "fi" under NFKC.
        assert_eq!(content_hash("ﬁle"), content_hash("file"));
        // Composed vs decomposed é.
        assert_eq!(content_hash("caf\u{00e9}"), content_hash("cafe\u{0301}"));
    }

    #[test]
    fn test_hash_stable_across_surrounding_whitespace() {
        let a = content_hash("chunk body text");
        let b = content_hash("  chunk   body\ntext ");
        assert_eq!(a, b);
    }

    #[test]
    fn test_scripts() {
        // Devanagari, Tamil, and mixed-script content all hash deterministically.
        let hindi = "सोने पर ऋण की ब्याज दर नौ प्रतिशत है";
        let tamil = "தங்கக் கடன் வட்டி விகிதம் ஒன்பது சதவீதம்";
        let mixed = "Interest दर is 9% for தங்கம் loans";

        for text in [hindi, tamil, mixed] {
            assert_eq!(content_hash(text), content_hash(&format!("  {}  ", text)));
            assert_eq!(content_hash(text).len(), 64);
        }
        assert_ne!(content_hash(hindi), content_hash(tamil));
    }

    #[test]
    fn test_chunk_key_shape() {
        let key = chunk_key("agent1", "doc9", "abc123");
        assert_eq!(key, "agent1_doc9_abc123");
    }

    #[test]
    fn test_find_stale_keys() {
        let existing = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let current = vec!["b".to_string(), "d".to_string()];
        let stale = find_stale_keys(&existing, &current);
        assert_eq!(stale, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_no_stale_on_identical_sets() {
        let keys = vec!["k1".to_string(), "k2".to_string()];
        assert!(find_stale_keys(&keys, &keys).is_empty());
    }
}
