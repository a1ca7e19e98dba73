use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One row of the flyer catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: i64,
    pub category: String,
    pub subcategory: String,
    pub file_name: String,
    /// Path relative to the catalog root, `/`-separated.
    pub relative_path: String,
    /// Text recovered from the file name.
    pub extracted_text: String,
    pub keywords: Vec<String>,
    pub processed_at: DateTime<Utc>,
    pub file_size: u64,
    pub year: Option<i32>,
    pub series: Option<String>,
    pub platform: Option<String>,
    pub promotion: Option<String>,
    pub content_category: String,
    pub tone: String,
    /// Always within 0..=10.
    pub urgency: u8,
    /// SHA-256 of the file contents, hex encoded.
    pub content_hash: String,
}

impl CatalogRecord {
    /// Compute SHA-256 hash of content.
    pub fn compute_hash(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hex::encode(hasher.finalize())
    }

    /// Keywords as stored in the database.
    pub fn keywords_joined(&self) -> String {
        self.keywords.join(", ")
    }

    /// Inverse of [`keywords_joined`](Self::keywords_joined).
    pub fn split_keywords(joined: &str) -> Vec<String> {
        joined
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_hash() {
        assert_eq!(
            CatalogRecord::compute_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_split_keywords() {
        assert_eq!(
            CatalogRecord::split_keywords("futebol, vivo,,  "),
            vec!["futebol".to_string(), "vivo".to_string()]
        );
        assert!(CatalogRecord::split_keywords("").is_empty());
    }
}
