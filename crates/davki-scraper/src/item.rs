use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::classifier::TaxCategory;

pub const LANGUAGE: &str = "sl";
pub const SUMMARY_LENGTH: usize = 500;
const ID_LENGTH: usize = 16;

/// A scraped and classified article, the unit written to output files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleItem {
    pub id: String,
    pub source: String,
    pub url: String,
    pub title: String,
    pub content: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_html: Option<String>,
    pub category: TaxCategory,
    pub tax_topics: BTreeSet<String>,
    pub author: Option<String>,
    pub published_date: Option<String>,
    pub scraped_at: DateTime<Utc>,
    pub language: String,
}

impl ArticleItem {
    /// An empty item for `url`, stamped with the extraction time.
    pub fn new(source: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            source: source.into(),
            url: url.into(),
            title: String::new(),
            content: String::new(),
            summary: String::new(),
            raw_html: None,
            category: TaxCategory::General,
            tax_topics: BTreeSet::new(),
            author: None,
            published_date: None,
            scraped_at: Utc::now(),
            language: LANGUAGE.to_string(),
        }
    }
}

/// Fingerprint of an article, only depends on its URL.
pub fn item_id(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut id = format!("{digest:x}");
    id.truncate(ID_LENGTH);
    id
}
