use std::sync::Arc;

use super::{DropReason, ItemPipeline, PipelineError};
use crate::classifier::{TaxKeywordFilter, DEFAULT_MIN_MATCHES};
use crate::item::ArticleItem;

pub const DEFAULT_MIN_CONTENT_LENGTH: usize = 100;

/// Drops incomplete items and, when a tax filter is set, off-topic ones.
#[derive(Debug, Clone)]
pub struct ValidationPipeline {
    min_content_length: usize,
    tax_filter: Option<Arc<TaxKeywordFilter>>,
}

impl Default for ValidationPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CONTENT_LENGTH)
    }
}

impl ValidationPipeline {
    pub fn new(min_content_length: usize) -> Self {
        Self {
            min_content_length,
            tax_filter: None,
        }
    }

    /// Only keep items with at least one tax keyword.
    pub fn with_tax_filter(mut self, classifier: Arc<TaxKeywordFilter>) -> Self {
        self.tax_filter = Some(classifier);
        self
    }

    fn validate(&self, item: &ArticleItem) -> Result<(), DropReason> {
        if item.url.trim().is_empty() {
            return Err(DropReason::MissingField("url"));
        }
        if item.title.trim().is_empty() {
            return Err(DropReason::MissingField("title"));
        }

        let len = item.content.chars().count();
        if len < self.min_content_length {
            return Err(DropReason::ContentTooShort {
                len,
                min: self.min_content_length,
            });
        }

        if let Some(classifier) = &self.tax_filter {
            let text = format!("{}\n{}", item.title, item.content);
            if !classifier.is_tax_related(&text, DEFAULT_MIN_MATCHES) {
                return Err(DropReason::NotTaxRelated);
            }
        }

        Ok(())
    }
}

impl ItemPipeline for ValidationPipeline {
    fn process_item(&mut self, item: ArticleItem) -> Result<ArticleItem, PipelineError> {
        self.validate(&item)?;
        Ok(item)
    }
}
