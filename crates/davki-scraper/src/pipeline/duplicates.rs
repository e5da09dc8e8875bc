use std::collections::HashSet;

use super::{DropReason, ItemPipeline, PipelineError};
use crate::item::ArticleItem;

/// Drops items whose URL was already accepted during this run.
#[derive(Debug, Default)]
pub struct DuplicatesPipeline {
    seen: HashSet<String>,
}

impl DuplicatesPipeline {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ItemPipeline for DuplicatesPipeline {
    fn open_spider(&mut self, _spider: &str) -> Result<(), PipelineError> {
        self.seen.clear();
        Ok(())
    }

    fn process_item(&mut self, item: ArticleItem) -> Result<ArticleItem, PipelineError> {
        if self.seen.insert(item.url.clone()) {
            Ok(item)
        } else {
            Err(DropReason::Duplicate.into())
        }
    }
}
