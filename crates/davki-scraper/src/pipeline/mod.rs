//! Item pipeline: stages applied in order to every scraped item.
//!
//! A stage passes the item on, drops it with a [`DropReason`], or fails the
//! whole run (output I/O errors).

mod duplicates;
mod validation;
mod writer;

use serde::Serialize;
use thiserror::Error;

use crate::item::ArticleItem;

pub use duplicates::DuplicatesPipeline;
pub use validation::{ValidationPipeline, DEFAULT_MIN_CONTENT_LENGTH};
pub use writer::{JsonWriterPipeline, OutputFormat};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropReason {
    #[error("duplicate url")]
    Duplicate,
    #[error("missing {0}")]
    MissingField(&'static str),
    #[error("content too short ({len} < {min} characters)")]
    ContentTooShort { len: usize, min: usize },
    #[error("not tax related")]
    NotTaxRelated,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Dropped item: {0}")]
    Drop(#[from] DropReason),
    #[error("Couldn't write output: {0}")]
    Io(#[from] std::io::Error),
    #[error("Couldn't serialize item: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait ItemPipeline: Send {
    fn open_spider(&mut self, _spider: &str) -> Result<(), PipelineError> {
        Ok(())
    }

    fn process_item(&mut self, item: ArticleItem) -> Result<ArticleItem, PipelineError>;

    fn close_spider(&mut self) -> Result<(), PipelineError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub received: usize,
    pub dropped: usize,
    pub accepted: usize,
}

/// Stages in priority order, an item dropped by one never reaches the next.
#[derive(Default)]
pub struct PipelineChain {
    stages: Vec<Box<dyn ItemPipeline>>,
    stats: PipelineStats,
}

impl PipelineChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage(mut self, stage: impl ItemPipeline + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn open_spider(&mut self, spider: &str) -> Result<(), PipelineError> {
        self.stats = PipelineStats::default();
        for stage in &mut self.stages {
            stage.open_spider(spider)?;
        }
        Ok(())
    }

    /// The item as it left the last stage, `None` when dropped.
    pub fn process(&mut self, mut item: ArticleItem) -> Result<Option<ArticleItem>, PipelineError> {
        self.stats.received += 1;
        let url = item.url.clone();

        for stage in &mut self.stages {
            item = match stage.process_item(item) {
                Ok(item) => item,
                Err(PipelineError::Drop(reason)) => {
                    log::info!("Dropped item {url}: {reason}");
                    self.stats.dropped += 1;
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };
        }

        self.stats.accepted += 1;
        Ok(Some(item))
    }

    pub fn close_spider(&mut self) -> Result<(), PipelineError> {
        for stage in &mut self.stages {
            stage.close_spider()?;
        }
        Ok(())
    }
}
