use std::sync::Arc;

use serde::Serialize;

use crate::error::ScrapeError;
use crate::recipes;
use crate::spider::{Politeness, TaxSpider};

pub type SpiderFactory = fn() -> Arc<dyn TaxSpider>;

/// Spiders by name, in registration order.
#[derive(Debug, Clone)]
pub struct SpiderRegistry {
    factories: Vec<(&'static str, SpiderFactory)>,
}

impl Default for SpiderRegistry {
    fn default() -> Self {
        Self::empty()
            .register("fu_gov", fu_gov)
            .register("gov_si", gov_si)
            .register("racunovodja", racunovodja)
    }
}

fn fu_gov() -> Arc<dyn TaxSpider> {
    Arc::new(recipes::fu_gov())
}

fn gov_si() -> Arc<dyn TaxSpider> {
    Arc::new(recipes::gov_si())
}

fn racunovodja() -> Arc<dyn TaxSpider> {
    Arc::new(recipes::racunovodja())
}

impl SpiderRegistry {
    pub fn empty() -> Self {
        Self { factories: vec![] }
    }

    /// Registers `factory` under `name`, replacing any previous one.
    pub fn register(mut self, name: &'static str, factory: SpiderFactory) -> Self {
        match self.factories.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = factory,
            None => self.factories.push((name, factory)),
        }
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.factories.iter().map(|(name, _)| *name).collect()
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn TaxSpider>, ScrapeError> {
        self.factories
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, factory)| factory())
            .ok_or_else(|| ScrapeError::UnknownSpider {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    pub fn spiders(&self) -> impl Iterator<Item = Arc<dyn TaxSpider>> + '_ {
        self.factories.iter().map(|(_, factory)| factory())
    }
}

/// What `list` and `info` report about a spider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpiderInfo {
    pub name: String,
    pub description: String,
    pub source: String,
    pub allowed_domains: Vec<String>,
    pub start_urls: Vec<String>,
    pub politeness: Politeness,
}

impl From<&dyn TaxSpider> for SpiderInfo {
    fn from(spider: &dyn TaxSpider) -> Self {
        Self {
            name: spider.name().to_string(),
            description: spider.description().to_string(),
            source: spider.source().to_string(),
            allowed_domains: spider.allowed_domains().to_vec(),
            start_urls: spider.start_urls().to_vec(),
            politeness: spider.politeness(),
        }
    }
}
