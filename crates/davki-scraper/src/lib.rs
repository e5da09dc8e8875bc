//! Scrapes Slovenian tax articles, classifies them by tax category and writes
//! them as JSON or JSON lines.

pub mod api;
pub mod classifier;
mod crawl;
mod error;
pub mod item;
pub mod pipeline;
pub mod recipes;
pub mod registry;
pub mod spider;
pub mod text;

pub use api::{DavkiScraper, ScrapeSettings};
pub use classifier::{Classification, KeywordTable, TaxCategory, TaxKeywordFilter};
pub use crawl::{SpiderScraper, SpiderScraperConfig};
pub use error::ScrapeError;
pub use item::ArticleItem;
pub use pipeline::OutputFormat;
pub use registry::{SpiderInfo, SpiderRegistry};
pub use spider::{Callback, Page, Politeness, SpiderBase, TaxSpider};

pub use anyhow;
