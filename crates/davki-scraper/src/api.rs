use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context};
use davki_crawler::{crawl_site, CrawlerConfig, PageLocation, Scrapable, ScrapingContext};
use tokio::runtime;

use crate::classifier::TaxKeywordFilter;
use crate::crawl::{SpiderScraper, SpiderScraperConfig};
use crate::error::ScrapeError;
use crate::item::ArticleItem;
use crate::pipeline::{
    DuplicatesPipeline, JsonWriterPipeline, OutputFormat, PipelineChain, ValidationPipeline,
    DEFAULT_MIN_CONTENT_LENGTH,
};
use crate::registry::{SpiderInfo, SpiderRegistry};
use crate::spider::{Callback, SpiderBase, TaxSpider};

#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    /// Drop items without any tax keyword
    pub filter_tax: bool,
    pub min_content_length: usize,
    pub keep_raw_html: bool,
    pub crawler: CrawlerConfig,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            format: OutputFormat::default(),
            filter_tax: false,
            min_content_length: DEFAULT_MIN_CONTENT_LENGTH,
            keep_raw_html: false,
            crawler: CrawlerConfig::default(),
        }
    }
}

/// Runs spiders end to end: crawl, classify, validate and write.
#[derive(Debug, Clone)]
pub struct DavkiScraper {
    settings: ScrapeSettings,
    registry: SpiderRegistry,
    classifier: Arc<TaxKeywordFilter>,
}

impl DavkiScraper {
    pub fn new(settings: ScrapeSettings) -> Self {
        Self {
            settings,
            registry: SpiderRegistry::default(),
            classifier: Arc::new(TaxKeywordFilter::default()),
        }
    }

    pub fn with_registry(mut self, registry: SpiderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_classifier(mut self, classifier: TaxKeywordFilter) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn settings(&self) -> &ScrapeSettings {
        &self.settings
    }

    pub fn registry(&self) -> &SpiderRegistry {
        &self.registry
    }

    pub fn list_spiders(&self) -> Vec<SpiderInfo> {
        self.registry
            .spiders()
            .map(|spider| SpiderInfo::from(spider.as_ref()))
            .collect()
    }

    pub fn spider_info(&self, name: &str) -> Result<SpiderInfo, ScrapeError> {
        let spider = self.registry.get(name)?;
        Ok(SpiderInfo::from(spider.as_ref()))
    }

    /// Common spider steps, bound to this scraper's classifier.
    pub fn spider_base(&self, spider: &dyn TaxSpider) -> SpiderBase {
        SpiderBase::new(spider, self.classifier.clone()).keep_raw_html(self.settings.keep_raw_html)
    }

    pub fn scrape(&self, name: &str) -> anyhow::Result<Vec<ArticleItem>> {
        let spider = self.registry.get(name)?;
        self.scrape_spider(spider)
    }

    /// Scrapes every registered spider, one after the other.
    pub fn scrape_all(&self) -> BTreeMap<String, anyhow::Result<Vec<ArticleItem>>> {
        self.registry
            .names()
            .into_iter()
            .map(|name| {
                let res = self.scrape(name);
                if let Err(e) = &res {
                    log::error!("Spider {name} failed: {e:#}");
                }
                (name.to_string(), res)
            })
            .collect()
    }

    /// Items accepted by the pipeline, in the order they were written.
    pub fn scrape_spider(&self, spider: Arc<dyn TaxSpider>) -> anyhow::Result<Vec<ArticleItem>> {
        let name = spider.name().to_string();
        log::info!("Starting spider {name}");

        let mut pipeline = self.pipeline();
        pipeline.open_spider(&name)?;

        let (tx_item, rx_item) = crossbeam_channel::unbounded::<ArticleItem>();
        let pipeline = thread::Builder::new()
            .name(format!("{name}-pipeline"))
            .spawn(move || {
                let mut accepted = vec![];
                for item in rx_item {
                    if let Some(item) = pipeline.process(item)? {
                        accepted.push(item);
                    }
                }
                pipeline.close_spider()?;
                Ok::<_, anyhow::Error>((accepted, pipeline.stats()))
            })?;

        let crawler_conf = spider.politeness().apply(&self.settings.crawler);
        let scraper_conf = SpiderScraperConfig {
            base: self.spider_base(spider.as_ref()),
            spider,
            tx_item,
        };

        let rt = runtime::Builder::new_multi_thread().enable_all().build()?;
        let crawled = rt.block_on(crawl_site::<SpiderScraper>(&crawler_conf, &scraper_conf));
        // Closes the item channel, workers dropped their senders already
        drop(scraper_conf);

        let (items, stats) = pipeline
            .join()
            .map_err(|_| anyhow!("Pipeline thread panicked"))??;
        crawled.with_context(|| format!("Spider {name} failed"))?;

        log::info!(
            "Spider {name} done: {} received, {} dropped, {} written",
            stats.received,
            stats.dropped,
            stats.accepted
        );
        Ok(items)
    }

    /// Runs the article parser of spider `name` on a single page, outside of
    /// a crawl. Items are finalized but not validated nor written.
    pub fn scrape_page(
        &self,
        name: &str,
        body: String,
        location: PageLocation,
    ) -> anyhow::Result<Vec<ArticleItem>> {
        let spider = self.registry.get(name)?;
        let (tx_item, rx_item) = crossbeam_channel::unbounded();
        let scraper_conf = SpiderScraperConfig {
            base: self.spider_base(spider.as_ref()),
            spider,
            tx_item,
        };

        let mut scraper = SpiderScraper::new(&scraper_conf)?;
        scraper.scrap(body, ScrapingContext::with_location(location, Callback::Article))?;
        Ok(rx_item.try_iter().collect())
    }

    fn pipeline(&self) -> PipelineChain {
        let mut validation = ValidationPipeline::new(self.settings.min_content_length);
        if self.settings.filter_tax {
            validation = validation.with_tax_filter(self.classifier.clone());
        }

        PipelineChain::new()
            .with_stage(DuplicatesPipeline::new())
            .with_stage(validation)
            .with_stage(JsonWriterPipeline::new(
                &self.settings.output_dir,
                self.settings.format,
            ))
    }

    /// Reads a JSON array or JSON lines output file.
    pub fn load_results(path: impl AsRef<Path>) -> anyhow::Result<Vec<ArticleItem>> {
        let path = path.as_ref();
        let data = fs_err::read_to_string(path)?;

        if data.trim_start().starts_with('[') {
            return serde_json::from_str(&data)
                .with_context(|| format!("Invalid JSON array in {}", path.display()));
        }

        data.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("Invalid item at {}:{}", path.display(), idx + 1))
            })
            .collect()
    }

    /// The most recently modified output file in `dir`.
    pub fn latest_results(dir: impl AsRef<Path>) -> anyhow::Result<Option<PathBuf>> {
        let pattern = dir.as_ref().join("*.json*");
        let pattern = pattern
            .to_str()
            .ok_or_else(|| anyhow!("Non UTF-8 directory: {}", dir.as_ref().display()))?;

        let mut latest = None;
        for path in glob::glob(pattern)? {
            let path = path?;
            if !matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("json" | "jsonl")
            ) {
                continue;
            }
            let modified = fs_err::metadata(&path)?.modified()?;
            if latest.as_ref().map_or(true, |(at, _)| modified > *at) {
                latest = Some((modified, path));
            }
        }

        Ok(latest.map(|(_, path)| path))
    }
}
