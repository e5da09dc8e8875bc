use std::sync::Arc;

use crossbeam_channel::Sender;
use davki_crawler::{Request, Scrapable, ScrapingContext};

use crate::item::ArticleItem;
use crate::spider::{Callback, Page, SpiderBase, TaxSpider};

#[derive(Debug, Clone)]
pub struct SpiderScraperConfig {
    pub spider: Arc<dyn TaxSpider>,
    pub base: SpiderBase,
    pub tx_item: Sender<ArticleItem>,
}

/// Runs a [`TaxSpider`] inside the crawler, items go to `tx_item`.
pub struct SpiderScraper {
    spider: Arc<dyn TaxSpider>,
    base: SpiderBase,
    tx_item: Sender<ArticleItem>,
}

impl Scrapable for SpiderScraper {
    type Config = SpiderScraperConfig;
    type Callback = Callback;

    fn new(config: &SpiderScraperConfig) -> anyhow::Result<Self> {
        Ok(Self {
            spider: config.spider.clone(),
            base: config.base.clone(),
            tx_item: config.tx_item.clone(),
        })
    }

    fn seed(&self) -> Vec<Request<Callback>> {
        self.spider
            .start_urls()
            .iter()
            .map(|url| Request::new(url.as_str(), Callback::ArticleList))
            .collect()
    }

    fn accept(&self, url: &str) -> bool {
        self.spider.is_allowed(url)
    }

    fn scrap(&mut self, page: String, ctx: ScrapingContext<Callback>) -> anyhow::Result<()> {
        let page = Page::from_location(ctx.location(), page)?;

        match ctx.callback() {
            Callback::ArticleList => {
                for request in self.spider.parse_article_list(&page) {
                    ctx.send_request(request);
                }
            }
            Callback::Article => {
                for item in self.spider.parse_article(&page, &self.base) {
                    self.tx_item
                        .send(item)
                        .map_err(|_| anyhow::anyhow!("Item pipeline is closed"))?;
                }
            }
        }

        Ok(())
    }
}
