use std::cmp;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use davki_crawler::{CrawlerConfig, PageLocation, Request, Throttle};
use scraper::Html;
use serde::Serialize;
use url::Url;

use crate::classifier::TaxKeywordFilter;
use crate::item::{item_id, ArticleItem, SUMMARY_LENGTH};
use crate::text::truncate;

/// Which parser handles a downloaded page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Callback {
    ArticleList,
    Article,
}

pub type SpiderRequest = Request<Callback>;

/// A downloaded page, parsed once and shared by every selector.
pub struct Page {
    url: Url,
    body: String,
    html: Html,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page").field("url", &self.url.as_str()).finish()
    }
}

impl Page {
    pub fn new(url: Url, body: String) -> Self {
        let html = Html::parse_document(&body);
        Self { url, body, html }
    }

    pub fn parse(url: &str, body: String) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(url)?, body))
    }

    pub fn from_location(location: &PageLocation, body: String) -> anyhow::Result<Self> {
        let url = match location {
            PageLocation::Url(url) => Url::parse(url)?,
            PageLocation::Path(path) => file_url(path)?,
        };
        Ok(Self::new(url, body))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Resolves `href` against the page URL, only http(s) links are kept.
    pub fn absolute_url(&self, href: &str) -> Option<Url> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return None;
        }
        let mut url = self.url.join(href).ok()?;
        url.set_fragment(None);
        matches!(url.scheme(), "http" | "https").then_some(url)
    }
}

fn file_url(path: &Path) -> anyhow::Result<Url> {
    let path = fs_err::canonicalize(path)?;
    Url::from_file_path(&path)
        .map_err(|()| anyhow::anyhow!("Couldn't build an URL for {}", path.display()))
}

/// Crawl settings handed over to the crawler, per site.
///
/// Retries left unset keep the crawler config values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Politeness {
    /// Seconds between two requests, 0 to disable
    pub download_delay: f32,
    /// Upper bound on concurrent downloads
    pub concurrent_requests: usize,
    pub retry_times: Option<u32>,
    pub retry_http_codes: Option<Vec<u16>>,
}

impl Default for Politeness {
    fn default() -> Self {
        Self {
            download_delay: 1.0,
            concurrent_requests: 4,
            retry_times: None,
            retry_http_codes: None,
        }
    }
}

impl Politeness {
    /// `config` restricted by the site settings, a site can lower the
    /// concurrency but never raise it.
    pub fn apply(&self, config: &CrawlerConfig) -> CrawlerConfig {
        let mut config = config.clone();
        config.concurrent_downloads =
            cmp::min(config.concurrent_downloads, self.concurrent_requests).max(1);
        if let Some(retry_times) = self.retry_times {
            config.retry_times = retry_times;
        }
        if let Some(retry_http_codes) = &self.retry_http_codes {
            config.retry_http_codes = retry_http_codes.clone();
        }
        if self.download_delay > 0.0 {
            config.throttle = Some(Throttle::Delay(self.download_delay));
        }
        config
    }
}

/// A site specific crawler.
///
/// Implementors only locate data on their site's markup, field population and
/// classification are done by [`SpiderBase`].
pub trait TaxSpider: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Domain recorded as the `source` of every item.
    fn source(&self) -> &str;

    fn allowed_domains(&self) -> &[String];

    fn start_urls(&self) -> &[String];

    fn politeness(&self) -> Politeness {
        Politeness::default()
    }

    /// Whether `url` is on one of the allowed domains or their subdomains.
    fn is_allowed(&self, url: &str) -> bool {
        let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_string)) else {
            return false;
        };
        self.allowed_domains().iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|sub| sub.ends_with('.'))
        })
    }

    /// Requests for the articles and the next listing pages linked from `page`.
    fn parse_article_list(&self, page: &Page) -> Vec<SpiderRequest>;

    /// Finalized items found on an article page, none when the page has no
    /// article content.
    fn parse_article(&self, page: &Page, base: &SpiderBase) -> Vec<ArticleItem>;
}

/// Fields and steps common to every spider.
#[derive(Debug, Clone)]
pub struct SpiderBase {
    source: String,
    classifier: Arc<TaxKeywordFilter>,
    keep_raw_html: bool,
}

impl SpiderBase {
    pub fn new(spider: &dyn TaxSpider, classifier: Arc<TaxKeywordFilter>) -> Self {
        Self {
            source: spider.source().to_string(),
            classifier,
            keep_raw_html: false,
        }
    }

    pub fn keep_raw_html(mut self, keep: bool) -> Self {
        self.keep_raw_html = keep;
        self
    }

    /// An item for `page` with source, extraction time and language set.
    pub fn new_item(&self, page: &Page) -> ArticleItem {
        let mut item = ArticleItem::new(&self.source, page.url().as_str());
        if self.keep_raw_html {
            item.raw_html = Some(page.body().to_string());
        }
        item
    }

    /// Sets id, summary, category and topics, once every other field is known.
    pub fn finalize(&self, mut item: ArticleItem) -> ArticleItem {
        item.id = item_id(&item.url);
        item.summary = truncate(&item.content, SUMMARY_LENGTH);

        let classification = self
            .classifier
            .classify(&format!("{}\n{}", item.title, item.content));
        item.category = classification.category;
        item.tax_topics = classification.tax_topics;

        item
    }
}
