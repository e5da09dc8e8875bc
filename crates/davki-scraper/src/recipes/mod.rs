//! Site recipes: a selectors table per site and one shared parser.

pub mod selectors;
mod sites;

use regex::Regex;

use crate::item::ArticleItem;
use crate::spider::{Callback, Page, Politeness, SpiderBase, SpiderRequest, TaxSpider};
use crate::text::normalize_date;
use selectors::{compile, first_all, first_paragraphs, first_value, Extractor};

pub use sites::{fu_gov, gov_si, racunovodja};

/// Static description of a site, see [`SiteRecipe::new`].
#[derive(Debug, Clone, Copy)]
pub struct RecipeSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub source: &'static str,
    pub allowed_domains: &'static [&'static str],
    pub start_urls: &'static [&'static str],
    /// Article links must match it when set
    pub article_pattern: Option<&'static str>,
    pub selectors: SelectorSpec,
    pub politeness: PolitenessSpec,
}

/// Extractors for each field, most specific first.
#[derive(Debug, Clone, Copy)]
pub struct SelectorSpec {
    pub article_links: &'static [&'static str],
    pub next_page: &'static [&'static str],
    pub title: &'static [&'static str],
    pub content: &'static [&'static str],
    pub author: &'static [&'static str],
    pub date: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct PolitenessSpec {
    pub download_delay: f32,
    pub concurrent_requests: usize,
}

#[derive(Debug, Clone)]
struct Selectors {
    article_links: Vec<Extractor>,
    next_page: Vec<Extractor>,
    title: Vec<Extractor>,
    content: Vec<Extractor>,
    author: Vec<Extractor>,
    date: Vec<Extractor>,
}

impl From<&SelectorSpec> for Selectors {
    fn from(spec: &SelectorSpec) -> Self {
        Self {
            article_links: compile(spec.article_links),
            next_page: compile(spec.next_page),
            title: compile(spec.title),
            content: compile(spec.content),
            author: compile(spec.author),
            date: compile(spec.date),
        }
    }
}

/// A [`TaxSpider`] driven by a selectors table.
#[derive(Debug, Clone)]
pub struct SiteRecipe {
    name: String,
    description: String,
    source: String,
    allowed_domains: Vec<String>,
    start_urls: Vec<String>,
    article_pattern: Option<Regex>,
    selectors: Selectors,
    politeness: Politeness,
}

impl SiteRecipe {
    pub fn new(spec: &RecipeSpec) -> Self {
        let article_pattern = spec.article_pattern.and_then(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                log::warn!("Ignoring invalid article pattern for {}: {e}", spec.name);
                None
            }
        });

        Self {
            name: spec.name.to_string(),
            description: spec.description.to_string(),
            source: spec.source.to_string(),
            allowed_domains: spec.allowed_domains.iter().map(|d| d.to_string()).collect(),
            start_urls: spec.start_urls.iter().map(|u| u.to_string()).collect(),
            article_pattern,
            selectors: Selectors::from(&spec.selectors),
            politeness: Politeness {
                download_delay: spec.politeness.download_delay,
                concurrent_requests: spec.politeness.concurrent_requests,
                ..Politeness::default()
            },
        }
    }

    pub fn with_start_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.start_urls = urls.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_allowed_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_politeness(mut self, politeness: Politeness) -> Self {
        self.politeness = politeness;
        self
    }

    fn is_article_url(&self, url: &str) -> bool {
        self.article_pattern
            .as_ref()
            .map_or(true, |pattern| pattern.is_match(url))
    }
}

impl TaxSpider for SiteRecipe {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn allowed_domains(&self) -> &[String] {
        &self.allowed_domains
    }

    fn start_urls(&self) -> &[String] {
        &self.start_urls
    }

    fn politeness(&self) -> Politeness {
        self.politeness.clone()
    }

    fn parse_article_list(&self, page: &Page) -> Vec<SpiderRequest> {
        let html = page.html();
        let mut requests = vec![];

        for href in first_all(&self.selectors.article_links, html) {
            let Some(url) = page.absolute_url(&href) else {
                continue;
            };
            if self.is_allowed(url.as_str()) && self.is_article_url(url.as_str()) {
                requests.push(SpiderRequest::new(url, Callback::Article));
            }
        }

        for href in first_all(&self.selectors.next_page, html) {
            match page.absolute_url(&href) {
                Some(url) if self.is_allowed(url.as_str()) => {
                    requests.push(SpiderRequest::new(url, Callback::ArticleList));
                }
                _ => (),
            }
        }

        log::debug!(
            "{}: {} requests from listing {}",
            self.name,
            requests.len(),
            page.url()
        );
        requests
    }

    fn parse_article(&self, page: &Page, base: &SpiderBase) -> Vec<ArticleItem> {
        let html = page.html();

        let Some(content) = first_paragraphs(&self.selectors.content, html) else {
            log::debug!("{}: no article content on {}", self.name, page.url());
            return vec![];
        };

        let mut item = base.new_item(page);
        item.title = first_value(&self.selectors.title, html).unwrap_or_default();
        item.content = content;
        item.author = first_value(&self.selectors.author, html);
        item.published_date =
            first_value(&self.selectors.date, html).and_then(|date| normalize_date(&date));

        vec![base.finalize(item)]
    }
}
