use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

/// Scraping logic plugged into [`crawl_site`](crate::crawl_site).
///
/// One instance is created per worker thread, plus one for seeding and
/// filtering URLs, so instances must be cheap to build from `Config`.
pub trait Scrapable {
    type Config: Clone + Send + 'static;

    /// Tag carried by each request, handed back with the downloaded page.
    type Callback: Clone + Send + fmt::Debug + 'static;

    fn new(config: &Self::Config) -> anyhow::Result<Self>
    where
        Self: Sized;

    fn seed(&self) -> Vec<Request<Self::Callback>>;

    fn accept(&self, url: &str) -> bool;

    fn scrap(
        &mut self,
        page: String,
        ctx: ScrapingContext<Self::Callback>,
    ) -> anyhow::Result<()>;
}

/// A page to fetch, tagged with the callback that will parse it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request<C> {
    pub url: String,
    pub callback: C,
}

impl<C> Request<C> {
    pub fn new(url: impl Into<String>, callback: C) -> Self {
        Self {
            url: url.into(),
            callback,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLocation {
    Url(String),
    Path(PathBuf),
}

impl PageLocation {
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Url(url) => Some(url),
            Self::Path(_) => None,
        }
    }
}

impl fmt::Display for PageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug)]
pub struct CountedTx<C> {
    tx: mpsc::UnboundedSender<Request<C>>,
    counter: Arc<AtomicUsize>,
}

// Not derived, `C` itself doesn't need to be `Clone`
impl<C> Clone for CountedTx<C> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            counter: self.counter.clone(),
        }
    }
}

impl<C> CountedTx<C> {
    pub fn new(tx: mpsc::UnboundedSender<Request<C>>, counter: Arc<AtomicUsize>) -> Self {
        Self { tx, counter }
    }

    pub fn send(&self, request: Request<C>) {
        // Counted before sending so the crawler never sees in == out while
        // the request is in flight
        self.counter.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.tx.send(request) {
            self.counter.fetch_sub(1, Ordering::SeqCst);
            log::error!("Couldn't send request for {}", e.0.url);
        }
    }
}

/// What a scraper knows about the page it is scraping.
#[derive(Debug, Clone)]
pub struct ScrapingContext<C> {
    location: PageLocation,
    callback: C,
    tx_request: Option<CountedTx<C>>,
}

impl<C> ScrapingContext<C> {
    pub fn new(location: PageLocation, callback: C, tx_request: CountedTx<C>) -> Self {
        Self {
            location,
            callback,
            tx_request: Some(tx_request),
        }
    }

    /// Context for a page scraped outside of a crawl, follow-up requests are
    /// discarded.
    pub fn with_location(location: PageLocation, callback: C) -> Self {
        Self {
            location,
            callback,
            tx_request: None,
        }
    }

    pub fn location(&self) -> &PageLocation {
        &self.location
    }

    pub fn callback(&self) -> &C {
        &self.callback
    }

    pub fn send_request(&self, request: Request<C>) {
        match &self.tx_request {
            Some(tx) => tx.send(request),
            None => log::debug!("Not crawling, ignoring request for {}", request.url),
        }
    }
}
