use std::cmp;
use std::collections::HashSet;
use std::future::Future;
use std::io::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Error, Result};
use flate2::read::GzDecoder;
use futures::stream::LocalBoxStream;
use futures::{future, try_join, Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::config::{CrawlerConfig, OnError, Throttle};
use crate::limiter::{RateLimitedExt, RateLimiter};
use crate::scrapable::{CountedTx, PageLocation, Request, Scrapable, ScrapingContext};

const POLL_DONE: Duration = Duration::from_millis(250);

#[derive(Debug)]
struct Page<C> {
    page: String,
    location: PageLocation,
    callback: C,
}

enum Fetched {
    Page(String),
    Status(StatusCode),
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<Fetched> {
    let resp = client.get(url).send().await?;

    let status = resp.status();
    if !status.is_success() {
        return Ok(Fetched::Status(status));
    }

    let page = match resp.headers().get(CONTENT_TYPE) {
        Some(c) if c == "application/x-gzip" || c == "application/gzip" => {
            let compressed = resp.bytes().await?;
            let mut gz = GzDecoder::new(&compressed[..]);
            let mut page = String::new();
            gz.read_to_string(&mut page)?;
            page
        }
        _ => resp.text().await?,
    };

    Ok(Fetched::Page(page))
}

async fn download<C>(
    client: &reqwest::Client,
    config: &CrawlerConfig,
    request: Request<C>,
) -> Result<Page<C>> {
    let Request { url, callback } = request;

    let mut attempt = 0;
    loop {
        let retry = match fetch(client, &url).await {
            Ok(Fetched::Page(page)) => {
                log::debug!("Downloaded {url}");
                return Ok(Page {
                    page,
                    location: PageLocation::Url(url),
                    callback,
                });
            }
            Ok(Fetched::Status(status)) if config.retry_http_codes.contains(&status.as_u16()) => {
                anyhow!("{url} responded with {status}")
            }
            Ok(Fetched::Status(status)) => return Err(anyhow!("{url} responded with {status}")),
            Err(e) => anyhow!("Couldn't download {url} got: {e}"),
        };

        if attempt >= config.retry_times {
            return Err(retry.context(format!("Gave up after {} retries", config.retry_times)));
        }
        attempt += 1;
        log::debug!("Retrying ({attempt}/{}): {retry}", config.retry_times);
        sleep(Duration::from_millis(500 * 2u64.pow(attempt - 1))).await;
    }
}

fn throttled<'a, C, St>(
    requests: St,
    client: &'a reqwest::Client,
    config: &'a CrawlerConfig,
    pages_in: Arc<AtomicUsize>,
) -> LocalBoxStream<'a, Result<Page<C>>>
where
    St: Stream<Item = Request<C>> + 'a,
    C: 'a,
{
    let downloads = requests.map(move |request| {
        let pages_in = pages_in.clone();
        async move {
            download(client, config, request).await.map_err(|e| {
                pages_in.fetch_sub(1, Ordering::SeqCst);
                e
            })
        }
    });

    match config.throttle {
        None => downloads
            .buffer_unordered(config.concurrent_downloads)
            .boxed_local(),
        Some(Throttle::Concurrent(n)) => downloads
            .buffer_unordered(cmp::min(n.get(), config.concurrent_downloads))
            .boxed_local(),
        Some(Throttle::PerSecond(n)) => downloads
            .rate_limited(RateLimiter::new(n.get()))
            .boxed_local(),
        Some(Throttle::Delay(secs)) => {
            let delay = Duration::from_secs_f32(secs);
            downloads
                .then(move |dl| async move {
                    sleep(delay).await;
                    dl.await
                })
                .boxed_local()
        }
    }
}

fn until_err<T, E>(
    err: &mut &mut Result<(), E>,
    item: Result<T, E>,
) -> impl Future<Output = Option<T>> {
    match item {
        Ok(item) => future::ready(Some(item)),
        Err(e) => {
            **err = Err(e);
            future::ready(None)
        }
    }
}

/// Crawls from the scraper's seed until no request is left in flight.
///
/// Requests are deduplicated by URL and filtered with [`Scrapable::accept`],
/// downloaded according to the crawler config then handed to
/// `crawler_conf.num_workers` threads, each owning its own scraper.
pub async fn crawl_site<T>(crawler_conf: &CrawlerConfig, scraper_conf: &T::Config) -> Result<()>
where
    T: Scrapable + 'static,
{
    crawler_conf.validate()?;

    let client = reqwest::ClientBuilder::new()
        .gzip(true)
        .deflate(true)
        .user_agent(crawler_conf.user_agent.as_str())
        .build()?;

    let pages_in = Arc::new(AtomicUsize::new(0));
    let pages_out = Arc::new(AtomicUsize::new(0));

    let (tx_stop, rx_stop) = crossbeam_channel::unbounded::<()>();
    let (tx_url, rx_url) = mpsc::unbounded_channel::<Request<T::Callback>>();
    let (tx_page, rx_page) =
        crossbeam_channel::bounded::<Page<T::Callback>>(crawler_conf.page_buffer);

    let tx_url = CountedTx::new(tx_url, pages_in.clone());

    // Workers

    let stop = Arc::new(AtomicBool::new(false));
    let mut workers = vec![];
    for id in 0..crawler_conf.num_workers {
        let rx_stop = rx_stop.clone();
        let rx_page = rx_page.clone();
        let tx_url = tx_url.clone();
        let pages_out = pages_out.clone();
        let scraper_conf = scraper_conf.clone();
        let on_scrap_error = crawler_conf.on_scrap_error;
        let stop = stop.clone();
        let worker = thread::Builder::new()
            .name(format!("{id}"))
            .spawn(move || {
                let mut scraper = <T as Scrapable>::new(&scraper_conf)?;
                loop {
                    crossbeam_channel::select! {
                        recv(rx_page) -> page => {
                            let Ok(Page { page, location, callback }) = page else {
                                break
                            };
                            let ctx = ScrapingContext::new(location.clone(), callback, tx_url.clone());
                            if let Err(e) = scraper.scrap(page, ctx) {
                                match on_scrap_error {
                                    OnError::SkipAndLog => {
                                        log::error!("Skipping scrap for page {location} got: {e}");
                                    }
                                    OnError::Fail => {
                                        stop.store(true, Ordering::SeqCst);
                                        return Err(e.context(format!("Couldn't scrap {location}")));
                                    }
                                }
                            }
                            pages_out.fetch_add(1, Ordering::SeqCst);
                        },
                        recv(rx_stop) -> _ => break
                    }
                }
                Ok::<(), Error>(())
            })?;
        workers.push(worker);
    }
    drop(rx_page);

    let workers = async move {
        tokio::task::spawn_blocking(|| {
            for w in workers {
                w.join().map_err(|_| anyhow!("Worker thread panicked"))??;
            }
            Ok::<(), Error>(())
        })
        .await?
    };

    // Seed

    let scraper = <T as Scrapable>::new(scraper_conf)?;
    for request in scraper.seed() {
        if scraper.accept(&request.url) {
            tx_url.send(request);
        } else {
            log::warn!("Seed URL not accepted: {}", request.url);
        }
    }
    drop(tx_url);

    // Downloader

    let scraper = &scraper;
    let client = &client;
    let pages_in_c = pages_in.clone();
    let pages_in_dl = pages_in.clone();
    let stop_c = stop.clone();
    let downloader = async move {
        let mut seen = HashSet::new();
        let requests = UnboundedReceiverStream::new(rx_url)
            .take_while(move |_| future::ready(!stop_c.load(Ordering::SeqCst)))
            .filter(move |request| {
                let keep = if !scraper.accept(&request.url) {
                    log::debug!("Skipping not accepted URL: {}", request.url);
                    false
                } else if !seen.insert(request.url.clone()) {
                    log::debug!("Skipping already requested URL: {}", request.url);
                    false
                } else {
                    true
                };
                if !keep {
                    pages_in_c.fetch_sub(1, Ordering::SeqCst);
                }
                future::ready(keep)
            });

        let stream = throttled(requests, client, crawler_conf, pages_in_dl);

        match crawler_conf.on_dl_error {
            OnError::Fail => {
                let mut err = Ok::<(), Error>(());
                stream
                    .scan(&mut err, until_err)
                    .for_each(|page| {
                        tx_page.send(page).ok();
                        future::ready(())
                    })
                    .await;
                err
            }
            OnError::SkipAndLog => {
                stream
                    .filter_map(|dl| async move {
                        dl.map_err(|e| log::warn!("Skipping URL: {e:#}")).ok()
                    })
                    .for_each(|page| {
                        tx_page.send(page).ok();
                        future::ready(())
                    })
                    .await;
                Ok(())
            }
        }
    };

    // Completion

    let done = async move {
        loop {
            if crawler_conf.handle_sigint {
                if let Ok(Ok(())) = timeout(POLL_DONE, tokio::signal::ctrl_c()).await {
                    stop.store(true, Ordering::SeqCst);
                    for _ in 0..crawler_conf.num_workers {
                        tx_stop.send(()).ok();
                    }
                    return Err::<(), _>(anyhow!("Interrupted"));
                }
            } else {
                sleep(POLL_DONE).await;
            }

            if stop.load(Ordering::SeqCst)
                || pages_out.load(Ordering::SeqCst) == pages_in.load(Ordering::SeqCst)
            {
                for _ in 0..crawler_conf.num_workers {
                    tx_stop.send(()).ok();
                }
                return Ok::<_, Error>(());
            }
        }
    };

    try_join!(workers, downloader, done)?;

    Ok(())
}
