use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use davki_crawler::{crawl_site, CrawlerConfig, Request, Scrapable, ScrapingContext, Throttle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Index,
    Leaf,
}

#[derive(Clone)]
struct LinesConfig {
    base: String,
    seed: Vec<String>,
    visited: Arc<Mutex<Vec<(String, Kind)>>>,
}

/// Pages are plain text, each `index:/path` or `leaf:/path` line is a link.
struct LinesScraper {
    config: LinesConfig,
}

impl Scrapable for LinesScraper {
    type Config = LinesConfig;
    type Callback = Kind;

    fn new(config: &Self::Config) -> anyhow::Result<Self> {
        Ok(Self {
            config: config.clone(),
        })
    }

    fn seed(&self) -> Vec<Request<Kind>> {
        self.config
            .seed
            .iter()
            .map(|path| Request::new(format!("{}{path}", self.config.base), Kind::Index))
            .collect()
    }

    fn accept(&self, url: &str) -> bool {
        url.starts_with(&self.config.base)
    }

    fn scrap(&mut self, page: String, ctx: ScrapingContext<Kind>) -> anyhow::Result<()> {
        let url = ctx.location().url().unwrap_or_default().to_string();
        self.config
            .visited
            .lock()
            .unwrap()
            .push((url, *ctx.callback()));

        for line in page.lines() {
            let (kind, link) = match line.split_once(':') {
                Some(("index", path)) => (Kind::Index, path),
                Some(("leaf", path)) => (Kind::Leaf, path),
                Some(("external", url)) => {
                    ctx.send_request(Request::new(format!("http:{url}"), Kind::Leaf));
                    continue;
                }
                _ => continue,
            };
            ctx.send_request(Request::new(
                format!("{}{link}", self.config.base),
                kind,
            ));
        }
        Ok(())
    }
}

fn quiet_config() -> CrawlerConfig {
    CrawlerConfig {
        num_workers: 2,
        handle_sigint: false,
        ..Default::default()
    }
}

#[tokio::test]
async fn follows_links_once_per_url() {
    let mut server = mockito::Server::new_async().await;
    let index = server
        .mock("GET", "/index")
        .with_body("leaf:/a\nleaf:/b\nleaf:/a\nindex:/page2\nindex:/index\nexternal://elsewhere.invalid/x")
        .expect(1)
        .create_async()
        .await;
    let page2 = server
        .mock("GET", "/page2")
        .with_body("leaf:/b\nleaf:/c\nindex:/index")
        .expect(1)
        .create_async()
        .await;
    let leaves = server
        .mock("GET", mockito::Matcher::Regex(r"^/[abc]$".into()))
        .with_body("nothing to see")
        .expect(3)
        .create_async()
        .await;

    let visited = Arc::new(Mutex::new(vec![]));
    let scraper_conf = LinesConfig {
        base: server.url(),
        seed: vec!["/index".into()],
        visited: visited.clone(),
    };

    crawl_site::<LinesScraper>(&quiet_config(), &scraper_conf)
        .await
        .unwrap();

    index.assert_async().await;
    page2.assert_async().await;
    leaves.assert_async().await;

    let mut visited = visited.lock().unwrap().clone();
    visited.sort_by(|a, b| a.0.cmp(&b.0));
    let base = server.url();
    assert_eq!(
        visited,
        vec![
            (format!("{base}/a"), Kind::Leaf),
            (format!("{base}/b"), Kind::Leaf),
            (format!("{base}/c"), Kind::Leaf),
            (format!("{base}/index"), Kind::Index),
            (format!("{base}/page2"), Kind::Index),
        ]
    );
}

#[tokio::test]
async fn retries_configured_status_codes() {
    let mut server = mockito::Server::new_async().await;
    let flaky = server
        .mock("GET", "/index")
        .with_status(503)
        .expect(2)
        .create_async()
        .await;

    let visited = Arc::new(Mutex::new(vec![]));
    let scraper_conf = LinesConfig {
        base: server.url(),
        seed: vec!["/index".into()],
        visited: visited.clone(),
    };
    let crawler_conf = CrawlerConfig {
        retry_times: 1,
        ..quiet_config()
    };

    crawl_site::<LinesScraper>(&crawler_conf, &scraper_conf)
        .await
        .unwrap();

    flaky.assert_async().await;
    assert!(visited.lock().unwrap().is_empty());
}

#[tokio::test]
async fn does_not_retry_other_status_codes() {
    let mut server = mockito::Server::new_async().await;
    let missing = server
        .mock("GET", "/index")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;

    let scraper_conf = LinesConfig {
        base: server.url(),
        seed: vec!["/index".into()],
        visited: Arc::new(Mutex::new(vec![])),
    };

    crawl_site::<LinesScraper>(&quiet_config(), &scraper_conf)
        .await
        .unwrap();

    missing.assert_async().await;
}

#[tokio::test]
async fn empty_seed_finishes() {
    let scraper_conf = LinesConfig {
        base: "http://127.0.0.1:9".into(),
        seed: vec![],
        visited: Arc::new(Mutex::new(vec![])),
    };

    crawl_site::<LinesScraper>(&quiet_config(), &scraper_conf)
        .await
        .unwrap();
}

#[tokio::test]
async fn rejects_invalid_config() {
    let scraper_conf = LinesConfig {
        base: "http://127.0.0.1:9".into(),
        seed: vec!["/index".into()],
        visited: Arc::new(Mutex::new(vec![])),
    };
    let crawler_conf = CrawlerConfig {
        concurrent_downloads: 0,
        ..quiet_config()
    };

    let err = crawl_site::<LinesScraper>(&crawler_conf, &scraper_conf)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("concurrentDownloads"));
}

async fn crawl_three_pages(crawler_conf: CrawlerConfig) -> (Duration, usize) {
    let mut server = mockito::Server::new_async().await;
    let index = server
        .mock("GET", "/index")
        .with_body("leaf:/a\nleaf:/b")
        .expect(1)
        .create_async()
        .await;
    let leaves = server
        .mock("GET", mockito::Matcher::Regex(r"^/[ab]$".into()))
        .with_body("nothing to see")
        .expect(2)
        .create_async()
        .await;

    let visited = Arc::new(Mutex::new(vec![]));
    let scraper_conf = LinesConfig {
        base: server.url(),
        seed: vec!["/index".into()],
        visited: visited.clone(),
    };

    let start = Instant::now();
    crawl_site::<LinesScraper>(&crawler_conf, &scraper_conf)
        .await
        .unwrap();
    let elapsed = start.elapsed();

    index.assert_async().await;
    leaves.assert_async().await;
    let count = visited.lock().unwrap().len();
    (elapsed, count)
}

#[tokio::test]
async fn delay_throttle_spaces_downloads() {
    let crawler_conf = CrawlerConfig {
        throttle: Some(Throttle::Delay(0.2)),
        ..quiet_config()
    };

    let (elapsed, visited) = crawl_three_pages(crawler_conf).await;

    assert_eq!(3, visited);
    // One delay before each of the 3 downloads
    assert!(elapsed >= Duration::from_millis(600), "{elapsed:?}");
}

#[tokio::test]
async fn per_second_throttle_waits_for_refills() {
    let crawler_conf = CrawlerConfig {
        throttle: Some(Throttle::PerSecond(NonZeroUsize::new(1).unwrap())),
        ..quiet_config()
    };

    let (elapsed, visited) = crawl_three_pages(crawler_conf).await;

    assert_eq!(3, visited);
    // Index right away, then one leaf per refill
    assert!(elapsed >= Duration::from_millis(1500), "{elapsed:?}");
}
