use std::sync::Arc;
use std::time::Duration;

use davki_crawler::{CrawlerConfig, PageLocation};
use davki_scraper::recipes;
use davki_scraper::{
    ArticleItem, DavkiScraper, OutputFormat, Politeness, ScrapeError, ScrapeSettings,
    SpiderRegistry, TaxCategory, TaxSpider,
};

fn settings(dir: &std::path::Path) -> ScrapeSettings {
    ScrapeSettings {
        output_dir: dir.to_path_buf(),
        crawler: CrawlerConfig {
            num_workers: 2,
            handle_sigint: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn local_recipe(base: &str) -> Arc<dyn TaxSpider> {
    Arc::new(
        recipes::racunovodja()
            .with_start_urls([format!("{base}/clanki/")])
            .with_allowed_domains(["127.0.0.1"])
            .with_politeness(Politeness {
                download_delay: 0.0,
                concurrent_requests: 2,
                retry_times: Some(0),
                ..Default::default()
            }),
    )
}

const LISTING: &str = r#"
<h2 class="entry-title"><a href="/clanki/normiranci/">Normiranci</a></h2>
<h2 class="entry-title"><a href="/clanki/normiranci/">Normiranci again</a></h2>
<h2 class="entry-title"><a href="/clanki/kratko/">Kratko</a></h2>
<h2 class="entry-title"><a href="/clanki/vreme/">Vreme</a></h2>
<h2 class="entry-title"><a href="https://www.racunovodja.com/clanki/zunaj/">Zunaj</a></h2>
<a class="next page-numbers" href="/clanki/page/2/">Naprej</a>
"#;

const LISTING_2: &str = r#"
<h2 class="entry-title"><a href="/clanki/druzbe/">Družbe</a></h2>
<a class="next page-numbers" href="/clanki/">Nazaj na prvo stran</a>
"#;

fn article(title: &str, paragraph: &str) -> String {
    format!(
        r#"<h1 class="entry-title">{title}</h1>
        <time class="entry-date" datetime="2024-01-15">15. 1. 2024</time>
        <div class="entry-content"><p>{paragraph}</p></div>"#
    )
}

#[test]
fn scrapes_a_site_end_to_end() {
    let mut server = mockito::Server::new();
    let base = server.url();

    let long = "Normiranec, ki je samostojni podjetnik, mora upoštevati normirani odhodki \
                pri izračunu akontacije dohodnine za leto 2024.";
    let company = "Gospodarska družba odda davčni obračun DDPO do konca marca, \
                   d.o.o. pa mora upoštevati tudi transferne cene pri poslih s povezanimi osebami.";

    let mocks = vec![
        server.mock("GET", "/clanki/").with_body(LISTING).expect(1).create(),
        server
            .mock("GET", "/clanki/page/2/")
            .with_body(LISTING_2)
            .expect(1)
            .create(),
        server
            .mock("GET", "/clanki/normiranci/")
            .with_body(article("Normiranci 2024", long))
            .expect(1)
            .create(),
        server
            .mock("GET", "/clanki/kratko/")
            .with_body(article("Kratko", "Premalo besedila."))
            .expect(1)
            .create(),
        server
            .mock("GET", "/clanki/vreme/")
            .with_body(article("Vreme", &"Jutri bo sončno in toplo po vsej državi. ".repeat(4)))
            .expect(1)
            .create(),
        server
            .mock("GET", "/clanki/druzbe/")
            .with_body(article("Družbe", company))
            .expect(1)
            .create(),
    ];

    let dir = tempfile::tempdir().unwrap();
    let scraper = DavkiScraper::new(ScrapeSettings {
        filter_tax: true,
        ..settings(dir.path())
    });

    let mut items = scraper.scrape_spider(local_recipe(&base)).unwrap();
    items.sort_by(|a, b| a.url.cmp(&b.url));

    for mock in mocks {
        mock.assert();
    }

    let titles: Vec<_> = items.iter().map(|item| item.title.as_str()).collect();
    assert_eq!(vec!["Družbe", "Normiranci 2024"], titles);
    assert_eq!(TaxCategory::Company, items[0].category);
    assert_eq!(TaxCategory::SoleProprietor, items[1].category);
    assert_eq!(Some("2024-01-15"), items[1].published_date.as_deref());
    assert_eq!("racunovodja.com", items[1].source);

    let output = DavkiScraper::latest_results(dir.path()).unwrap().unwrap();
    let name = output.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("racunovodja_"), "{name}");
    let mut written = DavkiScraper::load_results(&output).unwrap();
    written.sort_by(|a, b| a.url.cmp(&b.url));
    assert_eq!(items, written);
}

#[test]
fn download_errors_are_skipped() {
    let mut server = mockito::Server::new();
    let base = server.url();

    let _listing = server
        .mock("GET", "/clanki/")
        .with_body(r#"<h2 class="entry-title"><a href="/clanki/manjka/">Manjka</a></h2>"#)
        .create();
    let missing = server
        .mock("GET", "/clanki/manjka/")
        .with_status(404)
        .expect(1)
        .create();

    let dir = tempfile::tempdir().unwrap();
    let scraper = DavkiScraper::new(ScrapeSettings {
        format: OutputFormat::Json,
        ..settings(dir.path())
    });

    let items = scraper.scrape_spider(local_recipe(&base)).unwrap();

    missing.assert();
    assert!(items.is_empty());
    let output = DavkiScraper::latest_results(dir.path()).unwrap().unwrap();
    assert_eq!(Some("json"), output.extension().and_then(|e| e.to_str()));
    assert!(DavkiScraper::load_results(output).unwrap().is_empty());
}

#[test]
fn unknown_spider_lists_available_ones() {
    let scraper = DavkiScraper::new(ScrapeSettings::default());

    let err = scraper.spider_info("nope").unwrap_err();
    assert!(matches!(err, ScrapeError::UnknownSpider { .. }));
    assert_eq!(
        "Unknown spider `nope`, available spiders: fu_gov, gov_si, racunovodja",
        err.to_string()
    );

    let err = scraper.scrape("nope").unwrap_err();
    assert!(err.downcast_ref::<ScrapeError>().is_some());
}

#[test]
fn registry_lists_spiders_in_order() {
    let scraper = DavkiScraper::new(ScrapeSettings::default());

    let names: Vec<_> = scraper
        .list_spiders()
        .into_iter()
        .map(|info| info.name)
        .collect();
    assert_eq!(vec!["fu_gov", "gov_si", "racunovodja"], names);

    let info = scraper.spider_info("fu_gov").unwrap();
    assert_eq!("fu.gov.si", info.source);
    assert_eq!(vec!["https://www.fu.gov.si/novice/"], info.start_urls);
    assert_eq!(2.0, info.politeness.download_delay);
}

fn custom() -> Arc<dyn TaxSpider> {
    Arc::new(recipes::gov_si().with_start_urls(["https://www.gov.si/custom/"]))
}

#[test]
fn registering_a_name_replaces_it() {
    let registry = SpiderRegistry::default().register("gov_si", custom);

    assert_eq!(vec!["fu_gov", "gov_si", "racunovodja"], registry.names());
    assert_eq!(
        ["https://www.gov.si/custom/"],
        registry.get("gov_si").unwrap().start_urls()
    );

    let scraper = DavkiScraper::new(ScrapeSettings::default())
        .with_registry(SpiderRegistry::empty().register("custom", custom));
    assert_eq!(vec!["custom"], scraper.registry().names());
}

#[test]
fn politeness_overrides_crawler_config() {
    let spider = recipes::fu_gov();
    let config = spider.politeness().apply(&CrawlerConfig::default());

    assert_eq!(2, config.concurrent_downloads);
    assert_eq!(2, config.retry_times);
    assert!(matches!(
        config.throttle,
        Some(davki_crawler::Throttle::Delay(delay)) if delay == 2.0
    ));
}

#[test]
fn politeness_never_raises_user_settings() {
    let user = CrawlerConfig {
        concurrent_downloads: 1,
        retry_times: 5,
        retry_http_codes: vec![503],
        ..Default::default()
    };

    let config = recipes::racunovodja().politeness().apply(&user);
    assert_eq!(1, config.concurrent_downloads);
    assert_eq!(5, config.retry_times);
    assert_eq!(vec![503], config.retry_http_codes);

    let strict = Politeness {
        retry_times: Some(0),
        retry_http_codes: Some(vec![429]),
        ..Default::default()
    };
    let config = strict.apply(&user);
    assert_eq!(0, config.retry_times);
    assert_eq!(vec![429], config.retry_http_codes);
}

fn sample(url: &str) -> ArticleItem {
    let mut item = ArticleItem::new("fu.gov.si", url);
    item.title = "Naslov".into();
    item.content = "Vsebina".into();
    item
}

#[test]
fn loads_json_lines_and_arrays() {
    let dir = tempfile::tempdir().unwrap();
    let items = vec![sample("http://x/a"), sample("http://x/b")];

    let lines = dir.path().join("a.jsonl");
    let data: String = items
        .iter()
        .map(|item| serde_json::to_string(item).unwrap() + "\n")
        .collect();
    std::fs::write(&lines, data + "\n").unwrap();
    assert_eq!(items, DavkiScraper::load_results(&lines).unwrap());

    let array = dir.path().join("b.json");
    std::fs::write(&array, serde_json::to_string_pretty(&items).unwrap()).unwrap();
    assert_eq!(items, DavkiScraper::load_results(&array).unwrap());
}

#[test]
fn invalid_line_is_reported_with_its_position() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.jsonl");
    let good = serde_json::to_string(&sample("http://x/a")).unwrap();
    std::fs::write(&path, format!("{good}\n{{not json}}\n")).unwrap();

    let err = DavkiScraper::load_results(&path).unwrap_err();

    assert!(err.to_string().ends_with("bad.jsonl:2"), "{err}");
}

#[test]
fn latest_results_picks_newest_output() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(None, DavkiScraper::latest_results(dir.path()).unwrap());

    std::fs::write(dir.path().join("old.jsonl"), "").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "").unwrap();
    std::thread::sleep(Duration::from_millis(50));
    std::fs::write(dir.path().join("new.json"), "[]").unwrap();

    assert_eq!(
        Some(dir.path().join("new.json")),
        DavkiScraper::latest_results(dir.path()).unwrap()
    );
}

#[test]
fn same_url_gives_same_id() {
    let spider = recipes::fu_gov();
    let base = davki_scraper::SpiderBase::new(
        &spider,
        Arc::new(davki_scraper::TaxKeywordFilter::default()),
    );

    let first = base.finalize(sample("https://www.fu.gov.si/novice/a/"));
    std::thread::sleep(Duration::from_millis(5));
    let second = base.finalize(sample("https://www.fu.gov.si/novice/a/"));
    let other = base.finalize(sample("https://www.fu.gov.si/novice/b/"));

    assert_eq!(first.id, second.id);
    assert_ne!(first.id, other.id);
    assert_ne!(first.scraped_at, second.scraped_at);
}

#[test]
fn summary_is_cut_at_500_characters() {
    let spider = recipes::fu_gov();
    let base = davki_scraper::SpiderBase::new(
        &spider,
        Arc::new(davki_scraper::TaxKeywordFilter::default()),
    );
    let mut item = sample("https://www.fu.gov.si/novice/a/");
    item.content = "č".repeat(600);

    let item = base.finalize(item);

    assert_eq!(503, item.summary.chars().count());
    assert!(item.summary.ends_with("..."));
    assert_eq!(600, item.content.chars().count());
}

#[test]
fn scrapes_a_local_page() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clanek.html");
    std::fs::write(
        &path,
        article("Davčna izguba", "Pravna oseba lahko davčna izguba pokrije v naslednjih letih."),
    )
    .unwrap();

    let scraper = DavkiScraper::new(ScrapeSettings::default());
    let body = std::fs::read_to_string(&path).unwrap();
    let items = scraper
        .scrape_page("racunovodja", body, PageLocation::Path(path))
        .unwrap();

    assert_eq!(1, items.len());
    assert!(items[0].url.starts_with("file://"));
    assert!(items[0].url.ends_with("clanek.html"));
    assert_eq!(TaxCategory::Company, items[0].category);
}
