use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use davki_crawler::{CrawlerConfig, OnError, PageLocation};
use davki_scraper::pipeline::DEFAULT_MIN_CONTENT_LENGTH;
use davki_scraper::{ArticleItem, DavkiScraper, OutputFormat, ScrapeSettings};

/// Slovenian tax articles scraper
#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    /// Log level of the scraper and the crawler, `RUST_LOG` takes precedence
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
    #[command(subcommand)]
    pub cmd: SubCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommand {
    Scrape(ScrapeArgs),
    List(ListArgs),
    Info(InfoArgs),
    Results(ResultsArgs),
    Page(PageArgs),
    #[command(hide = true)]
    Completion,
}

/// Crawl one or every site and write classified articles
#[derive(Debug, clap::Args)]
#[command(group = clap::ArgGroup::new("spiders").required(true))]
pub struct ScrapeArgs {
    /// Name of the spider to run, see `list`
    #[arg(long, short, group = "spiders")]
    pub site: Option<String>,
    /// Run every registered spider
    #[arg(long, group = "spiders")]
    pub all: bool,
    /// Directory receiving the output files
    #[arg(long, short, default_value = "output")]
    pub output_dir: PathBuf,
    #[arg(value_enum, long, short, default_value_t = OutputFormat::Jsonl)]
    pub format: OutputFormat,
    /// Drop articles without any tax keyword
    #[arg(long)]
    pub filter_tax: bool,
    /// Drop articles with less content characters
    #[arg(long, default_value_t = DEFAULT_MIN_CONTENT_LENGTH)]
    pub min_content_length: usize,
    /// Keep the downloaded HTML in each article
    #[arg(long)]
    pub raw_html: bool,
    /// Optional default crawler yaml configuration file
    #[arg(env = "DAVKI_CRAWLER_CONFIG", long)]
    pub crawler_config: Option<PathBuf>,
    /// Override crawler's user agent
    #[arg(long)]
    pub user_agent: Option<String>,
    /// Override crawler's maximum concurrent page downloads, sites may lower it
    #[arg(long)]
    pub concurrent_downloads: Option<usize>,
    /// Override crawler's number of CPU workers used to parse pages
    #[arg(long)]
    pub num_workers: Option<usize>,
    /// Override crawler's download error handling strategy
    #[arg(value_enum, long)]
    pub on_dl_error: Option<OnError>,
    /// Override crawler's scrap error handling strategy
    #[arg(value_enum, long)]
    pub on_scrap_error: Option<OnError>,
    /// No SIGINT handling, the output file is closed once the crawl stops
    #[arg(long)]
    pub no_sigint: bool,
}

impl TryFrom<&ScrapeArgs> for CrawlerConfig {
    type Error = anyhow::Error;

    fn try_from(args: &ScrapeArgs) -> Result<Self, Self::Error> {
        let mut conf = if let Some(path) = &args.crawler_config {
            let file = fs_err::File::open(path)?;
            serde_yaml::from_reader(file)
                .with_context(|| format!("Invalid crawler config {}", path.display()))?
        } else {
            CrawlerConfig::default()
        };
        if let Some(user_agent) = &args.user_agent {
            conf.user_agent = user_agent.to_string();
        }
        if let Some(concurrent_downloads) = args.concurrent_downloads {
            conf.concurrent_downloads = concurrent_downloads;
        }
        if let Some(num_workers) = args.num_workers {
            conf.num_workers = num_workers;
        }
        if let Some(on_dl_error) = args.on_dl_error {
            conf.on_dl_error = on_dl_error;
        }
        if let Some(on_scrap_error) = args.on_scrap_error {
            conf.on_scrap_error = on_scrap_error;
        }
        if args.no_sigint {
            conf.handle_sigint = false;
        }
        Ok(conf)
    }
}

impl TryFrom<&ScrapeArgs> for ScrapeSettings {
    type Error = anyhow::Error;

    fn try_from(args: &ScrapeArgs) -> Result<Self, Self::Error> {
        Ok(ScrapeSettings {
            output_dir: args.output_dir.clone(),
            format: args.format,
            filter_tax: args.filter_tax,
            min_content_length: args.min_content_length,
            keep_raw_html: args.raw_html,
            crawler: args.try_into()?,
        })
    }
}

pub fn scrape(args: ScrapeArgs) -> anyhow::Result<()> {
    let scraper = DavkiScraper::new((&args).try_into()?);

    if let Some(site) = &args.site {
        let items = scraper.scrape(site)?;
        println!("{site}: {} articles", items.len());
        return Ok(());
    }

    let mut failed = vec![];
    for (name, res) in scraper.scrape_all() {
        match res {
            Ok(items) => println!("{name}: {} articles", items.len()),
            Err(e) => {
                println!("{name}: failed ({e:#})");
                failed.push(name);
            }
        }
    }
    if !failed.is_empty() {
        anyhow::bail!("Failed spiders: {}", failed.join(", "));
    }
    Ok(())
}

/// List available spiders
#[derive(Debug, clap::Args)]
pub struct ListArgs {
    /// Print spiders as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn list(args: ListArgs) -> anyhow::Result<()> {
    let spiders = DavkiScraper::new(ScrapeSettings::default()).list_spiders();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&spiders)?);
        return Ok(());
    }

    let width = spiders.iter().map(|s| s.name.len()).max().unwrap_or(0);
    for spider in spiders {
        println!("{:width$}  {}", spider.name, spider.description);
    }
    Ok(())
}

/// Show a spider's domains, start URLs and politeness
#[derive(Debug, clap::Args)]
pub struct InfoArgs {
    pub spider: String,
}

pub fn info(args: InfoArgs) -> anyhow::Result<()> {
    let info = DavkiScraper::new(ScrapeSettings::default()).spider_info(&args.spider)?;

    println!("Name:        {}", info.name);
    println!("Description: {}", info.description);
    println!("Source:      {}", info.source);
    println!("Domains:     {}", info.allowed_domains.join(", "));
    println!("Start URLs:");
    for url in &info.start_urls {
        println!("  {url}");
    }
    println!(
        "Politeness:  {}s delay, at most {} concurrent requests",
        info.politeness.download_delay, info.politeness.concurrent_requests,
    );
    if let Some(retry_times) = info.politeness.retry_times {
        println!("Retries:     {retry_times}");
    }
    if let Some(codes) = &info.politeness.retry_http_codes {
        println!("Retry codes: {codes:?}");
    }
    Ok(())
}

/// Show articles of an output file
#[derive(Debug, clap::Args)]
pub struct ResultsArgs {
    /// Directory searched for the newest output file
    #[arg(long, short, default_value = "output", conflicts_with = "file")]
    pub dir: PathBuf,
    /// Output file to read
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Maximum number of articles shown
    #[arg(long, short, default_value_t = 10)]
    pub limit: usize,
}

pub fn results(args: ResultsArgs) -> anyhow::Result<()> {
    let path = match args.file {
        Some(path) => path,
        None => DavkiScraper::latest_results(&args.dir)?.ok_or_else(|| {
            anyhow::anyhow!("No output file found in {}", args.dir.display())
        })?,
    };
    let items = DavkiScraper::load_results(&path)?;

    println!("{}: {} articles", path.display(), items.len());
    for item in items.iter().take(args.limit) {
        print_item(item);
    }
    if items.len() > args.limit {
        println!("... {} more", items.len() - args.limit);
    }
    Ok(())
}

fn print_item(item: &ArticleItem) {
    println!();
    println!("[{}] {}", item.category, item.title);
    println!("  {}", item.url);
    if let Some(date) = &item.published_date {
        println!("  Published: {date}");
    }
    if !item.tax_topics.is_empty() {
        let topics: Vec<_> = item.tax_topics.iter().map(String::as_str).collect();
        println!("  Topics: {}", topics.join(", "));
    }
}

/// Parse a single article page and print the result to stdout
#[derive(Debug, clap::Args)]
#[command(group = clap::ArgGroup::new("page").required(true))]
pub struct PageArgs {
    /// Spider whose article parser is used
    #[arg(long, short)]
    pub site: String,
    /// A local html page to parse
    #[arg(group = "page", long)]
    pub file: Option<PathBuf>,
    /// A distant html page to parse
    #[arg(group = "page", long)]
    pub url: Option<String>,
    /// Custom user agent to download the page
    #[arg(long, conflicts_with = "file")]
    pub ua: Option<String>,
}

pub fn page(args: PageArgs) -> anyhow::Result<()> {
    let (body, location) = if let Some(url) = args.url {
        let mut builder = reqwest::blocking::ClientBuilder::new();
        if let Some(ua) = args.ua {
            builder = builder.user_agent(ua);
        }
        let client = builder.build()?;
        let body = client.get(&url).send()?.error_for_status()?.text()?;
        (body, PageLocation::Url(url))
    } else if let Some(path) = args.file {
        let body = fs_err::read_to_string(&path)?;
        (body, PageLocation::Path(path))
    } else {
        anyhow::bail!("Missing `url` or `file`");
    };

    let scraper = DavkiScraper::new(ScrapeSettings::default());
    let items = scraper.scrape_page(&args.site, body, location)?;
    println!("{}", serde_json::to_string_pretty(&items)?);
    Ok(())
}

fn init_logger(level: &str) {
    let filter = format!("davki_scraper={level},davki_crawler={level}");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level);

    match args.cmd {
        SubCommand::Scrape(args) => scrape(args),
        SubCommand::List(args) => list(args),
        SubCommand::Info(args) => info(args),
        SubCommand::Results(args) => results(args),
        SubCommand::Page(args) => page(args),
        SubCommand::Completion => {
            generate(Shell::Bash, &mut Args::command(), "davki", &mut io::stdout());
            Ok(())
        }
    }
}
