use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Unknown spider `{name}`, available spiders: {available}")]
    UnknownSpider { name: String, available: String },
}
