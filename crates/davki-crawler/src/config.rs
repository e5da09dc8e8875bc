use std::cmp;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlerConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_page_buffer")]
    pub page_buffer: usize,

    #[serde(default = "default_concurrent_downloads")]
    pub concurrent_downloads: usize,

    #[serde(default = "default_num_workers")]
    pub num_workers: usize,

    #[serde(default = "default_throttle")]
    pub throttle: Option<Throttle>,

    #[serde(default = "default_retry_times")]
    pub retry_times: u32,

    #[serde(default = "default_retry_http_codes")]
    pub retry_http_codes: Vec<u16>,

    #[serde(default = "default_on_dl_error")]
    pub on_dl_error: OnError,

    #[serde(default = "default_on_scrap_error")]
    pub on_scrap_error: OnError,

    #[serde(default = "default_handle_sigint")]
    pub handle_sigint: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            page_buffer: default_page_buffer(),
            concurrent_downloads: default_concurrent_downloads(),
            num_workers: default_num_workers(),
            throttle: default_throttle(),
            retry_times: default_retry_times(),
            retry_http_codes: default_retry_http_codes(),
            on_dl_error: default_on_dl_error(),
            on_scrap_error: default_on_scrap_error(),
            handle_sigint: default_handle_sigint(),
        }
    }
}

impl CrawlerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.concurrent_downloads == 0 {
            anyhow::bail!("Invalid crawler config, `concurrentDownloads` must be at least 1");
        }
        if self.num_workers == 0 {
            anyhow::bail!("Invalid crawler config, `numWorkers` must be at least 1");
        }
        if let Some(Throttle::Delay(secs)) = self.throttle {
            if !secs.is_finite() || secs < 0.0 {
                anyhow::bail!("Invalid crawler config, throttle delay must be positive: {secs}");
            }
        }
        Ok(())
    }
}

fn default_user_agent() -> String {
    String::from(concat!("davki/", env!("CARGO_PKG_VERSION")))
}

fn default_page_buffer() -> usize {
    10_000
}

fn default_concurrent_downloads() -> usize {
    16
}

fn default_num_workers() -> usize {
    cmp::max(1, num_cpus::get().saturating_sub(2))
}

fn default_throttle() -> Option<Throttle> {
    None
}

fn default_retry_times() -> u32 {
    2
}

fn default_retry_http_codes() -> Vec<u16> {
    vec![500, 502, 503, 504, 408, 429]
}

fn default_on_dl_error() -> OnError {
    OnError::SkipAndLog
}

fn default_on_scrap_error() -> OnError {
    OnError::SkipAndLog
}

fn default_handle_sigint() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OnError {
    Fail,
    SkipAndLog,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Throttle {
    /// The maximum number of concurrent requests
    Concurrent(NonZeroUsize),
    /// The number of requests per second
    PerSecond(NonZeroUsize),
    /// The delay in seconds between requests
    Delay(f32),
}
