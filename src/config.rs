use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::{Result, API_URL, MAX_PRICE, MIN_PRICE, PRICE_STEP};

/// How the price range is carved into windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Lazy bisection with memoized overflow.
    #[default]
    Bisect,
    /// Forward sweep that restarts at the highest price of every truncated page.
    /// Needs the catalog to return matches in ascending price order.
    Sweep,
}

#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(
    name = "pricecrawl",
    about = "Enumerate every product behind a truncating price-filtered catalog",
    version
)]
pub struct Config {
    /// Base URL of the catalog endpoint
    #[arg(long, env = "PRICECRAWL_ENDPOINT", default_value = API_URL)]
    pub endpoint: String,

    /// Lowest price to enumerate
    #[arg(long, default_value_t = MIN_PRICE, allow_negative_numbers = true)]
    pub min_price: f64,

    /// Highest price to enumerate
    #[arg(long, default_value_t = MAX_PRICE, allow_negative_numbers = true)]
    pub max_price: f64,

    /// Smallest distinguishable price increment
    #[arg(long, default_value_t = PRICE_STEP)]
    pub step: f64,

    #[arg(long, value_enum, default_value_t = Strategy::Bisect)]
    pub strategy: Strategy,

    /// Always bisect from scratch instead of reusing cached overflow counts
    #[arg(long)]
    pub no_cache: bool,

    /// Write the records as a JSON array to this file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Retries for transient failures (timeouts, 429, 5xx). 0 disables retrying
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// Delay before the first retry in milliseconds, doubled on each attempt
    #[arg(long, default_value_t = 500)]
    pub retry_delay_ms: u64,

    /// Log every probe and split
    #[arg(long, short = 'v', conflicts_with = "quiet")]
    #[serde(skip)]
    pub verbose: bool,

    /// Suppress all logging
    #[arg(long, short = 'q', conflicts_with = "verbose")]
    #[serde(skip)]
    pub quiet: bool,
}

impl Config {
    pub fn domain(&self) -> Result<Domain> {
        Domain::new(self.min_price, self.max_price, self.step)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retries,
            initial_delay: Duration::from_millis(self.retry_delay_ms),
            ..Default::default()
        }
    }
}

/// Exponential backoff for a single catalog request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Randomize each delay by up to ±25%
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            ..Default::default()
        }
    }
}
