use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use url::Url;

use crate::catalog::{CatalogClient, ProbeResult};
use crate::config::RetryConfig;
use crate::domain::{Domain, RangeQuery};
use crate::parse::parse_probe;
use crate::{Error, Result, MAX_PRICE_PARAM, MIN_PRICE_PARAM};

/// Talks to the catalog over HTTP: `GET <endpoint>?minPrice=..&maxPrice=..`.
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    // Client uses Arc so we can clone cheaply
    client: Client,
    endpoint: Url,
    retry: RetryConfig,
}

impl HttpCatalogClient {
    pub fn new(endpoint: &str, timeout: Duration, retry: RetryConfig) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Self::with_client(client, endpoint, retry)
    }

    pub fn with_client(client: Client, endpoint: &str, retry: RetryConfig) -> Result<Self> {
        Ok(Self {
            client,
            endpoint: Url::parse(endpoint)?,
            retry,
        })
    }

    /// URL for one window. Existing query parameters of the endpoint are kept.
    pub fn window_url(&self, domain: &Domain, query: RangeQuery) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair(MIN_PRICE_PARAM, &domain.format_price(query.min()))
            .append_pair(MAX_PRICE_PARAM, &domain.format_price(query.max()));
        url
    }

    async fn fetch_once(&self, url: &Url) -> Result<ProbeResult> {
        let res = self.client.get(url.clone()).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(Error::Status {
                status,
                url: url.to_string(),
            });
        }
        let body = res.bytes().await?;
        parse_probe(&body)
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn fetch(&self, domain: &Domain, query: RangeQuery) -> Result<ProbeResult> {
        let url = self.window_url(domain, query);
        tracing::debug!(%url, "requesting window");
        with_retry(&self.retry, || self.fetch_once(&url)).await
    }
}

/// Runs `operation` until it succeeds, fails permanently or runs out of retries.
pub(crate) async fn with_retry<F, Fut, T>(config: &RetryConfig, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(res) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "request succeeded after retry");
                }
                return Ok(res);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;
                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "request failed, retrying"
                );

                let wait = if config.jitter { add_jitter(delay) } else { delay };
                tokio::time::sleep(wait).await;

                let next = Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next.min(config.max_delay);
            }
            Err(e) => {
                tracing::error!(error = %e, attempts = attempt + 1, "request failed");
                return Err(e);
            }
        }
    }
}

fn add_jitter(delay: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(0.75..=1.25);
    Duration::from_secs_f64(delay.as_secs_f64() * factor)
}
