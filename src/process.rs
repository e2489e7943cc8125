use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Local;
use serde::Serialize;
use tokio::{fs::File, io::AsyncWriteExt};

use crate::catalog::{CatalogClient, Record};
use crate::config::Config;
use crate::partition::{OverflowPoint, PartitionerOptions, RangePartitioner, RunStats};
use crate::request::HttpCatalogClient;
use crate::{info_time, warn_time, Result};

/// Final destination of the enumerated records.
#[async_trait]
pub trait ResultSink: Send {
    async fn write(&mut self, records: &[Record]) -> Result<()>;
}

/// Writes the records as a pretty-printed JSON array.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ResultSink for JsonFileSink {
    async fn write(&mut self, records: &[Record]) -> Result<()> {
        let local_now = Local::now();
        let bytes = serde_json::to_vec_pretty(records)?;
        let mut file = File::create(&self.path).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        info_time!(local_now, "Wrote {} records to file: {}", records.len(), self.path.display());
        Ok(())
    }
}

pub struct StdoutSink;

#[async_trait]
impl ResultSink for StdoutSink {
    async fn write(&mut self, records: &[Record]) -> Result<()> {
        let mut bytes = serde_json::to_vec_pretty(records)?;
        bytes.push(b'\n');
        let mut stdout = tokio::io::stdout();
        stdout.write_all(&bytes).await?;
        stdout.flush().await?;
        Ok(())
    }
}

/// What a finished run delivered.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub records: usize,
    pub overflow_points: Vec<OverflowPoint>,
    pub stats: RunStats,
}

/// Enumerates the catalog described by `config` over HTTP and writes the result to
/// `--output`, or stdout.
pub async fn process_catalog(config: &Config) -> Result<Summary> {
    let client = HttpCatalogClient::new(&config.endpoint, config.timeout(), config.retry())?;
    match &config.output {
        Some(path) => run_into(config, &client, &mut JsonFileSink::new(path)).await,
        None => run_into(config, &client, &mut StdoutSink).await,
    }
}

/// Runs the partitioner against `client` and hands the records, ordered by price,
/// to `sink`. Nothing reaches the sink when the run fails.
pub async fn run_into<C, S>(config: &Config, client: &C, sink: &mut S) -> Result<Summary>
where
    C: CatalogClient + ?Sized,
    S: ResultSink + ?Sized,
{
    let start_time = Local::now();
    let domain = config.domain()?;
    let options = PartitionerOptions {
        strategy: config.strategy,
        use_overflow_cache: !config.no_cache,
    };
    info_time!(
        "Started enumerating {} from {} to {} in steps of {} ({:?})",
        config.endpoint,
        domain.min(),
        domain.max(),
        domain.step(),
        config.strategy
    );

    let mut res = RangePartitioner::with_options(client, domain, options)
        .run()
        .await?;
    info_time!(
        start_time,
        "Finished: {} records in {} probes ({} splits, {} cache hits)",
        res.records.len(),
        res.stats.probes,
        res.stats.splits,
        res.stats.cache_hits
    );

    let pre_sort_now = Local::now();
    res.records.sort_by(|a, b| a.price.total_cmp(&b.price));
    info_time!(pre_sort_now, "Sorted all records.");

    sink.write(&res.records).await?;

    if !res.overflow_points.is_empty() {
        let lost: u64 = res.overflow_points.iter().map(|p| p.lost()).sum();
        let prices: Vec<String> = res
            .overflow_points
            .iter()
            .map(|p| domain.format_price(domain.tick_of(p.price)))
            .collect();
        warn_time!(
            start_time,
            "{} products missing: prices {} hold more products than the catalog returns per page",
            lost,
            prices.join(", ")
        );
    }

    Ok(Summary {
        records: res.records.len(),
        overflow_points: res.overflow_points,
        stats: res.stats,
    })
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::catalog::{InMemoryCatalog, ProbeResult};
    use crate::config::Strategy;
    use crate::domain::{Domain, RangeQuery};
    use crate::Error;

    #[derive(Default)]
    struct VecSink {
        written: Option<Vec<Record>>,
    }

    #[async_trait]
    impl ResultSink for VecSink {
        async fn write(&mut self, records: &[Record]) -> Result<()> {
            self.written = Some(records.to_vec());
            Ok(())
        }
    }

    fn config() -> Config {
        Config::parse_from(["pricecrawl", "--min-price", "0", "--max-price", "1000", "--step", "1"])
    }

    fn catalog(prices: &[f64], limit: usize) -> InMemoryCatalog {
        InMemoryCatalog::new(prices.iter().map(|p| Record::new(*p)).collect(), limit)
    }

    #[tokio::test]
    async fn delivers_records_sorted_with_overflow_summary() {
        let client = catalog(&[999.0, 1.0, 500.0, 1.0, 4.0, 1.0, 2.0, 1.0, 3.0], 3);
        let mut sink = VecSink::default();

        let summary = run_into(&config(), &client, &mut sink).await.unwrap();

        assert_eq!(summary.records, 8);
        assert_eq!(summary.overflow_points.len(), 1);
        assert_eq!(summary.overflow_points[0].price, 1.0);
        let prices: Vec<f64> = sink.written.unwrap().iter().map(|r| r.price).collect();
        assert_eq!(prices, vec![1.0, 1.0, 1.0, 2.0, 3.0, 4.0, 500.0, 999.0]);
    }

    #[tokio::test]
    async fn sweep_and_no_cache_flags_reach_the_partitioner() {
        let prices: Vec<f64> = (0..40).map(|i| (i * 25) as f64).collect();
        let mut sink = VecSink::default();

        let mut no_cache = config();
        no_cache.no_cache = true;
        let mut sweep = config();
        sweep.strategy = Strategy::Sweep;

        let cached = run_into(&config(), &catalog(&prices, 5), &mut sink).await.unwrap();
        let plain = run_into(&no_cache, &catalog(&prices, 5), &mut sink).await.unwrap();
        let swept = run_into(&sweep, &catalog(&prices, 5), &mut sink).await.unwrap();

        assert_eq!(cached.records, 40);
        assert_eq!(plain.records, 40);
        assert_eq!(swept.records, 40);
        assert!(cached.stats.cache_hits > 0);
        assert_eq!(plain.stats.cache_hits, 0);
        assert_eq!(swept.stats.cache_hits, 0);
    }

    struct FlakyCatalog {
        inner: InMemoryCatalog,
        fail_after: usize,
    }

    #[async_trait]
    impl CatalogClient for FlakyCatalog {
        async fn fetch(&self, domain: &Domain, query: RangeQuery) -> Result<ProbeResult> {
            if self.inner.probes() >= self.fail_after {
                return Err(Error::MalformedPayload("count 2 but 0 products in the page".into()));
            }
            self.inner.fetch(domain, query).await
        }
    }

    #[tokio::test]
    async fn failed_run_writes_nothing() {
        let client = FlakyCatalog {
            inner: catalog(&[1.0, 2.0, 3.0, 700.0], 2),
            fail_after: 3,
        };
        let mut sink = VecSink::default();

        let err = run_into(&config(), &client, &mut sink).await.unwrap_err();

        assert!(err.is_transport());
        assert!(sink.written.is_none());
    }

    #[tokio::test]
    async fn json_file_sink_writes_an_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.json");
        let records = vec![Record::new(1.5).with_field("id", "a"), Record::new(2.0)];

        JsonFileSink::new(&path).write(&records).await.unwrap();

        let written: Vec<Record> =
            serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        assert_eq!(written, records);
    }

    #[tokio::test]
    async fn invalid_domain_fails_before_probing() {
        let client = catalog(&[1.0], 10);
        let mut sink = VecSink::default();
        let mut config = config();
        config.step = 0.0;

        let err = run_into(&config, &client, &mut sink).await.unwrap_err();

        assert!(matches!(err, Error::InvalidDomain(_)));
        assert_eq!(client.probes(), 0);
    }
}
