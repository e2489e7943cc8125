use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{Domain, RangeQuery};
use crate::Result;

/// A catalog entry. `price` drives the partitioning, every other field of the
/// remote object is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub price: f64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(price: f64) -> Self {
        Self {
            price,
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// What the catalog answered for one window.
///
/// `total` is how many records match the filter, `count` how many were actually
/// returned. `count < total` means the page was truncated.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub total: u64,
    pub count: u64,
    pub items: Vec<Record>,
}

impl ProbeResult {
    pub fn is_truncated(&self) -> bool {
        self.count < self.total
    }

    /// Records the catalog withheld for this window.
    pub fn shortfall(&self) -> u64 {
        self.total.saturating_sub(self.count)
    }
}

/// Executes range probes against the remote catalog.
///
/// Implementations own their retry policy. The partitioner calls `fetch` once per
/// window and treats any error as terminal for the whole run.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn fetch(&self, domain: &Domain, query: RangeQuery) -> Result<ProbeResult>;
}

/// In-memory stand-in for the remote catalog.
///
/// Answers like the real API: matches are ordered by ascending price and the page
/// is cut at the current page limit, while `total` still reports every match.
/// Records are expected at prices as the catalog quotes them, see [`Domain::price_at`].
pub struct InMemoryCatalog {
    records: Vec<Record>,
    limits: Vec<usize>,
    probes: AtomicUsize,
    queries: Mutex<Vec<RangeQuery>>,
}

impl InMemoryCatalog {
    pub fn new(records: Vec<Record>, page_limit: usize) -> Self {
        Self::with_limit_schedule(records, vec![page_limit])
    }

    /// Page limit changes per probe: probe `n` uses `limits[n]`, the last limit
    /// sticks once the schedule runs out.
    pub fn with_limit_schedule(mut records: Vec<Record>, limits: Vec<usize>) -> Self {
        records.sort_by(|a, b| a.price.total_cmp(&b.price));
        let limits = if limits.is_empty() { vec![0] } else { limits };
        Self {
            records,
            limits,
            probes: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Every window probed so far, in order.
    pub fn queries(&self) -> Vec<RangeQuery> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CatalogClient for InMemoryCatalog {
    async fn fetch(&self, domain: &Domain, query: RangeQuery) -> Result<ProbeResult> {
        let probe = self.probes.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query);
        }
        let limit = self.limits[probe.min(self.limits.len() - 1)];

        // Filter on the prices as they go over the wire, like the remote catalog does.
        let (min, max) = (domain.price_at(query.min()), domain.price_at(query.max()));
        let matches = self
            .records
            .iter()
            .filter(|r| r.price >= min && r.price <= max);
        let total = matches.clone().count();
        let items: Vec<Record> = matches.take(limit).cloned().collect();

        Ok(ProbeResult {
            total: total as u64,
            count: items.len() as u64,
            items,
        })
    }
}
