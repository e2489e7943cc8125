//! Adaptive range partitioning.
//!
//! The catalog silently cuts every answer at a page limit nobody tells us about,
//! but it always reports how many records matched. A window is trusted only when
//! `count == total`. Truncated windows are bisected lazily, depth first and left
//! to right, with the right-hand siblings parked on an explicit stack of pending
//! upper bounds. The [`OverflowCache`] lets a sibling be fetched whole once enough
//! records were pulled out of its truncated ancestor.

use serde::Serialize;

use crate::cache::OverflowCache;
use crate::catalog::{CatalogClient, ProbeResult, Record};
use crate::config::Strategy;
use crate::domain::{Domain, RangeQuery};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionerOptions {
    pub strategy: Strategy,
    /// Reuse settled overflow counts instead of always bisecting. Only changes how
    /// many probes are issued, never the records returned.
    pub use_overflow_cache: bool,
}

impl Default for PartitionerOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::Bisect,
            use_overflow_cache: true,
        }
    }
}

/// A single price holding more matches than one page can carry.
/// Only `returned` of its `total` records could be recovered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverflowPoint {
    pub price: f64,
    pub returned: u64,
    pub total: u64,
}

impl OverflowPoint {
    pub fn lost(&self) -> u64 {
        self.total.saturating_sub(self.returned)
    }
}

/// A window whose records were accepted, in the order windows were resolved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedWindow {
    pub query: RangeQuery,
    pub min_price: f64,
    pub max_price: f64,
    pub count: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub probes: usize,
    pub splits: usize,
    pub collapses: usize,
    pub cache_hits: usize,
}

/// Outcome of a run.
#[derive(Debug, Default, Clone)]
pub struct Enumeration {
    /// Records from lower windows precede records from higher ones.
    pub records: Vec<Record>,
    pub overflow_points: Vec<OverflowPoint>,
    pub windows: Vec<ResolvedWindow>,
    pub stats: RunStats,
}

impl Enumeration {
    fn accept(&mut self, domain: &Domain, query: RangeQuery, records: Vec<Record>) {
        self.windows.push(ResolvedWindow {
            query,
            min_price: domain.price_at(query.min()),
            max_price: domain.price_at(query.max()),
            count: records.len() as u64,
        });
        self.records.extend(records);
    }

    fn overflowed(&mut self, domain: &Domain, tick: u64, probe: &ProbeResult) {
        let point = OverflowPoint {
            price: domain.price_at(tick),
            returned: probe.count,
            total: probe.total,
        };
        tracing::debug!(
            price = point.price,
            returned = point.returned,
            total = point.total,
            "Could not extract all products for price {}: {} of {} matches exceed the page limit",
            domain.format_price(tick),
            point.lost(),
            point.total
        );
        self.overflow_points.push(point);
    }
}

/// Walks `domain` one probe at a time until every price has been covered.
pub struct RangePartitioner<'a, C: CatalogClient + ?Sized> {
    client: &'a C,
    domain: Domain,
    options: PartitionerOptions,
}

impl<'a, C: CatalogClient + ?Sized> RangePartitioner<'a, C> {
    pub fn new(client: &'a C, domain: Domain) -> Self {
        Self::with_options(client, domain, PartitionerOptions::default())
    }

    pub fn with_options(client: &'a C, domain: Domain, options: PartitionerOptions) -> Self {
        Self {
            client,
            domain,
            options,
        }
    }

    /// Enumerates the whole domain. Any fetch error aborts the run and discards
    /// what was gathered so far.
    pub async fn run(&self) -> Result<Enumeration> {
        match self.options.strategy {
            Strategy::Bisect => self.bisect().await,
            Strategy::Sweep => self.sweep().await,
        }
    }

    async fn probe(&self, query: RangeQuery, out: &mut Enumeration) -> Result<ProbeResult> {
        let probe = self.client.fetch(&self.domain, query).await?;
        out.stats.probes += 1;
        tracing::debug!(
            min = %self.domain.format_price(query.min()),
            max = %self.domain.format_price(query.max()),
            total = probe.total,
            count = probe.count,
            "probed window"
        );
        Ok(probe)
    }

    async fn bisect(&self) -> Result<Enumeration> {
        let last = self.domain.last_tick();
        let mut out = Enumeration::default();
        let mut cache = OverflowCache::new();
        // Upper bounds of windows still owed, strictly decreasing towards the top.
        let mut pending: Vec<u64> = Vec::new();
        let (mut lo, mut hi) = (0, last);

        loop {
            let query = RangeQuery::new(lo, hi);
            let probe = self.probe(query, &mut out).await?;

            if probe.is_truncated() {
                if !query.is_point() {
                    pending.push(hi);
                    match split_point(lo, hi) {
                        Some(mid) => {
                            if self.options.use_overflow_cache {
                                cache.record(hi, probe.shortfall());
                            }
                            out.stats.splits += 1;
                            hi = mid;
                        }
                        None => {
                            // Last try before the point itself is declared lossy.
                            out.stats.collapses += 1;
                            hi = lo;
                        }
                    }
                    continue;
                }
                out.overflowed(&self.domain, lo, &probe);
            }

            cache.consume(probe.count);
            out.accept(&self.domain, query, probe.items);

            if hi >= last {
                break;
            }

            while pending.last().is_some_and(|&bound| bound <= hi) {
                pending.pop();
            }
            cache.prune_through(hi);
            let Some(&outer) = pending.last() else {
                break;
            };

            let consumed = hi;
            lo = consumed + 1;
            hi = match cache.best_resolved_threshold(consumed) {
                Some(threshold) => {
                    out.stats.cache_hits += 1;
                    tracing::debug!(
                        threshold = %self.domain.format_price(threshold),
                        "overflow settled, fetching the rest of the window whole"
                    );
                    while pending.last().is_some_and(|&bound| bound < threshold) {
                        pending.pop();
                    }
                    threshold
                }
                None => midpoint(lo, outer),
            };
        }

        Ok(out)
    }

    /// Sweeps upward from the bottom of the domain. A truncated page is trusted up to,
    /// but excluding, its highest price, where the next probe starts.
    async fn sweep(&self) -> Result<Enumeration> {
        let last = self.domain.last_tick();
        let mut out = Enumeration::default();
        let mut lo = 0;

        loop {
            let query = RangeQuery::new(lo, last);
            let probe = self.probe(query, &mut out).await?;

            if !probe.is_truncated() {
                out.accept(&self.domain, query, probe.items);
                break;
            }

            let Some(highest) = probe
                .items
                .iter()
                .map(|r| self.domain.tick_of(r.price))
                .max()
            else {
                return Err(Error::Stalled {
                    price: self.domain.price_at(lo),
                });
            };

            if highest > lo {
                let kept: Vec<Record> = probe
                    .items
                    .into_iter()
                    .filter(|r| self.domain.tick_of(r.price) < highest)
                    .collect();
                out.stats.splits += 1;
                out.accept(&self.domain, RangeQuery::new(lo, highest - 1), kept);
                lo = highest;
                continue;
            }

            // The whole page sits on `lo`. Confirm with a point probe before warning.
            let point = RangeQuery::new(lo, lo);
            let probe = if query.is_point() {
                probe
            } else {
                out.stats.collapses += 1;
                self.probe(point, &mut out).await?
            };
            if probe.is_truncated() {
                out.overflowed(&self.domain, lo, &probe);
            }
            out.accept(&self.domain, point, probe.items);

            if lo >= last {
                break;
            }
            lo += 1;
        }

        Ok(out)
    }
}

fn midpoint(lo: u64, hi: u64) -> u64 {
    lo + (hi - lo) / 2
}

/// Where `[lo, hi]` splits into `[lo, mid]` and `[mid + 1, hi]`, or `None` when the
/// midpoint can't be told apart from `lo`.
fn split_point(lo: u64, hi: u64) -> Option<u64> {
    let mid = midpoint(lo, hi);
    (mid > lo).then_some(mid)
}
