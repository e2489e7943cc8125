use std::collections::BTreeMap;

/// Remembers, per split threshold, how many records the truncated window ending
/// there still owes.
///
/// Every record extracted afterwards lies below all live thresholds, so it is
/// subtracted from each of them. Once an entry drops to zero or below, the rest of
/// its window fits in a single page and can be fetched without bisecting again.
#[derive(Debug, Default, Clone)]
pub struct OverflowCache {
    entries: BTreeMap<u64, i64>,
}

impl OverflowCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the overflow for `threshold`.
    pub fn record(&mut self, threshold: u64, overflow: u64) {
        let overflow = i64::try_from(overflow).unwrap_or(i64::MAX);
        self.entries.insert(threshold, overflow);
    }

    pub fn consume(&mut self, amount: u64) {
        let amount = i64::try_from(amount).unwrap_or(i64::MAX);
        for overflow in self.entries.values_mut() {
            *overflow = overflow.saturating_sub(amount);
        }
    }

    /// Smallest threshold above `lower_bound` whose remaining overflow is settled.
    pub fn best_resolved_threshold(&self, lower_bound: u64) -> Option<u64> {
        let above = lower_bound.checked_add(1)?;
        self.entries
            .range(above..)
            .find(|(_, overflow)| **overflow <= 0)
            .map(|(threshold, _)| *threshold)
    }

    /// Drops every threshold at or below `consumed`.
    pub fn prune_through(&mut self, consumed: u64) {
        match consumed.checked_add(1) {
            Some(keep_from) => self.entries = self.entries.split_off(&keep_from),
            None => self.entries.clear(),
        }
    }

    #[cfg(test)]
    pub(crate) fn overflow(&self, threshold: u64) -> Option<i64> {
        self.entries.get(&threshold).copied()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
