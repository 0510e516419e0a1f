//! Contribution ledger: per-producer scale normalization
//!
//! Each producer's contributions are min–max normalized over that producer's
//! own values in the context. An edge's raw weight is the sum of its
//! normalized contributions, so producers on very different native scales
//! carry equal say.

use super::edge::{Contributions, Edge, EdgeId};
use std::collections::BTreeMap;

/// Observed value range for one producer across a context
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProducerRange {
    pub min: f64,
    pub max: f64,
}

impl ProducerRange {
    fn single(value: f64) -> Self {
        Self { min: value, max: value }
    }

    fn include(&mut self, value: f64) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    /// Normalize a value into `[0, 1]` relative to this range.
    ///
    /// A degenerate range (a producer that has only ever reported one
    /// distinct value) maps to exactly 1.0. Ranges wider than `f64::MAX`
    /// are computed on halved operands so the result stays finite.
    pub fn normalize(&self, value: f64) -> f64 {
        if self.max == self.min {
            return 1.0;
        }
        let span = self.max - self.min;
        let normalized = if span.is_finite() {
            (value - self.min) / span
        } else {
            (value / 2.0 - self.min / 2.0) / (self.max / 2.0 - self.min / 2.0)
        };
        normalized.clamp(0.0, 1.0)
    }
}

/// Collect each producer's value range over a set of edges.
///
/// Keyed by producer id in sorted order, so summation order is reproducible.
pub fn producer_ranges<'a>(edges: impl IntoIterator<Item = &'a Edge>) -> BTreeMap<String, ProducerRange> {
    let mut ranges: BTreeMap<String, ProducerRange> = BTreeMap::new();
    for edge in edges {
        for (producer_id, &value) in &edge.contributions {
            ranges
                .entry(producer_id.clone())
                .and_modify(|r| r.include(value))
                .or_insert_with(|| ProducerRange::single(value));
        }
    }
    ranges
}

/// Raw weight of one contributions map under the given ranges.
pub fn raw_weight(contributions: &Contributions, ranges: &BTreeMap<String, ProducerRange>) -> f64 {
    contributions
        .iter()
        .filter_map(|(producer_id, &value)| ranges.get(producer_id).map(|r| r.normalize(value)))
        .sum()
}

/// Recompute `raw_weight` on every edge from its contributions.
///
/// Returns the ids of edges whose raw weight numerically changed.
pub fn recompute_raw_weights(edges: &mut [Edge]) -> Vec<EdgeId> {
    let ranges = producer_ranges(edges.iter());
    let mut changed = Vec::new();
    for edge in edges.iter_mut() {
        let weight = raw_weight(&edge.contributions, &ranges);
        if weight != edge.raw_weight {
            edge.raw_weight = weight;
            changed.push(edge.id.clone());
        }
    }
    changed
}
