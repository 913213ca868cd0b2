//! Monitoring sink for reconstruction quantities.
//!
//! The reconstruction reports residuals, cut variables and match counts to a
//! [`HistogramSink`] at every acceptance or rejection boundary. The sink is
//! write-only: results never depend on it. Pass [`NullSink`] when no
//! monitoring is wanted.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Receiver of named monitoring values.
pub trait HistogramSink {
    /// Records one value under `name`.
    fn add_entry(&mut self, name: &str, value: f64);
}

/// Sink that discards every entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl HistogramSink for NullSink {
    #[inline]
    fn add_entry(&mut self, _name: &str, _value: f64) {}
}

/// Running summary of the entries of one histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HistogramSummary {
    pub entries: u64,
    pub sum: f64,
    pub sum_sq: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for HistogramSummary {
    fn default() -> Self {
        Self {
            entries: 0,
            sum: 0.0,
            sum_sq: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl HistogramSummary {
    /// Adds one value.
    pub fn fill(&mut self, value: f64) {
        self.entries += 1;
        self.sum += value;
        self.sum_sq += value * value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Combines another summary into this one.
    pub fn merge(&mut self, other: &HistogramSummary) {
        self.entries += other.entries;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Mean of the entries, `None` when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> Option<f64> {
        (self.entries > 0).then(|| self.sum / self.entries as f64)
    }

    /// Standard deviation of the entries, `None` when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rms(&self) -> Option<f64> {
        let mean = self.mean()?;
        let variance = self.sum_sq / self.entries as f64 - mean * mean;
        Some(variance.max(0.0).sqrt())
    }
}

/// In-memory sink keeping a [`HistogramSummary`] per name.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HistogramCollector {
    histograms: BTreeMap<String, HistogramSummary>,
}

impl HistogramCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Summary for `name`, if any entry was recorded.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HistogramSummary> {
        self.histograms.get(name)
    }

    /// Number of entries recorded under `name`.
    #[must_use]
    pub fn entries(&self, name: &str) -> u64 {
        self.get(name).map_or(0, |h| h.entries)
    }

    /// Iterates histograms in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HistogramSummary)> {
        self.histograms.iter().map(|(name, h)| (name.as_str(), h))
    }

    /// Number of distinct histograms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    /// Adds every histogram of `other` into this collector.
    pub fn merge(&mut self, other: &HistogramCollector) {
        for (name, summary) in &other.histograms {
            self.histograms
                .entry(name.clone())
                .or_default()
                .merge(summary);
        }
    }
}

impl HistogramSink for HistogramCollector {
    fn add_entry(&mut self, name: &str, value: f64) {
        if let Some(summary) = self.histograms.get_mut(name) {
            summary.fill(value);
        } else {
            let mut summary = HistogramSummary::default();
            summary.fill(value);
            self.histograms.insert(name.to_owned(), summary);
        }
    }
}
