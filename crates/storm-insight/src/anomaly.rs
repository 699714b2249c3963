//! Storm detection over finished buckets.

use serde::Serialize;
use tracing::info;

use storm_core::config::DetectionConfig;

use crate::aggregate::{Bucket, BucketCounts, Granularity};

/// Conditions a bucket must exceed, strictly, to be a storm.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StormThresholds {
    pub zscore: f64,
    pub min_count: u64,
}

impl Default for StormThresholds {
    fn default() -> Self {
        Self {
            zscore: 1.5,
            min_count: 1000,
        }
    }
}

impl From<&DetectionConfig> for StormThresholds {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            zscore: config.storm_zscore,
            min_count: config.storm_min_count,
        }
    }
}

/// Distribution of bucket counts across a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub standard_deviation: f64,
    pub sum: u64,
    /// Per-classification totals over all buckets.
    pub totals: BucketCounts,
}

impl GlobalStats {
    /// Zero buckets yield all-zero stats.
    pub fn from_buckets(buckets: &[Bucket]) -> Self {
        if buckets.is_empty() {
            return Self::default();
        }

        let mut totals = BucketCounts::default();
        for b in buckets {
            totals.merge(&b.counts);
        }

        let n = buckets.len() as f64;
        let mean = totals.count as f64 / n;
        let variance = buckets
            .iter()
            .map(|b| {
                let d = b.counts.count as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;

        let mut counts: Vec<u64> = buckets.iter().map(|b| b.counts.count).collect();
        counts.sort_unstable();
        let mid = counts.len() / 2;
        let median = if counts.len() % 2 == 0 {
            (counts[mid - 1] + counts[mid]) as f64 / 2.0
        } else {
            counts[mid] as f64
        };

        Self {
            mean,
            median,
            standard_deviation: variance.sqrt(),
            sum: totals.count,
            totals,
        }
    }
}

/// Finished, scored buckets and their statistics.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StormReport {
    pub granularity: Granularity,
    pub buckets: Vec<Bucket>,
    pub stats: GlobalStats,
    pub num_storm_windows: usize,
}

impl StormReport {
    pub fn storms(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.iter().filter(|b| b.is_storm)
    }
}

#[derive(Clone, Debug, Default)]
pub struct AnomalyDetector {
    thresholds: StormThresholds,
}

impl AnomalyDetector {
    pub fn new(thresholds: StormThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> StormThresholds {
        self.thresholds
    }

    /// Score every bucket against the run's distribution and flag storms.
    pub fn finalize(&self, granularity: Granularity, mut buckets: Vec<Bucket>) -> StormReport {
        let stats = GlobalStats::from_buckets(&buckets);
        let mut num_storm_windows = 0;

        for bucket in &mut buckets {
            let count = bucket.counts.count as f64;
            bucket.stddev_score = if stats.standard_deviation > 0.0 {
                (count - stats.mean).abs() / stats.standard_deviation
            } else {
                0.0
            };
            bucket.is_storm = bucket.stddev_score > self.thresholds.zscore
                && bucket.counts.count > self.thresholds.min_count
                && count > stats.mean;
            if bucket.is_storm {
                num_storm_windows += 1;
            }
        }

        info!(
            granularity = granularity.as_str(),
            buckets = buckets.len(),
            storms = num_storm_windows,
            mean = stats.mean,
            sd = stats.standard_deviation,
            "Buckets finalized"
        );

        StormReport {
            granularity,
            buckets,
            stats,
            num_storm_windows,
        }
    }
}
