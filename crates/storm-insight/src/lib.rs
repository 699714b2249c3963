//! Stormwatch insight crate - normalization, duplicate detection,
//! categorization, temporal aggregation, and storm detection.
//!
//! Provides the analysis pipeline over a corpus of social-media posts:
//! - Raw payload normalization into canonical events
//! - Repost-aware duplicate tracking (streaming and two-pass)
//! - Subject attribution and phrase-corpus categorization
//! - Day/hour bucketing with statistical storm flags

pub mod aggregate;
pub mod anomaly;
pub mod canonical;
pub mod category;
pub mod duplicate;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod raw;
pub mod statistics;
pub mod subject;
pub mod tally;

pub use aggregate::{Bucket, BucketCounts, Classification, Granularity, TemporalAggregator};
pub use anomaly::{AnomalyDetector, GlobalStats, StormReport, StormThresholds};
pub use canonical::{short_hash, CanonicalKey, Canonicalizer};
pub use category::{CategoryMatcher, Corpus};
pub use duplicate::{
    ClusterClassifier, DuplicateCluster, DuplicateReport, OccurrenceCounter, StreamingDuplicates,
};
pub use error::InsightError;
pub use filter::{EventFilter, FilterOptions};
pub use normalize::{reconstruct, EventNormalizer};
pub use raw::RawPost;
pub use statistics::{AggregatingPass, CountingPass, StatisticsOutcome};
pub use subject::SubjectRegistry;
pub use tally::{SubjectTally, TallyRow};
