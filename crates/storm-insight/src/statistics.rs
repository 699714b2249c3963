//! The two-pass statistics run.
//!
//! Pass one counts every message's occurrences. Only once it is closed can
//! pass two pick duplicate-cluster exemplars and fill the time buckets:
//!
//! ```ignore
//! let mut counting = CountingPass::new(canonicalizer, aggregator, detector);
//! for event in &events { counting.record(event); }
//! let mut aggregating = counting.close();
//! for event in &events { aggregating.aggregate(event); }
//! let outcome = aggregating.finish(Granularity::Day);
//! ```

use tracing::info;

use storm_core::Event;

use crate::aggregate::{Granularity, TemporalAggregator};
use crate::anomaly::{AnomalyDetector, StormReport};
use crate::canonical::Canonicalizer;
use crate::duplicate::{ClusterClassifier, DuplicateReport, OccurrenceCounter};

pub struct CountingPass {
    counter: OccurrenceCounter,
    aggregator: TemporalAggregator,
    detector: AnomalyDetector,
    events: u64,
}

impl CountingPass {
    pub fn new(
        canonicalizer: Canonicalizer,
        aggregator: TemporalAggregator,
        detector: AnomalyDetector,
    ) -> Self {
        Self {
            counter: OccurrenceCounter::new(canonicalizer),
            aggregator,
            detector,
            events: 0,
        }
    }

    pub fn record(&mut self, event: &Event) {
        self.counter.record_occurrence(&event.text);
        self.events += 1;
    }

    pub fn close(self) -> AggregatingPass {
        info!(events = self.events, distinct = self.counter.distinct(), "Counting pass complete");
        AggregatingPass {
            classifier: self.counter.close(),
            aggregator: self.aggregator,
            detector: self.detector,
            events: 0,
        }
    }
}

pub struct AggregatingPass {
    classifier: ClusterClassifier,
    aggregator: TemporalAggregator,
    detector: AnomalyDetector,
    events: u64,
}

impl AggregatingPass {
    pub fn aggregate(&mut self, event: &Event) {
        self.classifier.classify(event);
        self.aggregator.aggregate(event);
        self.events += 1;
    }

    pub fn finish(self, granularity: Granularity) -> StatisticsOutcome {
        let duplicates = self.classifier.into_report();
        info!(
            events = self.events,
            clusters = duplicates.len(),
            "Aggregating pass complete"
        );
        let storms = self
            .detector
            .finalize(granularity, self.aggregator.buckets(granularity));
        StatisticsOutcome { storms, duplicates }
    }
}

#[derive(Clone, Debug)]
pub struct StatisticsOutcome {
    pub storms: StormReport,
    pub duplicates: DuplicateReport,
}
