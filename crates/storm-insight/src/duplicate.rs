//! Duplicate detection over canonical keys.
//!
//! Two separate trackers with different semantics:
//! - [`StreamingDuplicates`] answers "seen before?" in one causal pass and is
//!   used to annotate or drop repeats as they arrive.
//! - [`OccurrenceCounter`] / [`ClusterClassifier`] count every key over the
//!   whole corpus first, then pick one exemplar per cluster on a second pass.
//!   A cluster's size is only known once the first pass has drained, so the
//!   classifier can only be obtained by closing the counter.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use storm_core::Event;

use crate::canonical::{CanonicalKey, Canonicalizer};

/// One-pass "seen before" set.
#[derive(Debug, Default)]
pub struct StreamingDuplicates {
    canonicalizer: Canonicalizer,
    seen: HashSet<CanonicalKey>,
}

impl StreamingDuplicates {
    pub fn new(canonicalizer: Canonicalizer) -> Self {
        Self {
            canonicalizer,
            seen: HashSet::new(),
        }
    }

    /// False the first time a message is seen, true every time after.
    pub fn is_duplicate(&mut self, text: &str) -> bool {
        let key = self.canonicalizer.canonical_key(text);
        !self.seen.insert(key)
    }

    /// Number of distinct messages seen so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// First pass of the global duplicate count.
#[derive(Debug, Default)]
pub struct OccurrenceCounter {
    canonicalizer: Canonicalizer,
    counts: HashMap<CanonicalKey, u64>,
    recorded: u64,
}

impl OccurrenceCounter {
    pub fn new(canonicalizer: Canonicalizer) -> Self {
        Self {
            canonicalizer,
            counts: HashMap::new(),
            recorded: 0,
        }
    }

    pub fn record_occurrence(&mut self, text: &str) {
        let key = self.canonicalizer.canonical_key(text);
        *self.counts.entry(key).or_insert(0) += 1;
        self.recorded += 1;
    }

    /// Occurrences recorded so far for the message behind `text`.
    pub fn count(&self, text: &str) -> u64 {
        let key = self.canonicalizer.canonical_key(text);
        self.counts.get(&key).copied().unwrap_or(0)
    }

    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// End of the first pass. The counts are final from here on.
    pub fn close(self) -> ClusterClassifier {
        debug!(
            recorded = self.recorded,
            distinct = self.counts.len(),
            "First duplicate pass closed"
        );
        ClusterClassifier {
            canonicalizer: self.canonicalizer,
            counts: self.counts,
            clusters: Vec::new(),
        }
    }
}

/// A set of occurrences sharing one canonical key.
#[derive(Clone, Debug, PartialEq)]
pub struct DuplicateCluster {
    pub key: CanonicalKey,
    /// Total occurrences across the corpus.
    pub count: u64,
    /// The first occurrence met on the second pass.
    pub exemplar: Event,
}

/// Second pass of the global duplicate count.
#[derive(Debug)]
pub struct ClusterClassifier {
    canonicalizer: Canonicalizer,
    counts: HashMap<CanonicalKey, u64>,
    clusters: Vec<DuplicateCluster>,
}

impl ClusterClassifier {
    /// If this event's message occurred more than once, make it the cluster's
    /// exemplar and return the cluster size. Later occurrences return `None`.
    pub fn classify(&mut self, event: &Event) -> Option<u64> {
        let key = self.canonicalizer.canonical_key(&event.text);
        match self.counts.get(&key).copied() {
            Some(count) if count > 1 => {
                self.counts.remove(&key);
                self.clusters.push(DuplicateCluster {
                    key,
                    count,
                    exemplar: event.clone(),
                });
                Some(count)
            }
            _ => None,
        }
    }

    pub fn clusters(&self) -> &[DuplicateCluster] {
        &self.clusters
    }

    pub fn into_report(self) -> DuplicateReport {
        DuplicateReport::new(self.clusters)
    }
}

/// Duplicate clusters ordered by descending size.
///
/// Equal sizes keep the order their exemplars were met in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DuplicateReport {
    clusters: Vec<DuplicateCluster>,
}

impl DuplicateReport {
    pub fn new(mut clusters: Vec<DuplicateCluster>) -> Self {
        clusters.sort_by(|a, b| b.count.cmp(&a.count));
        Self { clusters }
    }

    pub fn clusters(&self) -> &[DuplicateCluster] {
        &self.clusters
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Up to `limit` largest clusters whose exemplar's author is (or is not)
    /// the subject the exemplar is attributed to.
    pub fn top(
        &self,
        limit: usize,
        author_is_subject: bool,
    ) -> impl Iterator<Item = &DuplicateCluster> {
        self.clusters
            .iter()
            .filter(move |c| c.exemplar.author_is_subject() == author_is_subject)
            .take(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use storm_core::{Author, SubjectRef};

    fn make_event(id: u64, text: &str) -> Event {
        let ts = Utc.with_ymd_and_hms(2020, 3, 1, 12, 0, 0).unwrap();
        let author = Author {
            id: 100 + id,
            screen_name: format!("user{}", id),
            ..Author::default()
        };
        Event::new(id, ts, text, author)
    }

    #[test]
    fn test_streaming_sequence() {
        let mut tracker = StreamingDuplicates::default();
        let results: Vec<bool> = [
            "RT @alice: storm warning",
            "RT @bob: storm warning",
            "something else",
            "storm warning",
        ]
        .iter()
        .map(|t| tracker.is_duplicate(t))
        .collect();
        assert_eq!(results, vec![false, true, false, true]);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_two_pass_counts_and_exemplars() {
        let texts = [
            "RT @a: message x",
            "message y",
            "RT @b: message x",
            "RT @c: message y",
            "message x",
            "lonely message",
        ];
        let mut counter = OccurrenceCounter::default();
        for t in &texts {
            counter.record_occurrence(t);
        }
        assert_eq!(counter.count("message x"), 3);
        assert_eq!(counter.count("message y"), 2);
        assert_eq!(counter.count("lonely message"), 1);
        assert_eq!(counter.distinct(), 3);

        let mut classifier = counter.close();
        let marks: Vec<Option<u64>> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| classifier.classify(&make_event(i as u64, t)))
            .collect();
        assert_eq!(marks, vec![Some(3), Some(2), None, None, None, None]);

        let report = classifier.into_report();
        assert_eq!(report.len(), 2);
        assert_eq!(report.clusters()[0].count, 3);
        assert_eq!(report.clusters()[0].exemplar.id, 0);
        assert_eq!(report.clusters()[1].count, 2);
        assert_eq!(report.clusters()[1].exemplar.id, 1);
    }

    #[test]
    fn test_report_sorted_descending_with_stable_ties() {
        let clusters = vec![
            DuplicateCluster {
                key: Canonicalizer::new().canonical_key("a"),
                count: 2,
                exemplar: make_event(1, "a"),
            },
            DuplicateCluster {
                key: Canonicalizer::new().canonical_key("b"),
                count: 5,
                exemplar: make_event(2, "b"),
            },
            DuplicateCluster {
                key: Canonicalizer::new().canonical_key("c"),
                count: 2,
                exemplar: make_event(3, "c"),
            },
        ];
        let report = DuplicateReport::new(clusters);
        let ids: Vec<u64> = report.clusters().iter().map(|c| c.exemplar.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_report_top_filters_by_author_is_subject() {
        let mut by_subject = make_event(1, "a");
        by_subject.subject = SubjectRef::new(by_subject.author.id, "user1");
        let clusters = vec![
            DuplicateCluster {
                key: Canonicalizer::new().canonical_key("a"),
                count: 4,
                exemplar: by_subject,
            },
            DuplicateCluster {
                key: Canonicalizer::new().canonical_key("b"),
                count: 3,
                exemplar: make_event(2, "b"),
            },
            DuplicateCluster {
                key: Canonicalizer::new().canonical_key("c"),
                count: 2,
                exemplar: make_event(3, "c"),
            },
        ];
        let report = DuplicateReport::new(clusters);

        let others: Vec<u64> = report.top(10, false).map(|c| c.exemplar.id).collect();
        assert_eq!(others, vec![2, 3]);
        let subjects: Vec<u64> = report.top(10, true).map(|c| c.exemplar.id).collect();
        assert_eq!(subjects, vec![1]);
        assert_eq!(report.top(1, false).count(), 1);
    }

    #[test]
    fn test_classifier_ignores_unseen_messages() {
        let mut classifier = OccurrenceCounter::default().close();
        assert_eq!(classifier.classify(&make_event(1, "never counted")), None);
        assert!(classifier.clusters().is_empty());
    }
}
