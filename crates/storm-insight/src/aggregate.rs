//! Day and hour bucketing of classified events.

use std::collections::BTreeMap;

use chrono::{FixedOffset, NaiveDate, Timelike};
use serde::Serialize;

use storm_core::Event;

/// Which bucket map to report on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Day,
    Hour,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Hour => "hour",
        }
    }
}

/// The four exclusive classes an event is counted under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    Unclassified,
    UnclassifiedDuplicate,
    Classified,
    ClassifiedDuplicate,
}

impl Classification {
    pub fn of(event: &Event) -> Self {
        match (event.has_categories(), event.is_duplicate()) {
            (false, false) => Self::Unclassified,
            (false, true) => Self::UnclassifiedDuplicate,
            (true, false) => Self::Classified,
            (true, true) => Self::ClassifiedDuplicate,
        }
    }
}

/// Per-bucket tallies. `count` is always the sum of the other four.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketCounts {
    pub count: u64,
    pub unclassified: u64,
    pub unclassified_duplicate: u64,
    pub classified: u64,
    pub classified_duplicate: u64,
}

impl BucketCounts {
    pub fn record(&mut self, class: Classification) {
        self.count += 1;
        match class {
            Classification::Unclassified => self.unclassified += 1,
            Classification::UnclassifiedDuplicate => self.unclassified_duplicate += 1,
            Classification::Classified => self.classified += 1,
            Classification::ClassifiedDuplicate => self.classified_duplicate += 1,
        }
    }

    pub fn merge(&mut self, other: &BucketCounts) {
        self.count += other.count;
        self.unclassified += other.unclassified;
        self.unclassified_duplicate += other.unclassified_duplicate;
        self.classified += other.classified;
        self.classified_duplicate += other.classified_duplicate;
    }
}

/// One time window, ready for scoring.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    /// Days since the epoch; hours add `hour / 24`.
    pub point: f64,
    pub title: String,
    #[serde(flatten)]
    pub counts: BucketCounts,
    /// Distance from the mean in standard deviations. Set when finalized.
    pub stddev_score: f64,
    pub is_storm: bool,
}

/// Accumulates per-day and per-hour counts for one run.
#[derive(Debug)]
pub struct TemporalAggregator {
    epoch: NaiveDate,
    offset: FixedOffset,
    days: BTreeMap<i64, (NaiveDate, BucketCounts)>,
    hours: BTreeMap<(i64, u32), (NaiveDate, BucketCounts)>,
}

impl TemporalAggregator {
    /// `epoch` is day 0; days start at local midnight in `offset`.
    pub fn new(epoch: NaiveDate, offset: FixedOffset) -> Self {
        Self {
            epoch,
            offset,
            days: BTreeMap::new(),
            hours: BTreeMap::new(),
        }
    }

    /// Count the event in its day and its hour.
    pub fn aggregate(&mut self, event: &Event) -> Classification {
        let class = Classification::of(event);
        let local = event.time_stamp.with_timezone(&self.offset);
        let date = local.date_naive();
        let day = date.signed_duration_since(self.epoch).num_days();
        let hour = local.hour();

        self.days
            .entry(day)
            .or_insert_with(|| (date, BucketCounts::default()))
            .1
            .record(class);
        self.hours
            .entry((day, hour))
            .or_insert_with(|| (date, BucketCounts::default()))
            .1
            .record(class);

        class
    }

    /// Buckets of the requested granularity in ascending key order.
    pub fn buckets(&self, granularity: Granularity) -> Vec<Bucket> {
        match granularity {
            Granularity::Day => self
                .days
                .iter()
                .map(|(&day, (date, counts))| Bucket {
                    point: day as f64,
                    title: date.format("%d/%m/%y").to_string(),
                    counts: *counts,
                    stddev_score: 0.0,
                    is_storm: false,
                })
                .collect(),
            Granularity::Hour => self
                .hours
                .iter()
                .map(|(&(day, hour), (date, counts))| Bucket {
                    point: day as f64 + hour as f64 / 24.0,
                    title: format!("{} {:02}", date.format("%d/%m/%y"), hour),
                    counts: *counts,
                    stddev_score: 0.0,
                    is_storm: false,
                })
                .collect(),
        }
    }

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    pub fn hour_count(&self) -> usize {
        self.hours.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use storm_core::Author;

    fn epoch() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn event_at(y: i32, m: u32, d: u32, h: u32, categorized: bool, duplicate: bool) -> Event {
        let ts = Utc.with_ymd_and_hms(y, m, d, h, 15, 0).unwrap();
        let mut event = Event::new(1, ts, "x", Author::default());
        if categorized {
            event.categories = vec!["flood".to_string()];
        }
        event.duplicate = Some(duplicate);
        event
    }

    #[test]
    fn test_classification() {
        assert_eq!(
            Classification::of(&event_at(2020, 1, 1, 0, false, false)),
            Classification::Unclassified
        );
        assert_eq!(
            Classification::of(&event_at(2020, 1, 1, 0, false, true)),
            Classification::UnclassifiedDuplicate
        );
        assert_eq!(
            Classification::of(&event_at(2020, 1, 1, 0, true, false)),
            Classification::Classified
        );
        assert_eq!(
            Classification::of(&event_at(2020, 1, 1, 0, true, true)),
            Classification::ClassifiedDuplicate
        );
    }

    #[test]
    fn test_day_keys_and_titles() {
        let mut agg = TemporalAggregator::new(epoch(), utc());
        agg.aggregate(&event_at(2020, 3, 1, 10, false, false));
        agg.aggregate(&event_at(2020, 1, 1, 23, true, false));
        agg.aggregate(&event_at(2020, 3, 1, 22, false, true));

        let days = agg.buckets(Granularity::Day);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].point, 0.0);
        assert_eq!(days[0].title, "01/01/20");
        assert_eq!(days[0].counts.classified, 1);
        assert_eq!(days[1].point, 60.0);
        assert_eq!(days[1].title, "01/03/20");
        assert_eq!(days[1].counts.count, 2);
        assert_eq!(days[1].counts.unclassified, 1);
        assert_eq!(days[1].counts.unclassified_duplicate, 1);
    }

    #[test]
    fn test_hour_keys_and_titles() {
        let mut agg = TemporalAggregator::new(epoch(), utc());
        agg.aggregate(&event_at(2020, 3, 1, 18, false, false));
        agg.aggregate(&event_at(2020, 3, 1, 6, false, false));
        agg.aggregate(&event_at(2020, 3, 1, 6, true, true));

        let hours = agg.buckets(Granularity::Hour);
        assert_eq!(hours.len(), 2);
        assert_eq!(hours[0].point, 60.25);
        assert_eq!(hours[0].title, "01/03/20 06");
        assert_eq!(hours[0].counts.count, 2);
        assert_eq!(hours[0].counts.classified_duplicate, 1);
        assert_eq!(hours[1].point, 60.75);
        assert_eq!(agg.day_count(), 1);
        assert_eq!(agg.hour_count(), 2);
    }

    #[test]
    fn test_offset_moves_event_to_local_day() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let mut agg = TemporalAggregator::new(epoch(), plus_two);
        agg.aggregate(&event_at(2020, 3, 1, 23, false, false));
        let days = agg.buckets(Granularity::Day);
        assert_eq!(days[0].point, 61.0);
        assert_eq!(days[0].title, "02/03/20");
        let hours = agg.buckets(Granularity::Hour);
        assert_eq!(hours[0].title, "02/03/20 01");
    }

    #[test]
    fn test_before_epoch_is_negative() {
        let mut agg = TemporalAggregator::new(epoch(), utc());
        agg.aggregate(&event_at(2019, 12, 31, 12, false, false));
        assert_eq!(agg.buckets(Granularity::Day)[0].point, -1.0);
    }

    #[test]
    fn test_order_independent() {
        let events = vec![
            event_at(2020, 3, 2, 1, false, false),
            event_at(2020, 3, 1, 5, true, false),
            event_at(2020, 3, 3, 9, false, true),
            event_at(2020, 3, 1, 5, false, false),
        ];
        let mut forward = TemporalAggregator::new(epoch(), utc());
        let mut backward = TemporalAggregator::new(epoch(), utc());
        for e in &events {
            forward.aggregate(e);
        }
        for e in events.iter().rev() {
            backward.aggregate(e);
        }
        assert_eq!(forward.buckets(Granularity::Day), backward.buckets(Granularity::Day));
        assert_eq!(forward.buckets(Granularity::Hour), backward.buckets(Granularity::Hour));
    }

    #[test]
    fn test_bucket_counts_merge() {
        let mut a = BucketCounts::default();
        a.record(Classification::Classified);
        let mut b = BucketCounts::default();
        b.record(Classification::Unclassified);
        b.record(Classification::UnclassifiedDuplicate);
        a.merge(&b);
        assert_eq!(a.count, 3);
        assert_eq!(a.classified, 1);
        assert_eq!(a.unclassified, 1);
        assert_eq!(a.unclassified_duplicate, 1);
    }
}
