//! End-to-end tests for the analysis pipeline.
//!
//! Raw payloads go through normalization, categorization, streaming duplicate
//! identification and the two-pass statistics run, exactly as the
//! `stormwatch` commands chain them.

use chrono::{FixedOffset, NaiveDate};
use serde_json::{json, Value};

use storm_core::{Event, PostType, SubjectRecord};
use storm_insight::{
    AnomalyDetector, Canonicalizer, CategoryMatcher, Corpus, CountingPass, EventFilter,
    EventNormalizer, FilterOptions, Granularity, InsightError, StatisticsOutcome,
    StormThresholds, SubjectRegistry, TemporalAggregator,
};

// =============================================================================
// Helpers
// =============================================================================

const MESSAGE: &str = "Flood warning for the valley tonight";

fn subjects() -> SubjectRegistry {
    SubjectRegistry::new(vec![SubjectRecord {
        id: 1,
        screen_name: "MinisterA".to_string(),
        name: "Minister A".to_string(),
        description: Some("Minister for water".to_string()),
        followers_count: 5000,
        location: None,
        handle: Some("@MinisterA".to_string()),
    }])
}

fn user(id: u64, screen_name: &str) -> Value {
    json!({"id": id, "screen_name": screen_name, "name": screen_name, "followers_count": 10, "statuses_count": 20})
}

fn post(id: u64, day: u32, text: &str, author: Value) -> Value {
    let created_at = NaiveDate::from_ymd_opt(2020, 3, day)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
        .format("%a %b %d %H:%M:%S +0000 %Y")
        .to_string();
    json!({
        "created_at": created_at,
        "id": id,
        "text": text,
        "user": author,
    })
}

fn retweet_of_message(id: u64, day: u32, author: Value) -> Value {
    let mut raw = post(id, day, &format!("RT @MinisterA: {}", MESSAGE), author);
    raw["retweeted_status"] = json!({"id": 500, "text": MESSAGE, "user": user(1, "MinisterA")});
    raw
}

/// Five records over four days: two retweets of one message, then three
/// unrelated posts, two of them on the last day.
fn raw_corpus() -> Vec<String> {
    vec![
        retweet_of_message(101, 1, user(10, "alice")),
        retweet_of_message(102, 2, user(11, "bob")),
        post(103, 3, "Lovely sunny afternoon", user(12, "carol")),
        post(104, 4, "Traffic jam on the bridge", user(13, "dave")),
        post(105, 4, "Lunch was great", user(14, "erin")),
    ]
    .into_iter()
    .map(|v| v.to_string())
    .collect()
}

fn prepare(lines: &[String]) -> Vec<Event> {
    let normalizer = EventNormalizer::new(subjects());
    let matcher = CategoryMatcher::new(Corpus::from_phrases(["flood"]));
    let mut filter = EventFilter::new(
        FilterOptions {
            identify_duplicates: true,
            ..FilterOptions::default()
        },
        Canonicalizer::new(),
    );

    lines
        .iter()
        .filter_map(|line| normalizer.normalize_json(line).ok())
        .map(|mut event| {
            matcher.categorize(&mut event);
            event
        })
        .filter_map(|mut event| filter.apply(&mut event).then_some(event))
        .collect()
}

fn run(events: &[Event], granularity: Granularity) -> StatisticsOutcome {
    let aggregator = TemporalAggregator::new(
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        FixedOffset::east_opt(0).unwrap(),
    );
    let detector = AnomalyDetector::new(StormThresholds {
        zscore: 1.5,
        min_count: 1,
    });

    let mut counting = CountingPass::new(Canonicalizer::new(), aggregator, detector);
    for event in events {
        counting.record(event);
    }
    let mut aggregating = counting.close();
    for event in events {
        aggregating.aggregate(event);
    }
    aggregating.finish(granularity)
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_prepared_events() {
    let events = prepare(&raw_corpus());
    assert_eq!(events.len(), 5);

    let first = &events[0];
    assert_eq!(first.post_type, PostType::Retweet);
    assert_eq!(first.subject.screen_name, "MinisterA");
    assert_eq!(first.categories, vec!["flood"]);
    assert_eq!(first.duplicate, Some(false));

    assert_eq!(events[1].duplicate, Some(true));
    assert!(events[2..].iter().all(|e| e.duplicate == Some(false)));
    assert!(events[2..].iter().all(|e| !e.has_categories()));
    assert!(events[2..].iter().all(|e| e.post_type == PostType::Tweet));
}

#[test]
fn test_end_to_end_bucket_table() {
    let outcome = run(&prepare(&raw_corpus()), Granularity::Day);
    let report = &outcome.storms;

    let table: Vec<(f64, &str, bool, u64, u64, u64, u64, u64)> = report
        .buckets
        .iter()
        .map(|b| {
            (
                b.point,
                b.title.as_str(),
                b.is_storm,
                b.counts.count,
                b.counts.unclassified,
                b.counts.unclassified_duplicate,
                b.counts.classified,
                b.counts.classified_duplicate,
            )
        })
        .collect();

    assert_eq!(
        table,
        vec![
            (60.0, "01/03/20", false, 1, 0, 0, 1, 0),
            (61.0, "02/03/20", false, 1, 0, 0, 0, 1),
            (62.0, "03/03/20", false, 1, 1, 0, 0, 0),
            (63.0, "04/03/20", true, 2, 2, 0, 0, 0),
        ]
    );

    assert!((report.stats.mean - 1.25).abs() < 1e-9);
    assert_eq!(report.stats.median, 1.0);
    assert!((report.stats.standard_deviation - 0.4330127).abs() < 1e-6);
    assert_eq!(report.stats.sum, 5);
    assert_eq!(report.stats.totals.unclassified, 3);
    assert_eq!(report.stats.totals.classified, 1);
    assert_eq!(report.stats.totals.classified_duplicate, 1);
    assert_eq!(report.num_storm_windows, 1);
    assert!((report.buckets[3].stddev_score - 1.7320508).abs() < 1e-6);
}

#[test]
fn test_end_to_end_duplicate_list() {
    let outcome = run(&prepare(&raw_corpus()), Granularity::Day);

    assert_eq!(outcome.duplicates.len(), 1);
    let cluster = &outcome.duplicates.clusters()[0];
    assert_eq!(cluster.count, 2);
    assert_eq!(cluster.exemplar.id, 101);
    assert_eq!(cluster.exemplar.author.screen_name, "alice");

    assert_eq!(outcome.duplicates.top(200, false).count(), 1);
    assert_eq!(outcome.duplicates.top(200, true).count(), 0);
}

#[test]
fn test_end_to_end_hour_buckets() {
    let outcome = run(&prepare(&raw_corpus()), Granularity::Hour);
    let points: Vec<f64> = outcome.storms.buckets.iter().map(|b| b.point).collect();
    let offset = 10.0 / 24.0;
    assert_eq!(
        points,
        vec![60.0 + offset, 61.0 + offset, 62.0 + offset, 63.0 + offset]
    );
    assert_eq!(outcome.storms.buckets[3].title, "04/03/20 10");
    assert!(outcome.storms.buckets[3].is_storm);
}

#[test]
fn test_events_survive_json_lines_between_commands() {
    let events = prepare(&raw_corpus());
    let lines: Vec<String> = events
        .iter()
        .map(|e| serde_json::to_string(e).unwrap())
        .collect();
    let reread: Vec<Event> = lines
        .iter()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    let direct = run(&events, Granularity::Day);
    let via_file = run(&reread, Granularity::Day);
    assert_eq!(direct.storms, via_file.storms);
    assert_eq!(direct.duplicates.len(), via_file.duplicates.len());
}

#[test]
fn test_bad_records_are_skipped() {
    let normalizer = EventNormalizer::new(subjects());
    let mut lines = raw_corpus();
    lines.insert(1, "{ not json".to_string());
    lines.insert(2, json!({"id": 7, "text": "no time", "user": user(3, "x")}).to_string());

    let mut malformed = 0;
    let mut missing_timestamp = 0;
    let mut emitted = 0;
    for line in &lines {
        match normalizer.normalize_json(line) {
            Ok(_) => emitted += 1,
            Err(InsightError::MalformedPayload(_)) => malformed += 1,
            Err(InsightError::MissingTimestamp) => missing_timestamp += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!((emitted, malformed, missing_timestamp), (5, 1, 1));
}
