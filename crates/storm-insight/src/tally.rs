//! Per-subject event counts.

use std::collections::HashMap;

use serde::Serialize;

use storm_core::{Event, SubjectRecord};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyRow {
    pub screen_name: String,
    pub name: String,
    pub count: u64,
    /// Share of all records read, rounded to two decimals.
    pub percentage: f64,
}

/// Counts events per monitored subject. Every subject on the list gets a row,
/// including those never seen; events with no subject are not counted.
#[derive(Debug)]
pub struct SubjectTally {
    subjects: Vec<(u64, String, String)>,
    counts: HashMap<u64, u64>,
}

impl SubjectTally {
    pub fn new(subjects: &[SubjectRecord]) -> Self {
        Self {
            subjects: subjects
                .iter()
                .map(|s| (s.id, s.screen_name.clone(), s.name.clone()))
                .collect(),
            counts: HashMap::new(),
        }
    }

    pub fn record(&mut self, event: &Event) {
        if !event.subject.is_none() {
            *self.counts.entry(event.subject.id).or_insert(0) += 1;
        }
    }

    /// Rows by count descending, then screen name ascending (ignoring case).
    pub fn rows(&self, records_read: u64) -> Vec<TallyRow> {
        let mut rows: Vec<TallyRow> = self
            .subjects
            .iter()
            .map(|(id, screen_name, name)| {
                let count = self.counts.get(id).copied().unwrap_or(0);
                TallyRow {
                    screen_name: screen_name.clone(),
                    name: name.clone(),
                    count,
                    percentage: percentage(count, records_read),
                }
            })
            .collect();
        rows.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.screen_name.to_lowercase().cmp(&b.screen_name.to_lowercase()))
        });
        rows
    }
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 10_000.0).round() / 100.0
}
