//! Event sources: a line reader plus the per-command processing stage and
//! filters.

use std::path::Path;

use storm_core::{Event, Result, SubjectRecord};
use storm_insight::{
    CategoryMatcher, EventFilter, EventNormalizer, InsightError, SubjectTally, TallyRow,
};

use crate::reader::{parse_event, LineReader, ReadCounts};

/// What turns an input line into an event.
pub enum Stage {
    /// Lines are raw platform payloads.
    Normalize(EventNormalizer),
    /// Lines are events; tag them with corpus phrases.
    Categorize(CategoryMatcher),
    /// Lines are events, used as is.
    Events,
}

impl Stage {
    fn process(&self, line: &str) -> std::result::Result<Event, InsightError> {
        match self {
            Self::Normalize(normalizer) => normalizer.normalize_json(line),
            Self::Categorize(matcher) => {
                let mut event = parse_event(line)?;
                matcher.categorize(&mut event);
                Ok(event)
            }
            Self::Events => parse_event(line),
        }
    }
}

/// Yields the events of one input file that survive the stage and filters.
pub struct EventSource {
    reader: LineReader,
    stage: Stage,
    filter: EventFilter,
    counts: ReadCounts,
    tally: Option<SubjectTally>,
}

impl EventSource {
    pub async fn open(path: &Path, stage: Stage, filter: EventFilter) -> Result<Self> {
        Ok(Self {
            reader: LineReader::open(path).await?,
            stage,
            filter,
            counts: ReadCounts::default(),
            tally: None,
        })
    }

    /// Also count emitted events per subject.
    pub fn with_tally(mut self, subjects: &[SubjectRecord]) -> Self {
        self.tally = Some(SubjectTally::new(subjects));
        self
    }

    pub async fn next(&mut self) -> Result<Option<Event>> {
        while let Some(line) = self.reader.next_line().await? {
            self.counts.read += 1;

            let mut event = match self.stage.process(&line) {
                Ok(event) => event,
                Err(e) => {
                    self.counts.skip(self.reader.line_number(), &e);
                    continue;
                }
            };

            if !self.filter.apply(&mut event) {
                continue;
            }

            self.counts.emitted += 1;
            if let Some(tally) = self.tally.as_mut() {
                tally.record(&event);
            }
            return Ok(Some(event));
        }

        Ok(None)
    }

    pub fn counts(&self) -> ReadCounts {
        self.counts
    }

    pub fn tally_rows(&self) -> Option<Vec<TallyRow>> {
        self.tally.as_ref().map(|t| t.rows(self.counts.read))
    }

    /// Log the read accounting, and print the per-subject tally if kept.
    pub fn report(&self) {
        self.counts.log_summary(self.reader.path());
        if let Some(rows) = self.tally_rows() {
            for line in tally_lines(self.counts, &rows) {
                println!("{}", line);
            }
        }
    }
}

/// `Read: n, Output: m` followed by one `screen name, name, count, pct%` line
/// per subject.
pub fn tally_lines(counts: ReadCounts, rows: &[TallyRow]) -> Vec<String> {
    std::iter::once(format!("Read: {}, Output: {}", counts.read, counts.emitted))
        .chain(rows.iter().map(|row| {
            format!(
                "{}, {}, {}, {}%",
                row.screen_name, row.name, row.count, row.percentage
            )
        }))
        .collect()
}
