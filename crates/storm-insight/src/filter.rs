//! Per-event selection for the extract-style commands.

use tracing::trace;

use storm_core::Event;

use crate::canonical::Canonicalizer;
use crate::duplicate::StreamingDuplicates;

/// What to keep. Screen-name comparisons ignore case.
#[derive(Clone, Debug, Default)]
pub struct FilterOptions {
    pub subject: Option<String>,
    pub author: Option<String>,
    pub categorized_only: bool,
    pub remove_duplicates: bool,
    /// Keep events already annotated as duplicates.
    pub only_duplicates: bool,
    /// Write the streaming duplicate verdict into `event.duplicate`.
    pub identify_duplicates: bool,
}

/// Applies [`FilterOptions`] in order: subject, author, categorized,
/// duplicates. The first failing check rejects the event.
///
/// The streaming duplicate tracker only sees events that passed the other
/// checks, and sees each of them exactly once. `only_duplicates` never
/// consults it: it trusts the `duplicate` annotation left by an earlier
/// identify run, which was decided over the whole stream.
#[derive(Debug)]
pub struct EventFilter {
    subject: Option<String>,
    author: Option<String>,
    categorized_only: bool,
    remove_duplicates: bool,
    only_duplicates: bool,
    identify_duplicates: bool,
    tracker: StreamingDuplicates,
}

impl EventFilter {
    pub fn new(options: FilterOptions, canonicalizer: Canonicalizer) -> Self {
        Self {
            subject: options.subject.map(|s| s.to_lowercase()),
            author: options.author.map(|s| s.to_lowercase()),
            categorized_only: options.categorized_only,
            remove_duplicates: options.remove_duplicates,
            only_duplicates: options.only_duplicates,
            identify_duplicates: options.identify_duplicates,
            tracker: StreamingDuplicates::new(canonicalizer),
        }
    }

    fn tracks_duplicates(&self) -> bool {
        self.identify_duplicates || self.remove_duplicates
    }

    /// Whether to keep the event. May annotate `event.duplicate`.
    pub fn apply(&mut self, event: &mut Event) -> bool {
        if let Some(subject) = &self.subject {
            if event.subject.screen_name.to_lowercase() != *subject {
                return false;
            }
        }

        if let Some(author) = &self.author {
            if event.author.screen_name.to_lowercase() != *author {
                return false;
            }
        }

        if self.categorized_only && !event.has_categories() {
            return false;
        }

        if self.tracks_duplicates() {
            let duplicate = self.tracker.is_duplicate(&event.text);
            if self.identify_duplicates {
                event.duplicate = Some(duplicate);
            }
            if self.remove_duplicates && duplicate {
                trace!(id = event.id, "Dropping duplicate");
                return false;
            }
        }

        if self.only_duplicates && !event.is_duplicate() {
            return false;
        }

        true
    }

    /// Distinct messages the streaming tracker has seen.
    pub fn distinct_messages(&self) -> usize {
        self.tracker.len()
    }
}
