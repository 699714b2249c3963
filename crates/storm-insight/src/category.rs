//! Phrase-corpus categorization.

use std::path::Path;

use regex::Regex;
use tracing::info;

use storm_core::Event;

use crate::error::InsightError;

/// Phrases to look for, each lowercased and padded with one space per side
/// so only whole-word runs match.
#[derive(Clone, Debug, Default)]
pub struct Corpus {
    phrases: Vec<String>,
}

impl Corpus {
    /// Build from bare phrases. Blank entries are skipped.
    pub fn from_phrases<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut padded: Vec<String> = Vec::new();
        for phrase in phrases {
            let phrase = phrase.as_ref().trim();
            if phrase.is_empty() {
                continue;
            }
            let p = format!(" {} ", phrase.to_lowercase());
            if !padded.contains(&p) {
                padded.push(p);
            }
        }
        Self { phrases: padded }
    }

    /// Load a corpus file: one phrase per line, `|`-separated columns of which
    /// only the first is used.
    pub fn load(path: &Path) -> Result<Self, InsightError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| InsightError::CorpusLoad(format!("{}: {}", path.display(), e)))?;

        let corpus = Self::from_phrases(
            content
                .lines()
                .map(|line| line.split('|').next().unwrap_or_default()),
        );
        if corpus.is_empty() {
            return Err(InsightError::CorpusLoad(format!(
                "{}: no phrases",
                path.display()
            )));
        }

        info!(path = %path.display(), phrases = corpus.len(), "Corpus loaded");
        Ok(corpus)
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

/// Tags events with every corpus phrase their text contains.
pub struct CategoryMatcher {
    corpus: Corpus,
    non_word: Regex,
}

impl CategoryMatcher {
    pub fn new(corpus: Corpus) -> Self {
        Self {
            corpus,
            non_word: Regex::new(r"[^A-Za-z0-9_]").unwrap(),
        }
    }

    /// Phrases found in `text`, in corpus order.
    pub fn matches(&self, text: &str) -> Vec<&str> {
        let lowered = text.to_lowercase();
        let normalized = format!(" {} ", self.non_word.replace_all(&lowered, " "));

        self.corpus
            .phrases
            .iter()
            .filter(|p| normalized.contains(p.as_str()))
            .map(|p| p.trim())
            .collect()
    }

    /// Append matched phrases to the event's categories, skipping any it
    /// already carries. Returns how many were added.
    pub fn categorize(&self, event: &mut Event) -> usize {
        let mut added = 0;
        for phrase in self.matches(&event.text) {
            if !event.categories.iter().any(|c| c == phrase) {
                event.categories.push(phrase.to_string());
                added += 1;
            }
        }
        added
    }
}
