//! The monitored subject list and subject attribution.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::info;

use storm_core::{Event, SubjectRecord, SubjectRef};

use crate::error::InsightError;

/// Monitored subjects, indexed by id and by lowercase screen name.
#[derive(Clone, Debug, Default)]
pub struct SubjectRegistry {
    records: Vec<SubjectRecord>,
    ids: HashSet<u64>,
    screen_names: HashMap<String, usize>,
}

impl SubjectRegistry {
    pub fn new(records: Vec<SubjectRecord>) -> Self {
        let ids = records.iter().map(|r| r.id).collect();
        let screen_names = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.screen_name.to_lowercase(), i))
            .collect();
        Self {
            records,
            ids,
            screen_names,
        }
    }

    /// Load a JSON array of subject records.
    pub fn load(path: &Path) -> Result<Self, InsightError> {
        let content = std::fs::read_to_string(path)?;
        let records: Vec<SubjectRecord> = serde_json::from_str(&content).map_err(|e| {
            InsightError::SubjectList(format!("{}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), subjects = records.len(), "Subject list loaded");
        Ok(Self::new(records))
    }

    pub fn is_subject(&self, id: u64) -> bool {
        id != 0 && self.ids.contains(&id)
    }

    /// Case-insensitive lookup.
    pub fn by_screen_name(&self, screen_name: &str) -> Option<&SubjectRecord> {
        self.screen_names
            .get(&screen_name.to_lowercase())
            .map(|&i| &self.records[i])
    }

    pub fn records(&self) -> &[SubjectRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Decide which subject an event is about. First match wins:
    /// 1. the author,
    /// 2. the referenced (replied-to, quoted, retweeted) user,
    /// 3. the first mentioned user, in mention order,
    /// 4. nobody.
    pub fn resolve(&self, event: &Event) -> SubjectRef {
        if self.is_subject(event.author.id) {
            return SubjectRef::new(event.author.id, event.author.screen_name.clone());
        }

        if let Some(origin) = event.origin() {
            if let Some(user_id) = origin.user_id.filter(|&id| self.is_subject(id)) {
                return SubjectRef::new(user_id, origin.screen_name.unwrap_or_default());
            }
        }

        if let Some(m) = event.mentions.iter().find(|m| self.is_subject(m.id)) {
            return SubjectRef::new(m.id, m.screen_name.clone());
        }

        SubjectRef::none()
    }
}
