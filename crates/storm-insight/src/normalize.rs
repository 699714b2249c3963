//! Raw payload to canonical event conversion.

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::trace;

use storm_core::{Author, Event, Media, Mention, Origin, PostType};

use crate::error::InsightError;
use crate::raw::{RawEntities, RawPost, RawUser};
use crate::subject::SubjectRegistry;

/// `created_at` layout used by the platform.
const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Length of the leading slice of the full text searched for in the truncated one.
const ANCHOR_CHARS: usize = 40;

/// Converts raw platform payloads into canonical [`Event`]s.
pub struct EventNormalizer {
    subjects: SubjectRegistry,
    manual_retweet: Regex,
}

impl EventNormalizer {
    pub fn new(subjects: SubjectRegistry) -> Self {
        Self {
            subjects,
            manual_retweet: Regex::new(r"(?i)^RT\s@").unwrap(),
        }
    }

    pub fn subjects(&self) -> &SubjectRegistry {
        &self.subjects
    }

    /// Parse and normalize one JSON-encoded payload.
    pub fn normalize_json(&self, line: &str) -> Result<Event, InsightError> {
        let raw = RawPost::from_json(line)?;
        self.normalize(&raw)
    }

    /// Normalize one payload.
    ///
    /// The type checks run reply, quote, retweet in that order; when several
    /// apply, the last one decides both the type and the origin.
    pub fn normalize(&self, raw: &RawPost) -> Result<Event, InsightError> {
        let created_at = raw
            .created_at
            .as_deref()
            .ok_or(InsightError::MissingTimestamp)?;
        let time_stamp = parse_created_at(created_at)?;
        let id = raw
            .id
            .ok_or_else(|| InsightError::MalformedPayload("missing id".to_string()))?;
        let user = raw
            .user
            .as_ref()
            .ok_or_else(|| InsightError::MalformedPayload(format!("post {} has no user", id)))?;

        let author = self.author(user);
        let mut event = Event::new(id, time_stamp, raw.text.clone().unwrap_or_default(), author);

        match &raw.extended_tweet {
            Some(ext) => {
                if let Some(full) = &ext.full_text {
                    event.text = full.clone();
                }
                merge_entities(&mut event, ext.entities.as_ref());
                merge_entities(&mut event, ext.extended_entities.as_ref());
            }
            None => {
                merge_entities(&mut event, raw.entities.as_ref());
                merge_entities(&mut event, raw.extended_entities.as_ref());
            }
        }

        let mut resolved: Option<(PostType, Origin)> = None;

        if let Some(reply_id) = raw.in_reply_to_status_id.filter(|&id| id != 0) {
            let user_id = raw.in_reply_to_user_id;
            let origin = Origin {
                id: reply_id,
                user_id,
                screen_name: raw.in_reply_to_screen_name.clone(),
                is_subject: user_id.is_some_and(|id| self.subjects.is_subject(id)),
            };
            resolved = Some((PostType::Reply, origin));
        }

        if raw.is_quote_status {
            let quoted = raw.quoted_status.as_deref();
            let mut origin = Origin {
                id: raw
                    .quoted_status_id
                    .or_else(|| quoted.and_then(|q| q.id))
                    .unwrap_or(0),
                ..Origin::default()
            };

            if let Some(quoted) = quoted {
                if let Some(user) = &quoted.user {
                    self.attach_user(&mut origin, user);
                }
                let short = quoted.text.as_deref().unwrap_or_default();
                match &quoted.extended_tweet {
                    Some(ext) => {
                        if let Some(full) = &ext.full_text {
                            event.quoted_text = Some(reconstruct(short, full));
                        }
                        merge_entities(&mut event, ext.entities.as_ref());
                        merge_entities(&mut event, ext.extended_entities.as_ref());
                    }
                    None => {
                        event.quoted_text = quoted.text.clone();
                        merge_entities(&mut event, quoted.entities.as_ref());
                        merge_entities(&mut event, quoted.extended_entities.as_ref());
                    }
                }
            }
            resolved = Some((PostType::Quote, origin));
        }

        if let Some(retweeted) = raw.retweeted_status.as_deref() {
            let mut origin = Origin {
                id: retweeted.id.unwrap_or(0),
                ..Origin::default()
            };
            if let Some(user) = &retweeted.user {
                self.attach_user(&mut origin, user);
            }
            match &retweeted.extended_tweet {
                Some(ext) => {
                    // A retweet's own text is a truncated copy; rebuild it.
                    if let Some(full) = &ext.full_text {
                        event.text = reconstruct(&event.text, full);
                    }
                    merge_entities(&mut event, ext.entities.as_ref());
                    merge_entities(&mut event, ext.extended_entities.as_ref());
                }
                None => {
                    merge_entities(&mut event, retweeted.entities.as_ref());
                    merge_entities(&mut event, retweeted.extended_entities.as_ref());
                }
            }
            resolved = Some((PostType::Retweet, origin));
        }

        match resolved {
            Some((post_type, origin)) => {
                event.post_type = post_type;
                event.set_origin(Some(origin));
            }
            None if self.manual_retweet.is_match(&event.text) => {
                event.post_type = PostType::ManualRetweet;
            }
            None => {
                event.post_type = if event.author.is_subject {
                    PostType::SubjectTweet
                } else {
                    PostType::Tweet
                };
            }
        }

        event.subject = self.subjects.resolve(&event);

        trace!(id = event.id, post_type = %event.post_type, subject = %event.subject.screen_name, "Normalized");
        Ok(event)
    }

    fn author(&self, user: &RawUser) -> Author {
        Author {
            id: user.id,
            screen_name: user.screen_name.clone(),
            name: user.name.clone(),
            follower_count: user.followers_count,
            post_count: user.statuses_count,
            language: user.lang.clone().filter(|l| !l.is_empty()),
            is_subject: self.subjects.is_subject(user.id),
        }
    }

    fn attach_user(&self, origin: &mut Origin, user: &RawUser) {
        origin.user_id = Some(user.id);
        origin.screen_name = Some(user.screen_name.clone());
        origin.is_subject = self.subjects.is_subject(user.id);
    }
}

fn parse_created_at(value: &str) -> Result<DateTime<Utc>, InsightError> {
    DateTime::parse_from_str(value, CREATED_AT_FORMAT)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| InsightError::MalformedPayload(format!("bad created_at '{}': {}", value, e)))
}

/// Merge one entity block into the event. URL and media lists from a later
/// block replace earlier ones; mentions accumulate.
fn merge_entities(event: &mut Event, entities: Option<&RawEntities>) {
    let Some(entities) = entities else {
        return;
    };

    if let Some(urls) = &entities.urls {
        event.urls = urls
            .iter()
            .map(|u| u.expanded_url.clone().unwrap_or_else(|| u.url.clone()))
            .collect();
    }

    if let Some(mentions) = &entities.user_mentions {
        event.mentions.extend(mentions.iter().map(|m| Mention {
            id: m.id,
            screen_name: m.screen_name.clone(),
        }));
    }

    if let Some(media) = &entities.media {
        event.media = media
            .iter()
            .map(|m| Media {
                url: m.expanded_url.clone().unwrap_or_else(|| m.url.clone()),
                id: m.id,
                media_type: m.media_type.clone(),
            })
            .collect();
    }
}

/// Recover the complete text of a reposted post.
///
/// `truncated` is the repost's own text, typically `RT @handle: ` followed by
/// a clipped copy; `full` is the original's untruncated text. When both are
/// longer than 40 characters and the first 40 characters of `full` appear in
/// `truncated` past index 4, the prefix before them is kept and `full`
/// appended. Otherwise `full` is returned as is.
pub fn reconstruct(truncated: &str, full: &str) -> String {
    if truncated.chars().count() > ANCHOR_CHARS && full.chars().count() > ANCHOR_CHARS {
        let anchor_end = full
            .char_indices()
            .nth(ANCHOR_CHARS)
            .map(|(i, _)| i)
            .unwrap_or(full.len());
        let anchor = &full[..anchor_end];

        if let Some(pos) = truncated.find(anchor) {
            let prefix = &truncated[..pos];
            if prefix.chars().count() > 4 {
                return format!("{}{}", prefix, full);
            }
        }
    }

    full.to_string()
}
