//! Raw platform payloads, as delivered by the streaming API (v1.1 shape).
//!
//! Only the fields normalization reads are modelled; everything else in the
//! payload is ignored.

use serde::Deserialize;

use crate::error::InsightError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPost {
    /// e.g. `"Thu Mar 01 22:42:15 +0000 2018"`.
    pub created_at: Option<String>,
    pub id: Option<u64>,
    pub text: Option<String>,
    pub user: Option<RawUser>,
    pub extended_tweet: Option<RawExtendedPost>,
    pub entities: Option<RawEntities>,
    pub extended_entities: Option<RawEntities>,
    pub in_reply_to_status_id: Option<u64>,
    pub in_reply_to_user_id: Option<u64>,
    pub in_reply_to_screen_name: Option<String>,
    #[serde(default)]
    pub is_quote_status: bool,
    pub quoted_status_id: Option<u64>,
    pub quoted_status: Option<Box<RawPost>>,
    pub retweeted_status: Option<Box<RawPost>>,
}

impl RawPost {
    pub fn from_json(line: &str) -> Result<Self, InsightError> {
        Ok(serde_json::from_str(line)?)
    }
}

/// The untruncated text and entities of a long post.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawExtendedPost {
    pub full_text: Option<String>,
    pub entities: Option<RawEntities>,
    pub extended_entities: Option<RawEntities>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUser {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub screen_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub statuses_count: u64,
    pub lang: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEntities {
    pub urls: Option<Vec<RawUrl>>,
    pub user_mentions: Option<Vec<RawMention>>,
    pub media: Option<Vec<RawMedia>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUrl {
    #[serde(default)]
    pub url: String,
    pub expanded_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMention {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub screen_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMedia {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub url: String,
    pub expanded_url: Option<String>,
    #[serde(rename = "type", default)]
    pub media_type: String,
}
