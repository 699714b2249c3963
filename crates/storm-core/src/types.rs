use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// The kind of post an event was normalized from. Exactly one per event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PostType {
    /// An original post by an account that is not a subject.
    Tweet,
    /// An original post by a monitored subject.
    SubjectTweet,
    Reply,
    Quote,
    /// A platform retweet.
    Retweet,
    /// Text copied by hand behind an `RT @handle` prefix.
    ManualRetweet,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tweet => "tweet",
            Self::SubjectTweet => "subject-tweet",
            Self::Reply => "reply",
            Self::Quote => "quote",
            Self::Retweet => "retweet",
            Self::ManualRetweet => "manual-retweet",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tweet" => Some(Self::Tweet),
            "subject-tweet" => Some(Self::SubjectTweet),
            "reply" => Some(Self::Reply),
            "quote" => Some(Self::Quote),
            "retweet" => Some(Self::Retweet),
            "manual-retweet" => Some(Self::ManualRetweet),
            _ => None,
        }
    }

    /// Whether events of this type reference another post.
    pub fn has_origin(&self) -> bool {
        matches!(self, Self::Reply | Self::Quote | Self::Retweet)
    }
}

impl std::fmt::Display for PostType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Event
// =============================================================================

/// The account that wrote a post.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: u64,
    pub screen_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub follower_count: u64,
    #[serde(default)]
    pub post_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub is_subject: bool,
}

/// The monitored subject an event is about. `{0, ""}` means none.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRef {
    pub id: u64,
    pub screen_name: String,
}

impl SubjectRef {
    pub fn new(id: u64, screen_name: impl Into<String>) -> Self {
        Self {
            id,
            screen_name: screen_name.into(),
        }
    }

    /// The "no subject identified" value.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_none(&self) -> bool {
        self.id == 0
    }
}

/// A user mentioned in the post text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mention {
    pub id: u64,
    pub screen_name: String,
}

/// An attached media item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub url: String,
    pub id: u64,
    #[serde(rename = "type")]
    pub media_type: String,
}

/// The post and user an event references.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Origin {
    pub id: u64,
    pub user_id: Option<u64>,
    pub screen_name: Option<String>,
    pub is_subject: bool,
}

/// The canonical event every pipeline stage consumes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: u64,
    pub time_stamp: DateTime<Utc>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted_text: Option<String>,
    pub author: Author,
    #[serde(default)]
    pub subject: SubjectRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_user_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_screen_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_is_subject: Option<bool>,
    #[serde(rename = "type")]
    pub post_type: PostType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<Mention>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<Media>,
    #[serde(default, alias = "cat", skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate: Option<bool>,
}

impl Event {
    /// A plain event with no origin, entities or annotations.
    pub fn new(id: u64, time_stamp: DateTime<Utc>, text: impl Into<String>, author: Author) -> Self {
        let post_type = if author.is_subject {
            PostType::SubjectTweet
        } else {
            PostType::Tweet
        };
        Self {
            id,
            time_stamp,
            text: text.into(),
            quoted_text: None,
            author,
            subject: SubjectRef::none(),
            origin_id: None,
            origin_user_id: None,
            origin_screen_name: None,
            origin_is_subject: None,
            post_type,
            mentions: Vec::new(),
            urls: Vec::new(),
            media: Vec::new(),
            categories: Vec::new(),
            duplicate: None,
        }
    }

    /// The referenced post, if any.
    pub fn origin(&self) -> Option<Origin> {
        self.origin_id.map(|id| Origin {
            id,
            user_id: self.origin_user_id,
            screen_name: self.origin_screen_name.clone(),
            is_subject: self.origin_is_subject.unwrap_or(false),
        })
    }

    /// Replace the origin fields as a unit.
    pub fn set_origin(&mut self, origin: Option<Origin>) {
        match origin {
            Some(o) => {
                self.origin_id = Some(o.id);
                self.origin_user_id = o.user_id;
                self.origin_screen_name = o.screen_name;
                self.origin_is_subject = Some(o.is_subject);
            }
            None => {
                self.origin_id = None;
                self.origin_user_id = None;
                self.origin_screen_name = None;
                self.origin_is_subject = None;
            }
        }
    }

    pub fn has_categories(&self) -> bool {
        !self.categories.is_empty()
    }

    /// True only when duplicate identification ran and flagged this event.
    pub fn is_duplicate(&self) -> bool {
        self.duplicate == Some(true)
    }

    /// Whether the event was written by the subject it is attributed to.
    /// Screen names are compared, exactly as written.
    pub fn author_is_subject(&self) -> bool {
        !self.subject.is_none() && self.subject.screen_name == self.author.screen_name
    }
}

// =============================================================================
// Subjects
// =============================================================================

/// An entry of the monitored subject list, in the platform's user-lookup shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub id: u64,
    pub screen_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
}

impl SubjectRecord {
    /// Placeholder used in reports when a subject is not on the list.
    pub fn unknown() -> Self {
        Self {
            id: 0,
            screen_name: "unknown".to_string(),
            name: "unknown".to_string(),
            description: Some("unknown".to_string()),
            followers_count: 0,
            location: None,
            handle: None,
        }
    }
}
