use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two kinds of contribution a flair rule can count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Post,
    Comment,
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityType::Post => write!(f, "post"),
            ActivityType::Comment => write!(f, "comment"),
        }
    }
}

/// A threshold rule. `min` and `max` are both inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub min: u32,
    pub max: u32,
    #[serde(default)]
    pub weight: f64,
    pub text: String,
    #[serde(rename = "class", default)]
    pub css_class: String,
}

impl Rule {
    pub fn matches(&self, counts: &ActivityCounts) -> bool {
        let count = counts.get(self.activity_type);
        self.min <= count && count <= self.max
    }

    pub fn flair(&self) -> Flair {
        Flair::new(self.text.clone(), self.css_class.clone())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityCounts {
    pub posts: u32,
    pub comments: u32,
}

impl ActivityCounts {
    pub fn new(posts: u32, comments: u32) -> Self {
        Self { posts, comments }
    }

    pub fn get(&self, activity_type: ActivityType) -> u32 {
        match activity_type {
            ActivityType::Post => self.posts,
            ActivityType::Comment => self.comments,
        }
    }

    pub fn record(&mut self, kind: &ItemKind) {
        match kind {
            ItemKind::Post => self.posts += 1,
            ItemKind::Comment => self.comments += 1,
            ItemKind::Other(_) => {}
        }
    }

    pub fn total(&self) -> u32 {
        self.posts + self.comments
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flair {
    pub text: String,
    pub css_class: String,
}

impl Flair {
    pub fn new(text: impl Into<String>, css_class: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            css_class: css_class.into(),
        }
    }

    /// The flair sent for users no rule covers; clears any existing flair.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.css_class.is_empty()
    }
}

/// Reddit "thing" kind of a listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    Comment,
    Post,
    Other(String),
}

impl ItemKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "t1" => ItemKind::Comment,
            "t3" => ItemKind::Post,
            other => ItemKind::Other(other.to_string()),
        }
    }
}

/// One entry of a listing, reduced to what discovery and counting need.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingItem {
    pub kind: ItemKind,
    /// Fullname such as `t1_abc123`; unique across kinds.
    pub fullname: String,
    pub author: String,
    pub subreddit: String,
    pub created_utc: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPage {
    pub items: Vec<ListingItem>,
    /// Cursor for the next page; `None` once the listing is exhausted.
    pub after: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn new(
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        expires_in: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_at: now + expires_in,
        }
    }

    pub fn expires_in(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at - now
    }

    pub fn needs_refresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_in(now) <= margin
    }
}
