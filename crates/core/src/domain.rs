use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt;

/// Placeholder stored when a page field or the channel key could not be found
pub const NOT_FOUND: &str = "Не найдено";

/// Placeholder stored when the posts list exists but no post date was recovered
pub const NO_POST_DATA: &str = "Нет данных о постах";

/// Address template the channel handle is appended to
pub const TELEGRAM_BASE_URL: &str = "https://t.me/";

/// Post timestamp recovered from page text, in local wall-clock time
pub type NormalizedInstant = NaiveDateTime;

/// Channel statistics assembled from one page, before the store stamps it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSnapshot {
    pub telegram_link: String,
    pub channel_url: String,
    pub title: String,
    pub subscribers: String,
    pub average_posts_per_7_days: String,
}

impl ChannelSnapshot {
    /// Turns the snapshot into a stored record persisted at `at`
    pub fn stamp(self, at: DateTime<Utc>) -> ChannelRecord {
        ChannelRecord {
            telegram_link: self.telegram_link,
            channel_url: self.channel_url,
            title: self.title,
            subscribers: self.subscribers,
            average_posts_per_7_days: self.average_posts_per_7_days,
            last_updated: at,
        }
    }
}

/// Channel statistics as kept in the store, keyed by `telegram_link`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    pub telegram_link: String,
    pub channel_url: String,
    pub title: String,
    pub subscribers: String,
    pub average_posts_per_7_days: String,
    pub last_updated: DateTime<Utc>,
}

impl ChannelRecord {
    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            telegram_link: self.telegram_link.clone(),
            channel_url: self.channel_url.clone(),
            title: self.title.clone(),
            subscribers: self.subscribers.clone(),
            average_posts_per_7_days: self.average_posts_per_7_days.clone(),
        }
    }
}

/// Raw field values read from a rendered channel page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSnapshot {
    pub title: Option<String>,
    pub page_url: String,
    pub subscribers: Option<String>,
    /// `None` when the posts list is missing from the page
    pub post_date_texts: Option<Vec<String>>,
}

/// Projected number of posts per 7 days
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActivityRate {
    PerWeek(f64),
    NoData,
}

impl fmt::Display for ActivityRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Half-up to two places; `{:.2}` alone rounds exact ties to even.
            ActivityRate::PerWeek(rate) => write!(f, "{:.2}", (rate * 100.0).round() / 100.0),
            ActivityRate::NoData => f.write_str(NO_POST_DATA),
        }
    }
}

/// Answer given at a confirmation gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Decline,
}

/// What the store shows before overwriting an existing record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementProposal {
    pub title: String,
    pub telegram_link: String,
    pub existing_last_updated: DateTime<Utc>,
    pub existing_subscribers: String,
    pub existing_average_posts: String,
    pub incoming_subscribers: String,
    pub incoming_average_posts: String,
}

impl ReplacementProposal {
    pub fn new(existing: &ChannelRecord, incoming: &ChannelSnapshot) -> Self {
        Self {
            title: incoming.title.clone(),
            telegram_link: incoming.telegram_link.clone(),
            existing_last_updated: existing.last_updated,
            existing_subscribers: existing.subscribers.clone(),
            existing_average_posts: existing.average_posts_per_7_days.clone(),
            incoming_subscribers: incoming.subscribers.clone(),
            incoming_average_posts: incoming.average_posts_per_7_days.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Inserted,
    Updated,
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared(usize),
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written(std::path::PathBuf),
    NothingToExport,
}
