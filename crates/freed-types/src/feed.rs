use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use url::Url;

/// Polling interval (minutes) applied when none, or a non-positive one, is given.
pub const DEFAULT_FREQUENCY: u32 = 5;

static VALID_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_.+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)+$")
        .expect("email pattern is valid")
});

/// A watched page plus its notification target and last-known snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub id: String,
    pub feed_url: String,
    pub notify_email: String,
    pub email_verified: bool,
    /// Minutes between polls.
    pub frequency: u32,
    /// Unix seconds of the most recent successful poll.
    pub last_checked: i64,
    pub last_content: Option<Vec<u8>>,
    pub last_digest: Option<String>,
}

impl Feed {
    /// Build a fresh, unverified record. The snapshot is filled in by the caller
    /// once the page has been fetched.
    pub fn new(id: String, params: NewFeed, now: i64) -> Self {
        Self {
            id,
            feed_url: params.feed_url,
            notify_email: params.notify_email,
            email_verified: false,
            frequency: params.frequency,
            last_checked: now,
            last_content: None,
            last_digest: None,
        }
    }

    /// Page content as text, for diffing and display.
    pub fn content_text(&self) -> Option<String> {
        self.last_content
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedParamsError {
    #[error("malformed notification email: {0:?}")]
    InvalidEmail(String),
    #[error("feed url must be an absolute http(s) url: {0:?}")]
    InvalidUrl(String),
}

/// The only fields a client may choose when creating a feed.
///
/// Everything else on [`Feed`] (id, verification flag, snapshot) is assigned
/// by the server, so it can never be smuggled in through request parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeed {
    pub feed_url: String,
    pub notify_email: String,
    pub frequency: u32,
}

impl NewFeed {
    pub fn new(
        feed_url: &str,
        notify_email: &str,
        frequency: Option<i64>,
    ) -> Result<Self, FeedParamsError> {
        let feed_url = feed_url.trim();
        let notify_email = notify_email.trim();

        if !is_valid_email(notify_email) {
            return Err(FeedParamsError::InvalidEmail(notify_email.to_string()));
        }
        let Some(feed_url) = parse_http_url(feed_url) else {
            return Err(FeedParamsError::InvalidUrl(feed_url.to_string()));
        };

        Ok(Self {
            feed_url: feed_url.to_string(),
            notify_email: notify_email.to_string(),
            frequency: normalize_frequency(frequency),
        })
    }
}

pub fn is_valid_email(email: &str) -> bool {
    VALID_EMAIL.is_match(email)
}

/// Absolute http(s) url with a host, in normalized form.
fn parse_http_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Some(url),
        _ => None,
    }
}

/// Missing, zero, negative or oversized intervals fall back to the default.
pub fn normalize_frequency(frequency: Option<i64>) -> u32 {
    match frequency {
        Some(minutes) if minutes > 0 => u32::try_from(minutes).unwrap_or(DEFAULT_FREQUENCY),
        _ => DEFAULT_FREQUENCY,
    }
}
