use serde::{Deserialize, Serialize};

use crate::feed::Feed;

// -- Feeds --

/// Body of `POST /feed`. Unknown fields are rejected outright.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateFeedRequest {
    pub feed_url: String,
    pub notify_email: String,
    /// Raw form value; a blank input arrives as an empty string.
    #[serde(default)]
    pub frequency: Option<String>,
}

impl CreateFeedRequest {
    /// Minutes requested, if the field held a number at all.
    pub fn frequency(&self) -> Option<i64> {
        self.frequency.as_deref().and_then(|v| v.trim().parse().ok())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateFeedResponse {
    pub id: String,
}

/// `?sig=<token>` on action links. A missing token is treated like a wrong one.
#[derive(Debug, Default, Deserialize)]
pub struct SigQuery {
    pub sig: Option<String>,
}

/// Row on the index page. Neither the snapshot nor the subscriber's address
/// is exposed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSummary {
    pub id: String,
    pub feed_url: String,
    pub email_verified: bool,
    pub frequency: u32,
    pub last_checked: i64,
}

impl From<&Feed> for FeedSummary {
    fn from(feed: &Feed) -> Self {
        Self {
            id: feed.id.clone(),
            feed_url: feed.feed_url.clone(),
            email_verified: feed.email_verified,
            frequency: feed.frequency,
            last_checked: feed.last_checked,
        }
    }
}

/// Result of the delete endpoints. Both are successful outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteStatus {
    Deleted,
    ConfirmationSent,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub status: DeleteStatus,
}
