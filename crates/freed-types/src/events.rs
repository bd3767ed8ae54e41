use serde::{Deserialize, Serialize};

/// How a single line differs between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub kind: ChangeKind,
    pub line: String,
}

impl Change {
    pub fn added(line: impl Into<String>) -> Self {
        Self { kind: ChangeKind::Added, line: line.into() }
    }

    pub fn removed(line: impl Into<String>) -> Self {
        Self { kind: ChangeKind::Removed, line: line.into() }
    }

    pub fn unchanged(line: impl Into<String>) -> Self {
        Self { kind: ChangeKind::Unchanged, line: line.into() }
    }

    pub fn is_change(&self) -> bool {
        self.kind != ChangeKind::Unchanged
    }
}

/// Emails the core asks the notifier to send. The serialized form is the
/// template name plus the data the template needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Notification {
    /// Sent on creation; carries the verify link signature.
    VerifyEmail {
        feed_id: String,
        feed_url: String,
        feed_sig: String,
    },

    /// Sent when a delete is attempted without a valid token.
    VerifyDelete {
        feed_id: String,
        feed_url: String,
        feed_sig: String,
    },

    /// Sent when a poll observes new content. `changes` never holds
    /// unchanged context lines.
    FeedUpdated {
        feed_url: String,
        changes: Vec<Change>,
        feed_id: String,
        feed_sig: String,
    },
}

impl Notification {
    /// Template / event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::VerifyEmail { .. } => "verify_email",
            Self::VerifyDelete { .. } => "verify_delete",
            Self::FeedUpdated { .. } => "feed_updated",
        }
    }

    pub fn feed_id(&self) -> &str {
        match self {
            Self::VerifyEmail { feed_id, .. }
            | Self::VerifyDelete { feed_id, .. }
            | Self::FeedUpdated { feed_id, .. } => feed_id,
        }
    }
}
