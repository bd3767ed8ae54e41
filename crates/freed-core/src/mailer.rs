use async_trait::async_trait;
use freed_types::events::{ChangeKind, Notification};
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::error::NotifyError;
use crate::notifier::Notifier;

#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

/// Builds the action links that go into emails.
#[derive(Debug, Clone)]
pub struct Links {
    base_url: String,
}

impl Links {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn verify(&self, feed_id: &str, sig: &str) -> String {
        format!("{}/feed/{}/verify?sig={}", self.base_url, feed_id, sig)
    }

    pub fn delete(&self, feed_id: &str, sig: &str) -> String {
        format!("{}/feed/{}/delete?sig={}", self.base_url, feed_id, sig)
    }
}

/// Plain-text subject and body for a notification.
pub fn render(links: &Links, notification: &Notification) -> (String, String) {
    match notification {
        Notification::VerifyEmail { feed_id, feed_url, feed_sig } => (
            format!("Confirm notifications for {feed_url}"),
            format!(
                "You asked to be told when {feed_url} changes.\n\n\
                 Confirm this address:\n{}\n\n\
                 Stop watching this page:\n{}\n",
                links.verify(feed_id, feed_sig),
                links.delete(feed_id, feed_sig),
            ),
        ),
        Notification::VerifyDelete { feed_id, feed_url, feed_sig } => (
            format!("Confirm removal of {feed_url}"),
            format!(
                "Someone asked to stop watching {feed_url} for this address.\n\n\
                 If that was you, confirm here:\n{}\n\n\
                 Otherwise ignore this email and nothing will change.\n",
                links.delete(feed_id, feed_sig),
            ),
        ),
        Notification::FeedUpdated { feed_url, changes, feed_id, feed_sig } => {
            let mut diff = String::new();
            for change in changes {
                let marker = match change.kind {
                    ChangeKind::Added => '+',
                    ChangeKind::Removed => '-',
                    ChangeKind::Unchanged => ' ',
                };
                diff.push(marker);
                diff.push(' ');
                diff.push_str(&change.line);
                diff.push('\n');
            }
            (
                format!("{feed_url} has changed"),
                format!(
                    "{feed_url} changed since the last check:\n\n{diff}\n\
                     Stop watching this page:\n{}\n",
                    links.delete(feed_id, feed_sig),
                ),
            )
        }
    }
}

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    links: Links,
}

impl SmtpNotifier {
    pub fn new(settings: &SmtpSettings, links: Links) -> Result<Self, NotifyError> {
        let from: Mailbox = settings
            .from
            .parse()
            .map_err(|_| NotifyError::Address(settings.from.clone()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| NotifyError::Transport(e.to_string()))?
            .port(settings.port);
        if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        info!("SMTP relay {}:{} (from {})", settings.host, settings.port, settings.from);
        Ok(Self {
            transport: builder.build(),
            from,
            links,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &str, notification: &Notification) -> Result<(), NotifyError> {
        let to: Mailbox = to.parse().map_err(|_| NotifyError::Address(to.to_string()))?;
        let (subject, body) = render(&self.links, notification);

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| NotifyError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freed_types::events::Change;

    #[test]
    fn links_strip_trailing_slash() {
        let links = Links::new("https://freed.example.com/");
        assert_eq!(
            links.verify("0a1b2c3d", "abcdef01"),
            "https://freed.example.com/feed/0a1b2c3d/verify?sig=abcdef01"
        );
        assert_eq!(
            links.delete("0a1b2c3d", "abcdef01"),
            "https://freed.example.com/feed/0a1b2c3d/delete?sig=abcdef01"
        );
    }

    #[test]
    fn verify_email_carries_both_links() {
        let links = Links::new("http://localhost:4567");
        let (subject, body) = render(
            &links,
            &Notification::VerifyEmail {
                feed_id: "0a1b2c3d".into(),
                feed_url: "https://example.com/a".into(),
                feed_sig: "abcdef01".into(),
            },
        );
        assert!(subject.contains("https://example.com/a"));
        assert!(body.contains("/feed/0a1b2c3d/verify?sig=abcdef01"));
        assert!(body.contains("/feed/0a1b2c3d/delete?sig=abcdef01"));
    }

    #[test]
    fn update_email_lists_changes() {
        let links = Links::new("http://localhost:4567");
        let (_, body) = render(
            &links,
            &Notification::FeedUpdated {
                feed_url: "https://example.com/a".into(),
                changes: vec![Change::removed("v1"), Change::added("v2")],
                feed_id: "0a1b2c3d".into(),
                feed_sig: "abcdef01".into(),
            },
        );
        assert!(body.contains("- v1\n+ v2\n"));
    }
}
