use async_trait::async_trait;
use freed_types::events::Notification;
use tracing::info;

use crate::error::NotifyError;

/// Delivers one of the three feed emails. Rendering and transport are up to
/// the implementation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of sending mail. Used when no
/// SMTP relay is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, notification: &Notification) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(notification)
            .map_err(|e| NotifyError::Build(e.to_string()))?;
        info!("[mail to {}] {}", to, payload);
        Ok(())
    }
}
