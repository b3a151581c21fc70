//! The notification dispatcher boundary.
//!
//! Delivery (email, push, …) is an external collaborator. The engine only knows the send primitive and the policy:
//! notifications are dispatched *after* the core state change has committed, and a delivery failure is logged and
//! swallowed. It must never abort or retry the transaction that produced it.
use std::sync::Arc;

use futures_util::future::BoxFuture;
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::db_types::ProfileId;

#[derive(Debug, Clone, Error)]
#[error("Notification delivery failed: {0}")]
pub struct NotificationError(pub String);

/// What kind of event the notification announces. The delivery side maps these to templates; the engine never
/// renders user-facing copy beyond a short title/body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    OrderCreated,
    PaymentFailed,
    OrderStatusChanged,
    OrderCancelled,
    DisputeOpened,
    DisputeResolved,
    QuoteSubmitted,
    QuoteAccepted,
    QuoteRejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: ProfileId,
    pub notification_type: NotificationType,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub metadata: Option<Value>,
}

impl Notification {
    pub fn new(user_id: ProfileId, notification_type: NotificationType, title: &str, body: String) -> Self {
        Self { user_id, notification_type, title: title.to_string(), body, link: None, metadata: None }
    }

    pub fn with_link(mut self, link: String) -> Self {
        self.link = Some(link);
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// The send primitive. Implementations are handed to the APIs as `Arc<dyn NotificationDispatcher>`, so the method
/// returns a boxed future rather than using an async fn.
pub trait NotificationDispatcher: Send + Sync {
    fn send(&self, notification: Notification) -> BoxFuture<'_, Result<(), NotificationError>>;
}

/// Default dispatcher: writes the notification to the log and calls it delivered. Useful for tests and for
/// deployments where the delivery channel is wired up elsewhere.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl NotificationDispatcher for LogNotifier {
    fn send(&self, notification: Notification) -> BoxFuture<'_, Result<(), NotificationError>> {
        Box::pin(async move {
            info!(
                "📬️ [{:?}] to {}: {}. {}",
                notification.notification_type, notification.user_id, notification.title, notification.body
            );
            Ok(())
        })
    }
}

/// Best-effort dispatch of a batch of notifications. Failures are logged, never propagated; by the time this runs
/// the state change they announce has already committed.
pub async fn dispatch_all(dispatcher: &Arc<dyn NotificationDispatcher>, notifications: Vec<Notification>) {
    for notification in notifications {
        let recipient = notification.user_id.clone();
        if let Err(e) = dispatcher.send(notification).await {
            warn!("📬️ Could not deliver notification to {recipient}. {e}");
        }
    }
}
