//! Candidate notifications: sent after every committed `advance` / `reject`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::collaborators::CollaboratorError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Advanced,
    Hired,
    Rejected,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub status_kind: NotificationKind,
    /// Stage name for advances, rejection reason for rejections.
    pub extra_info: Option<String>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), CollaboratorError>;
}

/// Posts notifications as JSON to the email/notification service.
pub struct HttpNotifier {
    client: Client,
    endpoint: String,
}

impl HttpNotifier {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, CollaboratorError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint,
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), CollaboratorError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(notification)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        debug!(
            candidate_id = %notification.candidate_id,
            kind = ?notification.status_kind,
            "Notification delivered"
        );
        Ok(())
    }
}

/// Fallback used when no notification endpoint is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), CollaboratorError> {
        info!(
            candidate_id = %notification.candidate_id,
            job_id = %notification.job_id,
            kind = ?notification.status_kind,
            extra_info = notification.extra_info.as_deref().unwrap_or(""),
            "Notification (no endpoint configured)"
        );
        Ok(())
    }
}
