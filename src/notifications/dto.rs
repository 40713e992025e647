use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::notifications::repo::Notification;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPublic {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&Notification> for NotificationPublic {
    fn from(notification: &Notification) -> Self {
        Self {
            id: notification.id,
            kind: notification.kind.clone(),
            text: notification.text.clone(),
            created_at: notification.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewNotificationRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}
