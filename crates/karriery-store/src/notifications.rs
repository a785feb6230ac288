//! Per-user notification feed (newest first, bounded).

use chrono::Utc;

use karriery_shared::constants::MAX_NOTIFICATIONS;
use karriery_shared::generate_id;

use crate::models::{Notification, NotificationDraft};
use crate::store::RecordStore;

impl RecordStore {
    /// Prepend a notification, dropping the oldest entries past the cap.
    pub fn add_notification(
        &mut self,
        user_id: &str,
        draft: NotificationDraft,
    ) -> Option<Notification> {
        self.modify_users("add_notification", |users| {
            let user = users.iter_mut().find(|u| u.id == user_id)?;
            let notification = Notification {
                id: generate_id("notif"),
                kind: draft.kind,
                title: draft.title,
                message: draft.message,
                read: false,
                created_at: Utc::now(),
                data: draft
                    .data
                    .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
            };
            user.notifications.insert(0, notification.clone());
            user.notifications.truncate(MAX_NOTIFICATIONS);
            Some(notification)
        })
    }

    pub fn get_notifications(&self, user_id: &str) -> Vec<Notification> {
        self.get_user(user_id)
            .map(|u| u.notifications)
            .unwrap_or_default()
    }

    pub fn mark_notification_as_read(&mut self, user_id: &str, notification_id: &str) -> bool {
        self.modify_users("mark_notification_as_read", |users| {
            let notification = users
                .iter_mut()
                .find(|u| u.id == user_id)?
                .notifications
                .iter_mut()
                .find(|n| n.id == notification_id)?;
            notification.read = true;
            Some(())
        })
        .is_some()
    }
}
