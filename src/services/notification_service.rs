use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::repository::{NotificationRepository, UserRepository};
use crate::models::notification::{NotificationFeed, NotificationResponse};
use crate::models::user::ActorSummary;
use crate::models::{Notification, NotificationVerb, Pagination, TargetType};
use crate::{AppError, Result};

pub struct NotificationService {
    notification_repo: Arc<dyn NotificationRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl NotificationService {
    pub fn new(notification_repo: Arc<dyn NotificationRepository>, user_repo: Arc<dyn UserRepository>) -> Self {
        Self { notification_repo, user_repo }
    }

    /// Records an event for `recipient_id`. Users are never notified of their own actions.
    pub async fn notify(
        &self,
        recipient_id: Uuid,
        actor_id: Uuid,
        verb: NotificationVerb,
        target_type: TargetType,
        target_id: Uuid,
    ) -> Result<Option<Notification>> {
        if recipient_id == actor_id {
            return Ok(None);
        }
        let notification = Notification::new(recipient_id, actor_id, verb, target_type, target_id);
        let created = self.notification_repo.create_notification(&notification).await?;
        tracing::info!("🔔 NOTIFY: {} -> {} ({} on {} {})", actor_id, recipient_id, verb, target_type, target_id);
        Ok(Some(created))
    }

    /// One page of the recipient's notifications plus the total row count.
    pub async fn list(&self, recipient_id: Uuid, pagination: Pagination) -> Result<(NotificationFeed, u64)> {
        let (notifications, total) = self
            .notification_repo
            .list_for_recipient(recipient_id, pagination.limit(), pagination.offset())
            .await?;
        pagination.check_in_range(total)?;
        let unread_count = self.notification_repo.count_unread(recipient_id).await?;

        let mut actor_ids: Vec<Uuid> = notifications.iter().map(|n| n.actor_id).collect();
        actor_ids.sort();
        actor_ids.dedup();
        let actors: HashMap<Uuid, ActorSummary> = self
            .user_repo
            .get_users_by_ids(&actor_ids)
            .await?
            .iter()
            .map(|u| (u.id, ActorSummary::from(u)))
            .collect();

        let notifications = notifications
            .into_iter()
            .filter_map(|n| {
                let actor = actors.get(&n.actor_id)?.clone();
                Some(NotificationResponse {
                    id: n.id,
                    actor,
                    verb: n.verb,
                    target_type: n.target_type,
                    target_id: n.target_id,
                    timestamp: n.timestamp,
                    read: n.read,
                })
            })
            .collect();

        Ok((NotificationFeed { unread_count, notifications }, total))
    }

    pub async fn mark_read(&self, notification_id: Uuid, recipient_id: Uuid) -> Result<()> {
        if !self.notification_repo.mark_read(notification_id, recipient_id).await? {
            return Err(AppError::NotFound("Notification not found".to_string()));
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, recipient_id: Uuid) -> Result<u64> {
        let updated = self.notification_repo.mark_all_read(recipient_id).await?;
        tracing::info!("🔔 NOTIFY: {} notifications marked read for {}", updated, recipient_id);
        Ok(updated)
    }
}
