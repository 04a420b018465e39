use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::errors::AppError;
use crate::events::{DomainEvent, EventReceiver};
use crate::models::notification::{NewNotification, Notification, NotificationKind};
use crate::store::NotificationStore;

pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Background task turning domain events into notification rows. Ends when
/// every `EventBus` clone has been dropped.
pub fn spawn_notifier(mut rx: EventReceiver, store: Arc<dyn NotificationStore>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            deliver(store.as_ref(), event).await;
        }
        log::info!("Notifier stopped");
    })
}

/// Persist the notifications for one event. Failures are logged, never returned.
pub async fn deliver(store: &dyn NotificationStore, event: DomainEvent) {
    for new in notifications_for(event) {
        if let Err(e) = store.insert_notification(&new).await {
            log::error!("Failed to store {} notification for {}: {}", new.kind.as_str(), new.user_id, e);
        }
    }
}

fn notifications_for(event: DomainEvent) -> Vec<NewNotification> {
    match event {
        DomainEvent::ParticipantsInvited { meeting_id, title, user_ids } => user_ids
            .into_iter()
            .map(|user_id| NewNotification {
                user_id,
                kind: NotificationKind::MeetingInvitation,
                message: format!("You were invited to \"{title}\""),
                content: None,
                entity_type: Some("meeting"),
                entity_id: Some(meeting_id),
            })
            .collect(),
        DomainEvent::MeetingRemoved { meeting_id, title, participant_ids } => participant_ids
            .into_iter()
            .map(|user_id| NewNotification {
                user_id,
                kind: NotificationKind::MeetingCancelled,
                message: format!("\"{title}\" was cancelled"),
                content: None,
                entity_type: Some("meeting"),
                entity_id: Some(meeting_id),
            })
            .collect(),
        DomainEvent::MessageSent {
            conversation_id,
            sender_name,
            recipient_id,
            preview,
            ..
        } => vec![NewNotification {
            user_id: recipient_id,
            kind: NotificationKind::NewMessage,
            message: format!("New message from {sender_name}"),
            content: Some(preview),
            entity_type: Some("conversation"),
            entity_id: Some(conversation_id),
        }],
    }
}

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        NotificationService { store }
    }

    pub async fn list(&self, user_id: Uuid, limit: Option<i64>) -> Result<Vec<Notification>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, 100);
        self.store.list_notifications(user_id, limit).await
    }

    pub async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<Notification, AppError> {
        self.store
            .mark_notification_read(id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Notification {id} not found")))
    }
}
