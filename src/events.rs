use tokio::sync::mpsc;
use uuid::Uuid;

/// Something other users may want to hear about.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    ParticipantsInvited {
        meeting_id: Uuid,
        title: String,
        user_ids: Vec<Uuid>,
    },
    MeetingRemoved {
        meeting_id: Uuid,
        title: String,
        participant_ids: Vec<Uuid>,
    },
    MessageSent {
        conversation_id: Uuid,
        message_id: Uuid,
        sender_id: Uuid,
        sender_name: String,
        recipient_id: Uuid,
        preview: String,
    },
}

pub type EventReceiver = mpsc::UnboundedReceiver<DomainEvent>;

/// Fire-and-forget fan-out to the notifier task.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<DomainEvent>,
}

impl EventBus {
    pub fn channel() -> (EventBus, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventBus { tx }, rx)
    }

    pub fn emit(&self, event: DomainEvent) {
        if let Err(e) = self.tx.send(event) {
            log::warn!("Dropping domain event, notifier is gone: {:?}", e.0);
        }
    }
}
