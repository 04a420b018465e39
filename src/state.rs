use std::sync::Arc;

use crate::chat::ChatService;
use crate::chat::realtime::RealtimeTokens;
use crate::config::RealtimeConfig;
use crate::events::EventBus;
use crate::notifications::NotificationService;
use crate::scheduling::video::VideoProvider;
use crate::scheduling::{Roster, Scheduler, WebhookProcessor};
use crate::store::{ChatStore, MeetingStore, NotificationStore, RosterStore, UserDirectory};

/// Services shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Scheduler,
    pub roster: Roster,
    pub webhooks: WebhookProcessor,
    pub chat: ChatService,
    pub realtime: RealtimeTokens,
    pub notifications: NotificationService,
}

impl AppState {
    /// Wire every service onto one store implementing all persistence traits.
    pub fn new<S>(
        store: Arc<S>,
        video: Arc<dyn VideoProvider>,
        events: EventBus,
        webhook_secret: Option<String>,
        realtime: Option<RealtimeConfig>,
    ) -> Self
    where
        S: MeetingStore + RosterStore + ChatStore + UserDirectory + NotificationStore + 'static,
    {
        let meetings: Arc<dyn MeetingStore> = store.clone();
        let participants: Arc<dyn RosterStore> = store.clone();
        let users: Arc<dyn UserDirectory> = store.clone();
        let chat: Arc<dyn ChatStore> = store.clone();
        let notifications: Arc<dyn NotificationStore> = store;

        let roster = Roster::new(meetings.clone(), participants.clone(), users.clone(), events.clone());
        AppState {
            scheduler: Scheduler::new(meetings.clone(), participants, video, events.clone()),
            webhooks: WebhookProcessor::new(meetings, roster.clone(), webhook_secret),
            roster,
            chat: ChatService::new(chat, users, events),
            realtime: RealtimeTokens::new(realtime),
            notifications: NotificationService::new(notifications),
        }
    }
}
