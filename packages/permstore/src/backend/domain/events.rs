//! Matcher group change notifications
//!
//! Backends publish one [`MatcherGroupEvent`] per create/update/remove on a
//! shared [`EventBus`]. Publishing never blocks and never fails: with no
//! subscribers the event is dropped.

use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;

use super::models::MatcherGroup;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    Create,
    Update,
    Remove,
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventAction::Create => "create",
            EventAction::Update => "update",
            EventAction::Remove => "remove",
        })
    }
}

#[derive(Debug, Clone)]
pub struct MatcherGroupEvent {
    /// Identifier of the backend that fired the event
    pub backend: String,
    pub action: EventAction,
    pub old: Option<Arc<MatcherGroup>>,
    pub new: Option<Arc<MatcherGroup>>,
}

/// Broadcast channel shared by every backend of a provider
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MatcherGroupEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MatcherGroupEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: MatcherGroupEvent) {
        trace!(backend = %event.backend, action = %event.action, "Publishing matcher group event");
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
