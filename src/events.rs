//! Lifecycle notifications published by the player.

extern crate alloc;

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::error::{CheckpointError, StoryError};

/// Notification emitted during play.
#[derive(Clone, Debug, PartialEq)]
pub enum StoryEvent {
    /// Session is starting; emitted once before the first passage is shown.
    StartStory,
    /// A passage is about to be shown.
    ShowPassage { passage_id: u32 },
    /// A passage has been shown.
    ShowPassageAfter { passage_id: u32 },
    /// A passage already on screen was navigated to again (branch mode).
    RevisitPassage { passage_id: u32 },
    RevisitPassageAfter { passage_id: u32 },
    /// The platform refused a native history checkpoint.
    CheckpointFailed { error: CheckpointError },
    Save,
    Restore,
    RestoreAfter,
    /// A restore was attempted and abandoned; live state is unchanged.
    RestoreFailed { error: StoryError },
}

impl StoryEvent {
    /// Wire name of the notification.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartStory => "startstory",
            Self::ShowPassage { .. } => "showpassage",
            Self::ShowPassageAfter { .. } => "showpassage:after",
            Self::RevisitPassage { .. } => "revisitpassage",
            Self::RevisitPassageAfter { .. } => "revisitpassage:after",
            Self::CheckpointFailed { .. } => "checkpointfailed",
            Self::Save => "save",
            Self::Restore => "restore",
            Self::RestoreAfter => "restore:after",
            Self::RestoreFailed { .. } => "restorefailed",
        }
    }

    /// Passage carried by the notification, if any.
    pub fn passage_id(&self) -> Option<u32> {
        match self {
            Self::ShowPassage { passage_id }
            | Self::ShowPassageAfter { passage_id }
            | Self::RevisitPassage { passage_id }
            | Self::RevisitPassageAfter { passage_id } => Some(*passage_id),
            _ => None,
        }
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(usize);

type Listener = Box<dyn FnMut(&StoryEvent) + 'static>;

/// Publish-only fan-out to any number of listeners.
#[derive(Default)]
pub struct EventBus {
    next_id: usize,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&StoryEvent) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: StoryEvent) {
        log::trace!("event {}", event.name());
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
