//! Session notifications
//!
//! Listeners subscribe to an [`EventBus`] and receive every event emitted
//! after they subscribed over a standard channel. Subscribers that have
//! dropped their receiver are pruned on the next emit.

use crate::overlay::OverlayId;
use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The current page changed; `page` is 1-based
    PageChanged { page: u32, total: u32 },
    /// Visible overlays of `page` must be recomputed and redrawn
    Rerender { page: u32 },
    /// The style panel should show the text overlay `id`
    PanelShown(OverlayId),
    PanelHidden,
    /// An export produced `bytes` bytes of output
    Exported { bytes: usize },
    ExportFailed { reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<SessionEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn emit(&mut self, event: SessionEvent) {
        tracing::trace!(?event, "Session event");
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
