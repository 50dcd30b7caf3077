//! Bridge event stream.
//!
//! Failed and timed-out calls are announced on a broadcast bus so
//! content-side listeners can observe them without being party to the
//! call. Publishing never blocks and tolerates having no listeners.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Event published when a call ends without a normal resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum BridgeEvent {
    /// A call passed its deadline before the host resolved it.
    Timeout { function: String },
    /// A call failed: the host reported an error or delivery broke down.
    Error { function: String, message: String },
}

impl BridgeEvent {
    pub fn kind(&self) -> BridgeEventKind {
        match self {
            BridgeEvent::Timeout { .. } => BridgeEventKind::Timeout,
            BridgeEvent::Error { .. } => BridgeEventKind::Error,
        }
    }

    /// The channel name the event concerns.
    pub fn function(&self) -> &str {
        match self {
            BridgeEvent::Timeout { function } => function,
            BridgeEvent::Error { function, .. } => function,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeEventKind {
    Timeout,
    Error,
}

/// Broadcast fan-out for [`BridgeEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BridgeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.sender.subscribe()
    }

    /// Publish an event, returning how many listeners received it.
    pub fn publish(&self, event: BridgeEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
