//! Pending-call bookkeeping.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use trestle_common::call_id_candidate;

/// Terminal state of a pending call.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    Resolved(Value),
    TimedOut,
    Failed(String),
}

struct PendingSlot {
    channel: String,
    settle: oneshot::Sender<Settlement>,
    timer: Option<AbortHandle>,
}

/// Live resolver slots keyed by call id.
///
/// Settling removes the slot first, so whichever of a timeout and a
/// resolution arrives second finds nothing and the call settles exactly
/// once.
pub struct CorrelationTable {
    slots: Mutex<HashMap<String, PendingSlot>>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Reserve a collision-free id for a call on `channel` and park the
    /// settlement sender under it.
    pub fn allocate(&self, channel: &str, settle: oneshot::Sender<Settlement>) -> String {
        let mut slots = self.slots.lock().unwrap();
        let id = loop {
            let candidate = call_id_candidate();
            if !slots.contains_key(&candidate) {
                break candidate;
            }
        };
        slots.insert(
            id.clone(),
            PendingSlot {
                channel: channel.to_string(),
                settle,
                timer: None,
            },
        );
        id
    }

    /// Attach a timeout timer to a pending slot. If the slot already
    /// settled, the timer is aborted on the spot.
    pub fn arm(&self, id: &str, timer: AbortHandle) {
        let mut slots = self.slots.lock().unwrap();
        match slots.get_mut(id) {
            Some(slot) => slot.timer = Some(timer),
            None => timer.abort(),
        }
    }

    /// Remove a slot, aborting its timer. Returns the channel the call
    /// went out on and the settlement sender, or `None` if the slot
    /// already settled.
    pub fn take(&self, id: &str) -> Option<(String, oneshot::Sender<Settlement>)> {
        let slot = self.slots.lock().unwrap().remove(id)?;
        if let Some(timer) = slot.timer {
            timer.abort();
        }
        Some((slot.channel, slot.settle))
    }

    pub fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CorrelationTable {
    fn default() -> Self {
        Self::new()
    }
}
