//! Content-side call runtime.
//!
//! In-process counterpart of the bootstrap script's correlation logic:
//! each call allocates a resolver id, parks a settlement slot, starts a
//! deadline timer, and posts the envelope through the embedding's
//! message primitive. Resolutions arriving from the host settle the
//! slot; whichever of resolution and deadline lands first wins.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, warn};

use trestle_common::{
    BridgeEvent, BridgeOptions, CallEnvelope, CallError, ConsoleLevel, EventBus, Outcome,
    PostError, ResolutionCall,
};

use crate::correlation::{CorrelationTable, Settlement};

/// Outbound delivery primitive the embedding supplies.
///
/// Must reject payloads it cannot carry with
/// [`PostError::Unserializable`] so log calls get their stringified
/// retry.
pub trait MessagePoster: Send + Sync {
    fn post(&self, channel: &str, envelope: &CallEnvelope) -> Result<(), PostError>;
}

struct RuntimeInner {
    channels: Vec<String>,
    table: CorrelationTable,
    poster: Arc<dyn MessagePoster>,
    events: EventBus,
    options: BridgeOptions,
}

impl RuntimeInner {
    /// Settle a pending call at most once. Late arrivals find the slot
    /// gone and are dropped here.
    fn settle(&self, id: &str, settlement: Settlement) {
        let Some((channel, sender)) = self.table.take(id) else {
            debug!(id, "late settlement ignored");
            return;
        };
        match &settlement {
            Settlement::TimedOut => {
                warn!(channel = %channel, "call timed out");
                self.events.publish(BridgeEvent::Timeout {
                    function: channel.clone(),
                });
            }
            Settlement::Failed(reason) => {
                warn!(channel = %channel, reason = %reason, "call failed");
                self.events.publish(BridgeEvent::Error {
                    function: channel.clone(),
                    message: reason.clone(),
                });
            }
            Settlement::Resolved(_) => {}
        }
        sender.send(settlement).ok();
    }
}

/// Cheap-to-clone handle on the correlation machinery.
#[derive(Clone)]
pub struct ContentRuntime {
    inner: Arc<RuntimeInner>,
}

impl ContentRuntime {
    /// `channels` is the subscribed set fixed at attachment; calls to
    /// any other name fail without going on the wire.
    pub fn new(
        channels: Vec<String>,
        options: BridgeOptions,
        poster: Arc<dyn MessagePoster>,
    ) -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                channels,
                table: CorrelationTable::new(),
                poster,
                events: EventBus::default(),
                options,
            }),
        }
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.inner.options
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<BridgeEvent> {
        self.inner.events.subscribe()
    }

    /// Pending calls not yet settled. Mostly useful in tests.
    pub fn pending(&self) -> usize {
        self.inner.table.len()
    }

    /// Call a host channel and wait for its settlement.
    pub async fn call(&self, channel: &str, args: Vec<Value>) -> Result<Value, CallError> {
        if !self.inner.channels.iter().any(|name| name == channel) {
            return Err(CallError::UnknownChannel(channel.to_string()));
        }

        let (tx, rx) = oneshot::channel();
        let id = self.inner.table.allocate(channel, tx);

        if let Some(timeout) = self.inner.options.call_timeout() {
            let inner = self.inner.clone();
            let deadline_id = id.clone();
            let timer = tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                inner.settle(&deadline_id, Settlement::TimedOut);
            });
            self.inner.table.arm(&id, timer.abort_handle());
        }

        let envelope = CallEnvelope::new(id.clone(), args);
        if let Err(first) = self.inner.poster.post(channel, &envelope) {
            // Console traffic retries once with every argument coerced
            // to a string; anything else fails the call outright.
            let retried = ConsoleLevel::from_channel(channel).is_some()
                && self
                    .inner
                    .poster
                    .post(channel, &envelope.stringified())
                    .is_ok();
            if !retried {
                self.inner.settle(
                    &id,
                    Settlement::Failed(format!("delivery to '{channel}' failed: {first}")),
                );
            }
        }

        match rx.await {
            Ok(Settlement::Resolved(value)) => Ok(value),
            Ok(Settlement::TimedOut) => Err(CallError::TimedOut {
                channel: channel.to_string(),
            }),
            Ok(Settlement::Failed(reason)) => Err(CallError::Failed {
                channel: channel.to_string(),
                reason,
            }),
            Err(_) => Err(CallError::Failed {
                channel: channel.to_string(),
                reason: "runtime dropped the pending call".to_string(),
            }),
        }
    }

    /// Resolver entry point, mirroring the script-side
    /// `window[id](success, errorOrNull, resultOrNull)` contract.
    pub fn resolve(
        &self,
        fun_name: &str,
        success: bool,
        error: Option<String>,
        result: Option<Value>,
    ) {
        let settlement = if success {
            Settlement::Resolved(result.unwrap_or(Value::Null))
        } else {
            Settlement::Failed(error.unwrap_or_else(|| "call failed".to_string()))
        };
        self.inner.settle(fun_name, settlement);
    }

    /// Apply a host-rendered resolution.
    pub fn apply(&self, call: &ResolutionCall) {
        match &call.outcome {
            Outcome::Success(value) => self.resolve(&call.fun_name, true, None, value.clone()),
            Outcome::Failure(reason) => {
                self.resolve(&call.fun_name, false, Some(reason.clone()), None)
            }
        }
    }
}
