//! Serialized script injection.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error};

use trestle_common::ResolutionCall;

use crate::engine::ScriptEvaluator;

/// Funnels every content-environment mutation through one queue drained
/// by one task, so concurrent handler completions never interleave
/// mid-evaluation.
#[derive(Clone)]
pub struct ScriptInjector {
    tx: mpsc::UnboundedSender<String>,
}

impl ScriptInjector {
    /// Spawn the drain task over `evaluator`. Must be called from within
    /// a tokio runtime.
    pub fn spawn(evaluator: Arc<dyn ScriptEvaluator>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        tokio::spawn(async move {
            while let Some(script) = rx.recv().await {
                // Evaluation failures are reported, never escalated;
                // one bad script must not take down the queue.
                if let Err(err) = evaluator.eval(&script) {
                    error!(%err, "script evaluation failed");
                }
            }
            debug!("script injector closed");
        });
        Self { tx }
    }

    /// Queue a script for evaluation, FIFO relative to other injections.
    pub fn inject(&self, script: impl Into<String>) {
        if self.tx.send(script.into()).is_err() {
            debug!("script dropped: injector task is gone");
        }
    }

    /// Queue a resolver invocation.
    pub fn resolve(&self, call: &ResolutionCall) {
        self.inject(call.to_script());
    }
}
