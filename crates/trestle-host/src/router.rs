//! Inbound message dispatch.

use std::sync::Arc;

use tracing::{debug, error, warn};

use trestle_common::{
    coerce_result, display_value, ConsoleLevel, InboundMessage, ResolutionCall,
};

use crate::engine::ConsoleSink;
use crate::injector::ScriptInjector;
use crate::registry::InterfaceRegistry;

/// Routes messages arriving from the content side.
///
/// Console channels are forwarded to the sink and acknowledged inline.
/// Registered channels dispatch their handler onto the blocking pool and
/// resolve the originating call when it finishes, so a slow handler
/// never delays routing of the next message.
pub struct MessageRouter {
    registry: Arc<InterfaceRegistry>,
    injector: ScriptInjector,
    console: Arc<dyn ConsoleSink>,
}

impl MessageRouter {
    pub(crate) fn new(
        registry: Arc<InterfaceRegistry>,
        injector: ScriptInjector,
        console: Arc<dyn ConsoleSink>,
    ) -> Self {
        Self {
            registry,
            injector,
            console,
        }
    }

    /// Dispatch one inbound message. Unknown channel names are ignored.
    pub fn route(&self, message: InboundMessage) {
        if let Some(level) = ConsoleLevel::from_channel(&message.name) {
            self.forward_console(level, &message);
            return;
        }
        let Some(handler) = self.registry.handler(&message.name) else {
            debug!(channel = %message.name, "message on unknown channel ignored");
            return;
        };
        let envelope = match message.envelope() {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(channel = %message.name, %err, "undecodable call body dropped");
                return;
            }
        };

        let injector = self.injector.clone();
        let channel = message.name;
        tokio::spawn(async move {
            let fun_name = envelope.fun_name;
            let args = envelope.property;
            let joined = tokio::task::spawn_blocking(move || handler.invoke(&args)).await;
            let resolution = match joined {
                Ok(Ok(raw)) => ResolutionCall::success(&fun_name, coerce_result(raw)),
                Ok(Err(reason)) => {
                    warn!(channel = %channel, reason = %reason, "handler reported failure");
                    ResolutionCall::failure(&fun_name, reason)
                }
                Err(err) => {
                    error!(channel = %channel, %err, "handler panicked");
                    ResolutionCall::failure(
                        &fun_name,
                        format!("handler for '{channel}' panicked"),
                    )
                }
            };
            injector.resolve(&resolution);
        });
    }

    /// Console forwarding is fire-and-forget: write the line, then
    /// acknowledge so the content-side promise settles immediately.
    fn forward_console(&self, level: ConsoleLevel, message: &InboundMessage) {
        let envelope = match message.envelope() {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(channel = %message.name, %err, "undecodable console body dropped");
                return;
            }
        };
        let line = envelope
            .property
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(" ");
        self.console.write(level, &line);
        self.injector.resolve(&ResolutionCall::ack(&envelope.fun_name));
    }
}
