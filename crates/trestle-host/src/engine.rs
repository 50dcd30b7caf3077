//! Seams between the bridge and the embedding engine.
//!
//! The bridge never talks to a rendering engine directly. An embedding
//! implements these traits for whatever engine it hosts and hands them
//! to [`BridgeComponent::attach`](crate::component::BridgeComponent::attach);
//! everything above this module is engine-agnostic.

use trestle_common::{ConsoleLevel, EvalError};

/// Evaluates a script inside the embedded content environment.
///
/// Implementations must be callable from any thread. Engines that
/// require evaluation on a dedicated thread should enqueue internally;
/// the bridge already serializes its own injections through one queue.
pub trait ScriptEvaluator: Send + Sync {
    fn eval(&self, script: &str) -> Result<(), EvalError>;
}

/// Receives the channel names the bridge wants delivered to it.
///
/// Called once per channel during attachment. After attachment, the
/// engine forwards every message posted on a subscribed channel to
/// [`BridgeComponent::handle_message`](crate::component::BridgeComponent::handle_message).
pub trait ChannelSubscriber {
    fn subscribe(&mut self, name: &str);
}

/// Hands URLs the bridge refuses to navigate to over to the platform.
///
/// The default navigation policy cancels non-network schemes (`mailto:`,
/// `tel:`, app links) and routes them here instead.
pub trait ExternalOpener: Send + Sync {
    fn open(&self, url: &str);
}

/// Opener that records nothing and goes nowhere.
#[derive(Debug, Default)]
pub struct NoopOpener;

impl ExternalOpener for NoopOpener {
    fn open(&self, url: &str) {
        tracing::debug!(%url, "external open discarded");
    }
}

/// Destination for console output forwarded from content.
pub trait ConsoleSink: Send + Sync {
    fn write(&self, level: ConsoleLevel, line: &str);
}

/// Default sink: re-emits content console lines through `tracing`.
#[derive(Debug, Default)]
pub struct TracingConsole;

impl ConsoleSink for TracingConsole {
    fn write(&self, level: ConsoleLevel, line: &str) {
        match level {
            ConsoleLevel::Log => tracing::info!(source = "content", "{line}"),
            ConsoleLevel::Debug => tracing::debug!(source = "content", "{line}"),
            ConsoleLevel::Error => tracing::error!(source = "content", "{line}"),
            ConsoleLevel::Info => tracing::info!(source = "content", "{line}"),
        }
    }
}
