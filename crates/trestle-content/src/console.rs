//! Console facade over the reserved log channels.

use serde_json::Value;
use tracing::debug;

use trestle_common::{display_value, ConsoleLevel};

use crate::runtime::ContentRuntime;

/// Mirrors content console output to the host.
///
/// Every entry is echoed locally through `tracing` and forwarded on the
/// matching reserved channel as a detached call, so console use never
/// blocks and never fails the caller.
#[derive(Clone)]
pub struct ContentConsole {
    runtime: ContentRuntime,
}

impl ContentConsole {
    pub(crate) fn new(runtime: ContentRuntime) -> Self {
        Self { runtime }
    }

    pub fn log(&self, entries: &[Value]) {
        self.emit(ConsoleLevel::Log, entries);
    }

    pub fn debug(&self, entries: &[Value]) {
        self.emit(ConsoleLevel::Debug, entries);
    }

    pub fn error(&self, entries: &[Value]) {
        self.emit(ConsoleLevel::Error, entries);
    }

    pub fn info(&self, entries: &[Value]) {
        self.emit(ConsoleLevel::Info, entries);
    }

    fn emit(&self, level: ConsoleLevel, entries: &[Value]) {
        let line = entries
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(" ");
        match level {
            ConsoleLevel::Log | ConsoleLevel::Info => tracing::info!(console = "content", "{line}"),
            ConsoleLevel::Debug => tracing::debug!(console = "content", "{line}"),
            ConsoleLevel::Error => tracing::error!(console = "content", "{line}"),
        }

        let runtime = self.runtime.clone();
        let args = entries.to_vec();
        tokio::spawn(async move {
            if let Err(err) = runtime.call(level.channel(), args).await {
                debug!(%err, "console forward failed");
            }
        });
    }
}
