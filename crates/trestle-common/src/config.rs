//! Bridge configuration shared between the host and content halves.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default time a content-side call waits for the host before timing out.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Tunable bridge behavior. Serialized into the bootstrap script so the
/// content side observes the same settings the host was built with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeOptions {
    /// Per-call deadline in milliseconds. Zero disables the timer and
    /// calls wait indefinitely.
    #[serde(rename = "timeout")]
    pub call_timeout_ms: u64,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            call_timeout_ms: DEFAULT_CALL_TIMEOUT.as_millis() as u64,
        }
    }
}

impl BridgeOptions {
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Deadline as a `Duration`, or `None` when timeouts are disabled.
    pub fn call_timeout(&self) -> Option<Duration> {
        if self.call_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.call_timeout_ms))
        }
    }
}

/// Host platform flags exposed to content as `$trestle.isDesktop` and
/// `$trestle.isMobile`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlatformFlags {
    #[serde(rename = "isDesktop")]
    pub desktop: bool,
    #[serde(rename = "isMobile")]
    pub mobile: bool,
}

impl Default for PlatformFlags {
    fn default() -> Self {
        Self {
            desktop: true,
            mobile: false,
        }
    }
}

/// Everything the bootstrap script needs to build the content-side
/// namespace: the channels it may call, the options in force, platform
/// flags, and a free-form device description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapManifest {
    pub channels: Vec<String>,
    pub options: BridgeOptions,
    pub platform: PlatformFlags,
    pub device: Value,
    pub version: String,
}
