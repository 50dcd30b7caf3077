//! Content side of the trestle bridge.
//!
//! The bootstrap script gives script-engine content its bridge surface;
//! this crate gives the same surface to Rust-driven content: a
//! correlation table of pending calls, a runtime that posts envelopes
//! and applies resolutions, the `$trestle`-shaped namespace, and console
//! forwarding over the reserved channels.

pub mod console;
pub mod correlation;
pub mod namespace;
pub mod runtime;

pub use console::ContentConsole;
pub use correlation::{CorrelationTable, Settlement};
pub use namespace::{BridgeNamespace, ContentEnvironment, ExposedFunction};
pub use runtime::{ContentRuntime, MessagePoster};
