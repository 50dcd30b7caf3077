//! Shared vocabulary for the trestle bridge.
//!
//! Both halves of the bridge link against this crate: the host side
//! (channel registry, message routing, lifecycle observation) and the
//! content side (call correlation, the `$trestle` namespace). It holds
//! the wire types, channel naming rules, event bus, configuration, and
//! the error taxonomy.

pub mod channel;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod events;
pub mod id;

pub use channel::{ChannelName, ConsoleLevel, LOG_CHANNELS, RESERVED_PREFIX};
pub use config::{BootstrapManifest, BridgeOptions, PlatformFlags, DEFAULT_CALL_TIMEOUT};
pub use envelope::{
    coerce_result, display_value, CallEnvelope, InboundMessage, Outcome, ResolutionCall,
};
pub use errors::{
    AttachError, CallError, CodecError, EvalError, InstallError, LifecycleError, PostError,
    RegistryError, TrestleError,
};
pub use events::{BridgeEvent, BridgeEventKind, EventBus};
pub use id::call_id_candidate;

pub type Result<T> = std::result::Result<T, TrestleError>;
