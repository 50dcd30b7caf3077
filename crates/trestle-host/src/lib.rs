//! Host side of the trestle bridge.
//!
//! Turns a rendering engine's one-way message channel into full
//! request/response traffic with embedded web content:
//! - Interface registry mapping channel names to handlers
//! - Message router dispatching calls off the UI path
//! - Serialized script injection back into the content environment
//! - Lifecycle observation with bootstrap injection and observer chaining
//! - Typed bootstrap-script construction

pub mod bootstrap;
pub mod component;
pub mod engine;
pub mod lifecycle;
pub mod registry;
pub mod router;

mod injector;

pub use bootstrap::{BootstrapScript, BOOTSTRAP_TEMPLATE};
pub use component::BridgeComponent;
pub use engine::{
    ChannelSubscriber, ConsoleSink, ExternalOpener, NoopOpener, ScriptEvaluator, TracingConsole,
};
pub use lifecycle::{
    AuthChallenge, BridgeObserver, ChallengeDisposition, Navigation, NavigationAction,
    NavigationObserver, NavigationPolicy, NavigationResponse,
};
pub use registry::{ChannelHandler, InterfaceRegistry};
pub use router::MessageRouter;
