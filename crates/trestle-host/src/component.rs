//! The bridge component an embedding configures and attaches.

use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::{debug, info, warn};

use trestle_common::{
    AttachError, BootstrapManifest, BridgeOptions, EvalError, InboundMessage, LifecycleError,
    PlatformFlags, RegistryError, LOG_CHANNELS,
};

use crate::bootstrap::BootstrapScript;
use crate::engine::{
    ChannelSubscriber, ConsoleSink, ExternalOpener, NoopOpener, ScriptEvaluator, TracingConsole,
};
use crate::injector::ScriptInjector;
use crate::lifecycle::{BridgeObserver, NavigationObserver};
use crate::registry::{ChannelHandler, InterfaceRegistry};
use crate::router::MessageRouter;

struct AttachedState {
    injector: ScriptInjector,
    observer: Arc<BridgeObserver>,
    router: Arc<MessageRouter>,
    manifest: BootstrapManifest,
}

/// One bridge instance: a channel registry, a lifecycle observer seat,
/// and, once attached, the routing and injection machinery for a single
/// content view.
///
/// Configure with the builder methods, register interfaces, then call
/// [`attach`](Self::attach) exactly once when the engine view is being
/// created. Registration of new names closes at attachment; handler
/// replacement via [`set_interface`](Self::set_interface) stays open.
pub struct BridgeComponent {
    registry: Arc<InterfaceRegistry>,
    console: Arc<dyn ConsoleSink>,
    opener: Arc<dyn ExternalOpener>,
    options: BridgeOptions,
    platform: PlatformFlags,
    device: Value,
    chained: Arc<OnceLock<Arc<dyn NavigationObserver>>>,
    attached: OnceLock<AttachedState>,
}

impl BridgeComponent {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(InterfaceRegistry::new()),
            console: Arc::new(TracingConsole),
            opener: Arc::new(NoopOpener),
            options: BridgeOptions::default(),
            platform: PlatformFlags::default(),
            device: Value::Object(Default::default()),
            chained: Arc::new(OnceLock::new()),
            attached: OnceLock::new(),
        }
    }

    pub fn with_options(mut self, options: BridgeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_platform(mut self, platform: PlatformFlags) -> Self {
        self.platform = platform;
        self
    }

    /// Opaque device description surfaced to content as `$trestle.device`.
    pub fn with_device(mut self, device: Value) -> Self {
        self.device = device;
        self
    }

    pub fn with_console(mut self, console: Arc<dyn ConsoleSink>) -> Self {
        self.console = console;
        self
    }

    pub fn with_opener(mut self, opener: Arc<dyn ExternalOpener>) -> Self {
        self.opener = opener;
        self
    }

    /// Register a handler under a new channel name. Rejected once the
    /// component has attached.
    pub fn add_interface(
        &self,
        name: &str,
        handler: impl ChannelHandler + 'static,
    ) -> Result<(), RegistryError> {
        self.registry.add(name, Arc::new(handler))
    }

    /// Replace the handler behind an existing channel name. Allowed
    /// before and after attachment.
    pub fn set_interface(
        &self,
        name: &str,
        handler: impl ChannelHandler + 'static,
    ) -> Result<(), RegistryError> {
        self.registry.set(name, Arc::new(handler))
    }

    /// Chain the single external lifecycle observer. The bridge keeps
    /// the engine's observer seat; the chained observer receives every
    /// callback the bridge sees.
    pub fn chain_observer(
        &self,
        observer: Arc<dyn NavigationObserver>,
    ) -> Result<(), LifecycleError> {
        self.chained
            .set(observer)
            .map_err(|_| LifecycleError::AlreadyChained)
    }

    /// Wire this component to a content view.
    ///
    /// Seals the registry, subscribes every reserved log channel and
    /// every registered channel through `subscriber`, and starts the
    /// injection queue over `evaluator`. Must be called from within a
    /// tokio runtime.
    pub fn attach(
        &self,
        subscriber: &mut dyn ChannelSubscriber,
        evaluator: Arc<dyn ScriptEvaluator>,
    ) -> Result<(), AttachError> {
        if self.attached.get().is_some() {
            return Err(AttachError::AlreadyAttached);
        }

        // Seal before reading names: the subscription set and the
        // bootstrap channel list must agree.
        self.registry.seal();

        let mut channels: Vec<String> =
            LOG_CHANNELS.iter().map(|name| name.to_string()).collect();
        channels.extend(self.registry.names());
        for name in &channels {
            subscriber.subscribe(name);
        }

        let injector = ScriptInjector::spawn(evaluator);
        let manifest = BootstrapManifest {
            channels,
            options: self.options.clone(),
            platform: self.platform,
            device: self.device.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        let bootstrap = BootstrapScript::new(manifest.clone());
        let observer = Arc::new(BridgeObserver::new(
            injector.clone(),
            bootstrap.render(),
            self.chained.clone(),
            self.opener.clone(),
        ));
        let router = Arc::new(MessageRouter::new(
            self.registry.clone(),
            injector.clone(),
            self.console.clone(),
        ));

        let state = AttachedState {
            injector,
            observer,
            router,
            manifest,
        };
        if self.attached.set(state).is_err() {
            return Err(AttachError::AlreadyAttached);
        }
        info!(
            interfaces = self.registry.len(),
            "bridge attached to content view"
        );
        Ok(())
    }

    pub fn is_attached(&self) -> bool {
        self.attached.get().is_some()
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    /// Router for inbound messages. `None` before attachment.
    pub fn router(&self) -> Option<Arc<MessageRouter>> {
        self.attached.get().map(|state| state.router.clone())
    }

    /// Observer to install in the engine's lifecycle seat. `None`
    /// before attachment.
    pub fn observer(&self) -> Option<Arc<BridgeObserver>> {
        self.attached.get().map(|state| state.observer.clone())
    }

    /// The channel set and configuration the bootstrap was rendered
    /// with. `None` before attachment.
    pub fn bootstrap_manifest(&self) -> Option<&BootstrapManifest> {
        self.attached.get().map(|state| &state.manifest)
    }

    /// Feed one content-originated message into the router.
    pub fn handle_message(&self, message: InboundMessage) {
        match self.attached.get() {
            Some(state) => state.router.route(message),
            None => {
                warn!(channel = %message.name, "message dropped: bridge not attached");
            }
        }
    }

    /// Invoke a function the page exposed under `$trestle.web`.
    ///
    /// `function` may be a dotted path of identifiers. Arguments are
    /// serialized to JSON. The invocation is queued behind any pending
    /// injections.
    pub fn call_content(&self, function: &str, args: &[Value]) -> Result<(), EvalError> {
        let Some(state) = self.attached.get() else {
            return Err(EvalError::NotAttached);
        };
        if !is_content_function_path(function) {
            return Err(EvalError::Failed(format!(
                "invalid content function name '{function}'"
            )));
        }
        let rendered: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        let script = format!("$trestle.web.{}({});", function, rendered.join(", "));
        debug!(function, "content function invoked");
        state.injector.inject(script);
        Ok(())
    }
}

impl Default for BridgeComponent {
    fn default() -> Self {
        Self::new()
    }
}

/// Dotted path of JavaScript identifiers, e.g. `refresh` or `ui.badge`.
fn is_content_function_path(path: &str) -> bool {
    !path.is_empty() && path.split('.').all(is_identifier)
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
