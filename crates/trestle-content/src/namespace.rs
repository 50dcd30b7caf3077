//! In-process rendition of the `$trestle` namespace.
//!
//! Hosts that embed a script engine get this surface from the bootstrap
//! script; hosts that drive content from Rust (tests, the demo loopback,
//! native content runtimes) get the same surface here, built from the
//! same [`BootstrapManifest`] the bootstrap was rendered with.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use trestle_common::{
    BootstrapManifest, BridgeEvent, BridgeEventKind, BridgeOptions, CallError, InstallError,
    PlatformFlags,
};

use crate::console::ContentConsole;
use crate::runtime::{ContentRuntime, MessagePoster};

/// A function the page exposes for the host to invoke.
pub trait ExposedFunction: Send + Sync {
    fn call(&self, args: &[Value]);
}

impl<F> ExposedFunction for F
where
    F: Fn(&[Value]) + Send + Sync,
{
    fn call(&self, args: &[Value]) {
        self(args)
    }
}

/// The content-facing bridge surface: versioned, platform-flagged, one
/// async call path per subscribed channel, event subscription, console
/// forwarding, and a registry of functions the host may invoke.
pub struct BridgeNamespace {
    runtime: ContentRuntime,
    console: ContentConsole,
    version: String,
    platform: PlatformFlags,
    device: Value,
    exposed: Mutex<HashMap<String, Arc<dyn ExposedFunction>>>,
}

impl BridgeNamespace {
    pub fn from_manifest(
        manifest: &BootstrapManifest,
        poster: Arc<dyn MessagePoster>,
    ) -> Arc<Self> {
        let runtime = ContentRuntime::new(
            manifest.channels.clone(),
            manifest.options.clone(),
            poster,
        );
        Arc::new(Self {
            console: ContentConsole::new(runtime.clone()),
            runtime,
            version: manifest.version.clone(),
            platform: manifest.platform,
            device: manifest.device.clone(),
            exposed: Mutex::new(HashMap::new()),
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn platform(&self) -> PlatformFlags {
        self.platform
    }

    pub fn device(&self) -> &Value {
        &self.device
    }

    pub fn options(&self) -> &BridgeOptions {
        self.runtime.options()
    }

    pub fn console(&self) -> &ContentConsole {
        &self.console
    }

    pub fn runtime(&self) -> &ContentRuntime {
        &self.runtime
    }

    /// Call a host channel.
    pub async fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, CallError> {
        self.runtime.call(name, args).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.runtime.subscribe_events()
    }

    /// Register a callback for one event kind. Runs on a spawned task
    /// until the namespace is dropped.
    pub fn on(&self, kind: BridgeEventKind, callback: impl Fn(BridgeEvent) + Send + 'static) {
        let mut events = self.runtime.subscribe_events();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if event.kind() == kind {
                            callback(event);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "event listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Expose a function under `$trestle.web.<name>`. Re-exposing a name
    /// replaces it.
    pub fn expose(&self, name: impl Into<String>, function: impl ExposedFunction + 'static) {
        self.exposed
            .lock()
            .unwrap()
            .insert(name.into(), Arc::new(function));
    }

    /// Invoke a page-exposed function. Returns whether the name existed.
    pub fn invoke_exposed(&self, name: &str, args: &[Value]) -> bool {
        let function = self.exposed.lock().unwrap().get(name).cloned();
        match function {
            Some(function) => {
                function.call(args);
                true
            }
            None => {
                debug!(function = name, "unknown content function invoked");
                false
            }
        }
    }
}

/// Install-once holder for the namespace plus ready hooks, standing in
/// for the page global scope.
pub struct ContentEnvironment {
    namespace: OnceLock<Arc<BridgeNamespace>>,
    ready: Mutex<Vec<Box<dyn FnOnce(&Arc<BridgeNamespace>) + Send>>>,
}

impl ContentEnvironment {
    pub fn new() -> Self {
        Self {
            namespace: OnceLock::new(),
            ready: Mutex::new(Vec::new()),
        }
    }

    /// Install the namespace and fire queued ready hooks. A second
    /// install is rejected, mirroring the bootstrap's re-entry guard.
    pub fn install(&self, namespace: Arc<BridgeNamespace>) -> Result<(), InstallError> {
        let for_hooks = namespace.clone();
        if self.namespace.set(namespace).is_err() {
            return Err(InstallError::AlreadyInstalled);
        }
        let hooks = std::mem::take(&mut *self.ready.lock().unwrap());
        for hook in hooks {
            hook(&for_hooks);
        }
        Ok(())
    }

    pub fn namespace(&self) -> Option<&Arc<BridgeNamespace>> {
        self.namespace.get()
    }

    pub fn is_installed(&self) -> bool {
        self.namespace.get().is_some()
    }

    /// Run `hook` once the namespace exists: immediately if installed,
    /// otherwise at install time.
    pub fn on_ready(&self, hook: impl FnOnce(&Arc<BridgeNamespace>) + Send + 'static) {
        let mut pending = self.ready.lock().unwrap();
        if let Some(namespace) = self.namespace.get() {
            drop(pending);
            hook(namespace);
        } else {
            pending.push(Box::new(hook));
        }
    }
}

impl Default for ContentEnvironment {
    fn default() -> Self {
        Self::new()
    }
}
