//! Channel-to-handler registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::warn;

use trestle_common::{ChannelName, RegistryError};

/// Host-side behavior behind one channel name.
///
/// Handlers run on the blocking pool and may be invoked concurrently.
/// The returned string, when present, is coerced to JSON before it is
/// resolved back to the caller; a returned error rejects the call with
/// the given reason.
pub trait ChannelHandler: Send + Sync {
    fn invoke(&self, args: &[Value]) -> Result<Option<String>, String>;
}

impl<F> ChannelHandler for F
where
    F: Fn(&[Value]) -> Result<Option<String>, String> + Send + Sync,
{
    fn invoke(&self, args: &[Value]) -> Result<Option<String>, String> {
        self(args)
    }
}

/// Maps channel names to handlers.
///
/// The registry seals when the bridge attaches to a content view:
/// content-side subscriptions are fixed at that point, so `add` is
/// rejected afterwards. `set` stays legal because it only swaps the
/// behavior behind a name the content side already knows.
pub struct InterfaceRegistry {
    handlers: RwLock<HashMap<ChannelName, Arc<dyn ChannelHandler>>>,
    sealed: AtomicBool,
}

impl InterfaceRegistry {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            sealed: AtomicBool::new(false),
        }
    }

    /// Register a handler under a new name.
    pub fn add(
        &self,
        name: &str,
        handler: Arc<dyn ChannelHandler>,
    ) -> Result<(), RegistryError> {
        if self.is_sealed() {
            let err = RegistryError::Attached(name.to_string());
            warn!(channel = name, %err, "channel registration rejected");
            return Err(err);
        }
        let name = match ChannelName::new(name) {
            Ok(name) => name,
            Err(err) => {
                warn!(%err, "channel registration rejected");
                return Err(err);
            }
        };
        let mut handlers = self.handlers.write().unwrap();
        if handlers.contains_key(name.as_str()) {
            let err = RegistryError::Duplicate(name.into_string());
            warn!(%err, "channel registration rejected");
            return Err(err);
        }
        handlers.insert(name, handler);
        Ok(())
    }

    /// Replace the handler behind an existing name. Calls already
    /// dispatched keep the handler they were dispatched with.
    pub fn set(
        &self,
        name: &str,
        handler: Arc<dyn ChannelHandler>,
    ) -> Result<(), RegistryError> {
        let mut handlers = self.handlers.write().unwrap();
        match handlers.get_mut(name) {
            Some(slot) => {
                *slot = handler;
                Ok(())
            }
            None => {
                let err = RegistryError::Unknown(name.to_string());
                warn!(%err, "channel replacement rejected");
                Err(err)
            }
        }
    }

    /// Handler currently bound to `name`, if any.
    pub fn handler(&self, name: &str) -> Option<Arc<dyn ChannelHandler>> {
        self.handlers.read().unwrap().get(name).cloned()
    }

    /// All registered names, sorted for deterministic bootstrap output.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .read()
            .unwrap()
            .keys()
            .map(|name| name.as_str().to_string())
            .collect();
        names.sort();
        names
    }

    /// Freeze the `add` surface. Called once at attachment.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::SeqCst);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.handlers.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InterfaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Arc<dyn ChannelHandler> {
        Arc::new(|_: &[Value]| Ok(None))
    }

    #[test]
    fn add_then_lookup() {
        let registry = InterfaceRegistry::new();
        registry.add("echo", noop()).unwrap();
        assert!(registry.handler("echo").is_some());
        assert!(registry.handler("missing").is_none());
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let registry = InterfaceRegistry::new();
        registry.add("echo", noop()).unwrap();
        assert!(matches!(
            registry.add("echo", noop()),
            Err(RegistryError::Duplicate(_))
        ));
    }

    #[test]
    fn reserved_names_are_rejected() {
        let registry = InterfaceRegistry::new();
        assert!(matches!(
            registry.add("trestlelog", noop()),
            Err(RegistryError::ReservedName(_))
        ));
        assert!(matches!(
            registry.add("mytrestle", noop()),
            Err(RegistryError::ReservedName(_))
        ));
    }

    #[test]
    fn add_after_seal_is_rejected() {
        let registry = InterfaceRegistry::new();
        registry.seal();
        assert!(matches!(
            registry.add("late", noop()),
            Err(RegistryError::Attached(_))
        ));
    }

    #[test]
    fn set_requires_existing_name() {
        let registry = InterfaceRegistry::new();
        assert!(matches!(
            registry.set("ghost", noop()),
            Err(RegistryError::Unknown(_))
        ));
    }

    #[test]
    fn set_replaces_and_survives_seal() {
        let registry = InterfaceRegistry::new();
        registry
            .add("echo", Arc::new(|_: &[Value]| Ok(Some("old".into()))))
            .unwrap();
        registry.seal();
        registry
            .set("echo", Arc::new(|_: &[Value]| Ok(Some("new".into()))))
            .unwrap();
        let handler = registry.handler("echo").unwrap();
        assert_eq!(handler.invoke(&[]), Ok(Some("new".into())));
    }

    #[test]
    fn names_are_sorted() {
        let registry = InterfaceRegistry::new();
        registry.add("zeta", noop()).unwrap();
        registry.add("alpha", noop()).unwrap();
        registry.add("mid", noop()).unwrap();
        assert_eq!(registry.names(), vec!["alpha", "mid", "zeta"]);
    }
}
