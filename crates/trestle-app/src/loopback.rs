//! In-process engine standing in for a rendering engine.
//!
//! Wires both halves of the bridge inside one process: host injections
//! are parsed and applied to the content runtime, content posts are fed
//! straight into the host router. The demo and the end-to-end tests run
//! the real protocol over this wiring.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use trestle_common::{
    CallEnvelope, EvalError, InboundMessage, PostError, ResolutionCall, TrestleError,
};
use trestle_content::{BridgeNamespace, ContentEnvironment, MessagePoster};
use trestle_host::{
    BridgeComponent, BridgeObserver, ChannelSubscriber, MessageRouter, Navigation,
    NavigationAction, NavigationPolicy, ScriptEvaluator,
};

/// Engine-side channel registration: records what the bridge subscribes.
#[derive(Default)]
struct EngineConfig {
    subscribed: Vec<String>,
}

impl ChannelSubscriber for EngineConfig {
    fn subscribe(&mut self, name: &str) {
        self.subscribed.push(name.to_string());
    }
}

/// "Evaluates" injected scripts by interpreting the three shapes the
/// bridge emits: the bootstrap, `$trestle.web` invocations, and resolver
/// calls.
struct LoopbackEvaluator {
    environment: Arc<ContentEnvironment>,
    bootstraps: AtomicUsize,
}

impl LoopbackEvaluator {
    fn namespace(&self) -> Result<&Arc<BridgeNamespace>, EvalError> {
        self.environment
            .namespace()
            .ok_or_else(|| EvalError::Failed("content namespace not installed".to_string()))
    }

    fn invoke_web(&self, invocation: &str) -> Result<(), EvalError> {
        let namespace = self.namespace()?;
        let (name, tail) = invocation
            .split_once('(')
            .ok_or_else(|| EvalError::Failed(format!("unparseable invocation: {invocation}")))?;
        let mut args_text = tail.trim_end();
        args_text = args_text.strip_suffix(';').unwrap_or(args_text).trim_end();
        let args_text = args_text
            .strip_suffix(')')
            .ok_or_else(|| EvalError::Failed(format!("unparseable invocation: {invocation}")))?;
        let args: Vec<Value> = serde_json::from_str(&format!("[{args_text}]"))
            .map_err(|err| EvalError::Failed(err.to_string()))?;
        if !namespace.invoke_exposed(name, &args) {
            debug!(function = name, "content function not exposed");
        }
        Ok(())
    }
}

impl ScriptEvaluator for LoopbackEvaluator {
    fn eval(&self, script: &str) -> Result<(), EvalError> {
        let trimmed = script.trim_start();
        if trimmed.starts_with("(function") {
            // Bootstrap re-injection; the Rust namespace was installed
            // at connect time, so only count it.
            self.bootstraps.fetch_add(1, Ordering::SeqCst);
            return Ok(());
        }
        if let Some(invocation) = trimmed.strip_prefix("$trestle.web.") {
            return self.invoke_web(invocation);
        }
        let call = ResolutionCall::from_script(script)
            .map_err(|err| EvalError::Failed(err.to_string()))?;
        self.namespace()?.runtime().apply(&call);
        Ok(())
    }
}

/// Content-to-host delivery: envelopes go straight into the router.
struct LoopbackPoster {
    router: Arc<MessageRouter>,
}

impl MessagePoster for LoopbackPoster {
    fn post(&self, channel: &str, envelope: &CallEnvelope) -> Result<(), PostError> {
        let body = serde_json::to_value(envelope)
            .map_err(|err| PostError::Unserializable(err.to_string()))?;
        self.router.route(InboundMessage::new(channel, body));
        Ok(())
    }
}

/// A connected bridge: component attached, content namespace installed.
pub struct Loopback {
    environment: Arc<ContentEnvironment>,
    evaluator: Arc<LoopbackEvaluator>,
    observer: Arc<BridgeObserver>,
    subscribed: Vec<String>,
}

impl Loopback {
    /// Attach `component` to the in-process engine and install the
    /// content namespace built from its bootstrap manifest.
    pub fn connect(component: &BridgeComponent) -> Result<Self, TrestleError> {
        let environment = Arc::new(ContentEnvironment::new());
        let evaluator = Arc::new(LoopbackEvaluator {
            environment: environment.clone(),
            bootstraps: AtomicUsize::new(0),
        });

        let mut config = EngineConfig::default();
        component.attach(&mut config, evaluator.clone())?;

        // Attach succeeded, so the attached state is populated.
        let router = component
            .router()
            .expect("router exists immediately after attach");
        let manifest = component
            .bootstrap_manifest()
            .expect("manifest exists immediately after attach")
            .clone();
        let observer = component
            .observer()
            .expect("observer exists immediately after attach");

        let namespace =
            BridgeNamespace::from_manifest(&manifest, Arc::new(LoopbackPoster { router }));
        environment.install(namespace)?;

        Ok(Self {
            environment,
            evaluator,
            observer,
            subscribed: config.subscribed,
        })
    }

    /// Drive one navigation the way an engine would: policy first, then
    /// the start/commit/finish sequence when allowed.
    pub fn navigate(&self, url: &str) -> NavigationPolicy {
        let policy = self.observer.decide_action(&NavigationAction::new(url));
        if policy == NavigationPolicy::Cancel {
            return policy;
        }
        let navigation = Navigation::new(url);
        self.observer.on_started(&navigation);
        self.observer.on_committed(&navigation);
        self.observer.on_finished(&navigation);
        policy
    }

    pub fn namespace(&self) -> Arc<BridgeNamespace> {
        self.environment
            .namespace()
            .expect("namespace installed at connect")
            .clone()
    }

    pub fn environment(&self) -> &Arc<ContentEnvironment> {
        &self.environment
    }

    /// Channel names the bridge subscribed at attachment.
    pub fn subscribed(&self) -> &[String] {
        &self.subscribed
    }

    /// How many bootstrap injections the engine has evaluated.
    pub fn bootstraps(&self) -> usize {
        self.evaluator.bootstraps.load(Ordering::SeqCst)
    }
}
