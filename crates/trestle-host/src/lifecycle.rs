//! Navigation lifecycle observation and policy.
//!
//! The bridge owns the engine's observer seat. An embedding that wants
//! lifecycle callbacks chains exactly one [`NavigationObserver`] through
//! the component; the bridge forwards every callback to it and falls
//! back to built-in policy where the chained observer is absent or has
//! no opinion. The bridge can never be displaced from the seat, so the
//! bootstrap script is guaranteed to run on every navigation start.

use std::sync::{Arc, OnceLock};

use tracing::{debug, info, warn};

use crate::engine::ExternalOpener;
use crate::injector::ScriptInjector;

// =============================================================================
// NAVIGATION VOCABULARY
// =============================================================================

/// A navigation the engine is performing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub url: String,
}

impl Navigation {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// A navigation the engine is about to perform and wants a verdict on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationAction {
    pub url: String,
}

impl NavigationAction {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// A response the engine received and wants a verdict on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationResponse {
    pub url: String,
    pub status_code: Option<u16>,
}

impl NavigationResponse {
    pub fn new(url: impl Into<String>, status_code: Option<u16>) -> Self {
        Self {
            url: url.into(),
            status_code,
        }
    }
}

/// A credential challenge raised during navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    pub host: String,
    pub realm: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationPolicy {
    Allow,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeDisposition {
    PerformDefault,
    Cancel,
}

// =============================================================================
// OBSERVER CHAIN
// =============================================================================

/// Lifecycle callbacks an embedding may chain behind the bridge.
///
/// Notification methods default to no-ops. Policy methods return `None`
/// to mean "no opinion", which falls through to the bridge's built-in
/// defaults.
pub trait NavigationObserver: Send + Sync {
    fn on_started(&self, _navigation: &Navigation) {}
    fn on_redirected(&self, _navigation: &Navigation) {}
    fn on_committed(&self, _navigation: &Navigation) {}
    fn on_finished(&self, _navigation: &Navigation) {}
    fn on_failed(&self, _navigation: &Navigation, _reason: &str) {}

    fn decide_action(&self, _action: &NavigationAction) -> Option<NavigationPolicy> {
        None
    }

    fn decide_response(&self, _response: &NavigationResponse) -> Option<NavigationPolicy> {
        None
    }

    fn on_challenge(&self, _challenge: &AuthChallenge) -> Option<ChallengeDisposition> {
        None
    }
}

/// The observer the engine actually talks to.
///
/// Injects the bootstrap script at every navigation start, before any
/// forwarding, then relays the callback to the chained observer if one
/// was captured.
pub struct BridgeObserver {
    injector: ScriptInjector,
    bootstrap: String,
    chained: Arc<OnceLock<Arc<dyn NavigationObserver>>>,
    opener: Arc<dyn ExternalOpener>,
}

impl BridgeObserver {
    pub(crate) fn new(
        injector: ScriptInjector,
        bootstrap: String,
        chained: Arc<OnceLock<Arc<dyn NavigationObserver>>>,
        opener: Arc<dyn ExternalOpener>,
    ) -> Self {
        Self {
            injector,
            bootstrap,
            chained,
            opener,
        }
    }

    fn chained(&self) -> Option<&Arc<dyn NavigationObserver>> {
        self.chained.get()
    }

    /// Navigation start: bootstrap goes in first, forwarding second, so
    /// anything a chained observer injects lands after the namespace
    /// exists.
    pub fn on_started(&self, navigation: &Navigation) {
        debug!(url = %navigation.url, "navigation started");
        self.injector.inject(self.bootstrap.clone());
        if let Some(observer) = self.chained() {
            observer.on_started(navigation);
        }
    }

    pub fn on_redirected(&self, navigation: &Navigation) {
        debug!(url = %navigation.url, "navigation redirected");
        if let Some(observer) = self.chained() {
            observer.on_redirected(navigation);
        }
    }

    pub fn on_committed(&self, navigation: &Navigation) {
        debug!(url = %navigation.url, "navigation committed");
        if let Some(observer) = self.chained() {
            observer.on_committed(navigation);
        }
    }

    pub fn on_finished(&self, navigation: &Navigation) {
        debug!(url = %navigation.url, "navigation finished");
        if let Some(observer) = self.chained() {
            observer.on_finished(navigation);
        }
    }

    pub fn on_failed(&self, navigation: &Navigation, reason: &str) {
        warn!(url = %navigation.url, reason, "navigation failed");
        if let Some(observer) = self.chained() {
            observer.on_failed(navigation, reason);
        }
    }

    /// Verdict for an outgoing navigation. The chained observer gets
    /// first say; otherwise network schemes stay in-view and anything
    /// else is handed to the platform opener and cancelled.
    pub fn decide_action(&self, action: &NavigationAction) -> NavigationPolicy {
        if let Some(policy) = self.chained().and_then(|o| o.decide_action(action)) {
            return policy;
        }
        if is_in_view_scheme(&action.url) {
            NavigationPolicy::Allow
        } else {
            info!(url = %action.url, "non-network scheme handed to platform opener");
            self.opener.open(&action.url);
            NavigationPolicy::Cancel
        }
    }

    /// Verdict for a received response. Defaults to allow, reporting the
    /// status code when the response carries one.
    pub fn decide_response(&self, response: &NavigationResponse) -> NavigationPolicy {
        if let Some(policy) = self.chained().and_then(|o| o.decide_response(response)) {
            return policy;
        }
        if let Some(code) = response.status_code {
            info!(status = code, url = %response.url, "navigation response");
        }
        NavigationPolicy::Allow
    }

    pub fn on_challenge(&self, challenge: &AuthChallenge) -> ChallengeDisposition {
        if let Some(disposition) = self.chained().and_then(|o| o.on_challenge(challenge)) {
            return disposition;
        }
        ChallengeDisposition::PerformDefault
    }
}

/// Schemes that stay inside the content view. Everything else goes to
/// the platform opener.
fn is_in_view_scheme(url: &str) -> bool {
    match url.split_once(':') {
        Some((scheme, _)) => {
            let scheme = scheme.to_ascii_lowercase();
            scheme == "http" || scheme == "https" || scheme == "about"
        }
        // Scheme-relative targets resolve inside the current origin.
        None => true,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::mpsc;
    use trestle_common::EvalError;

    use crate::engine::ScriptEvaluator;

    struct RecordingEvaluator {
        tx: mpsc::UnboundedSender<String>,
    }

    impl ScriptEvaluator for RecordingEvaluator {
        fn eval(&self, script: &str) -> Result<(), EvalError> {
            self.tx.send(script.to_string()).ok();
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingOpener {
        opened: Mutex<Vec<String>>,
    }

    impl ExternalOpener for RecordingOpener {
        fn open(&self, url: &str) {
            self.opened.lock().unwrap().push(url.to_string());
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        seen: Mutex<Vec<String>>,
        cancel_actions: bool,
    }

    impl NavigationObserver for RecordingObserver {
        fn on_started(&self, navigation: &Navigation) {
            self.seen.lock().unwrap().push(format!("started {}", navigation.url));
        }

        fn on_committed(&self, navigation: &Navigation) {
            self.seen
                .lock()
                .unwrap()
                .push(format!("committed {}", navigation.url));
        }

        fn on_finished(&self, navigation: &Navigation) {
            self.seen
                .lock()
                .unwrap()
                .push(format!("finished {}", navigation.url));
        }

        fn decide_action(&self, _action: &NavigationAction) -> Option<NavigationPolicy> {
            self.cancel_actions.then_some(NavigationPolicy::Cancel)
        }
    }

    fn observer_fixture(
        chained: Option<Arc<RecordingObserver>>,
    ) -> (
        BridgeObserver,
        Arc<RecordingOpener>,
        mpsc::UnboundedReceiver<String>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let injector = ScriptInjector::spawn(Arc::new(RecordingEvaluator { tx }));
        let slot = Arc::new(OnceLock::new());
        if let Some(observer) = chained {
            slot.set(observer as Arc<dyn NavigationObserver>).ok();
        }
        let opener = Arc::new(RecordingOpener::default());
        let observer = BridgeObserver::new(
            injector,
            "/* bootstrap */".to_string(),
            slot,
            opener.clone(),
        );
        (observer, opener, rx)
    }

    // -- Forwarding --

    #[tokio::test]
    async fn start_injects_bootstrap_then_forwards() {
        let chained = Arc::new(RecordingObserver::default());
        let (observer, _, mut rx) = observer_fixture(Some(chained.clone()));
        observer.on_started(&Navigation::new("https://app.test/"));
        assert_eq!(rx.recv().await.unwrap(), "/* bootstrap */");
        assert_eq!(
            chained.seen.lock().unwrap().as_slice(),
            ["started https://app.test/"]
        );
    }

    #[tokio::test]
    async fn lifecycle_sequence_reaches_chained_observer_in_order() {
        let chained = Arc::new(RecordingObserver::default());
        let (observer, _, _rx) = observer_fixture(Some(chained.clone()));
        let nav = Navigation::new("https://app.test/");
        observer.on_started(&nav);
        observer.on_committed(&nav);
        observer.on_finished(&nav);
        assert_eq!(
            chained.seen.lock().unwrap().as_slice(),
            [
                "started https://app.test/",
                "committed https://app.test/",
                "finished https://app.test/",
            ]
        );
    }

    // -- Action policy --

    #[tokio::test]
    async fn network_schemes_stay_in_view() {
        let (observer, opener, _rx) = observer_fixture(None);
        for url in ["https://app.test/next", "http://plain.test/", "about:blank"] {
            assert_eq!(
                observer.decide_action(&NavigationAction::new(url)),
                NavigationPolicy::Allow,
                "{url} should stay in view"
            );
        }
        assert!(opener.opened.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_schemes_are_cancelled_and_handed_off() {
        let (observer, opener, _rx) = observer_fixture(None);
        let policy = observer.decide_action(&NavigationAction::new("mailto:dev@app.test"));
        assert_eq!(policy, NavigationPolicy::Cancel);
        assert_eq!(
            opener.opened.lock().unwrap().as_slice(),
            ["mailto:dev@app.test"]
        );
    }

    #[tokio::test]
    async fn chained_opinion_overrides_default_action_policy() {
        let chained = Arc::new(RecordingObserver {
            cancel_actions: true,
            ..Default::default()
        });
        let (observer, opener, _rx) = observer_fixture(Some(chained));
        let policy = observer.decide_action(&NavigationAction::new("https://app.test/"));
        assert_eq!(policy, NavigationPolicy::Cancel);
        // The chained observer answered, so the opener never ran.
        assert!(opener.opened.lock().unwrap().is_empty());
    }

    // -- Response and challenge defaults --

    #[tokio::test]
    async fn responses_default_to_allow() {
        let (observer, _, _rx) = observer_fixture(None);
        let policy =
            observer.decide_response(&NavigationResponse::new("https://app.test/", Some(204)));
        assert_eq!(policy, NavigationPolicy::Allow);
        let policy = observer.decide_response(&NavigationResponse::new("https://app.test/", None));
        assert_eq!(policy, NavigationPolicy::Allow);
    }

    #[tokio::test]
    async fn challenges_default_to_system_handling() {
        let (observer, _, _rx) = observer_fixture(None);
        let disposition = observer.on_challenge(&AuthChallenge {
            host: "app.test".into(),
            realm: None,
        });
        assert_eq!(disposition, ChallengeDisposition::PerformDefault);
    }

    // -- Scheme classification --

    #[test]
    fn scheme_classification() {
        assert!(is_in_view_scheme("https://a.test/"));
        assert!(is_in_view_scheme("HTTP://a.test/"));
        assert!(is_in_view_scheme("about:blank"));
        assert!(is_in_view_scheme("relative/path"));
        assert!(!is_in_view_scheme("mailto:x@y.z"));
        assert!(!is_in_view_scheme("tel:+15551212"));
        assert!(!is_in_view_scheme("app-link://deep"));
    }
}
