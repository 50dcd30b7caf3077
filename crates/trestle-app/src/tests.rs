//! End-to-end exercises over the loopback engine: content-side calls
//! travel through the router to registered handlers, resolutions come
//! back as injected scripts, and host-side calls land in exposed
//! content functions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::broadcast::error::TryRecvError;

use trestle_common::{
    display_value, BridgeEvent, BridgeOptions, CallError, ConsoleLevel, RegistryError,
};
use trestle_host::{
    BridgeComponent, ConsoleSink, ExternalOpener, Navigation, NavigationObserver,
    NavigationPolicy,
};

use crate::loopback::Loopback;

fn echo_component() -> BridgeComponent {
    let component = BridgeComponent::new();
    component
        .add_interface("echo", |args: &[Value]| Ok(args.first().map(display_value)))
        .unwrap();
    component
}

#[tokio::test]
async fn echo_round_trip_resolves_without_events() {
    let component = echo_component();
    let loopback = Loopback::connect(&component).unwrap();
    loopback.navigate("https://app.test/index.html");

    let namespace = loopback.namespace();
    let mut events = namespace.subscribe();
    let value = namespace.call("echo", vec![json!("hi")]).await.unwrap();

    assert_eq!(value, json!("hi"));
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn timed_out_call_rejects_once_and_reports() {
    let component = BridgeComponent::new()
        .with_options(BridgeOptions::default().with_call_timeout(Duration::from_millis(40)));
    component
        .add_interface("slow", |_: &[Value]| {
            std::thread::sleep(Duration::from_millis(250));
            Ok(Some("too late".to_string()))
        })
        .unwrap();
    let loopback = Loopback::connect(&component).unwrap();
    loopback.navigate("https://app.test/");

    let namespace = loopback.namespace();
    let mut events = namespace.subscribe();
    let err = namespace.call("slow", vec![]).await.unwrap_err();

    assert!(matches!(err, CallError::TimedOut { ref channel } if channel == "slow"));
    assert_eq!(
        events.try_recv().unwrap(),
        BridgeEvent::Timeout {
            function: "slow".to_string()
        }
    );

    // The handler finishes anyway; its resolution finds no pending call
    // and must not settle anything a second time.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(namespace.runtime().pending(), 0);
}

#[tokio::test]
async fn slow_call_does_not_block_a_fast_one() {
    let component = echo_component();
    component
        .add_interface("slow", |_: &[Value]| {
            std::thread::sleep(Duration::from_millis(200));
            Ok(Some("done".to_string()))
        })
        .unwrap();
    let loopback = Loopback::connect(&component).unwrap();
    loopback.navigate("https://app.test/");

    let namespace = loopback.namespace();
    let slow = {
        let namespace = namespace.clone();
        tokio::spawn(async move { namespace.call("slow", vec![]).await })
    };
    let fast = tokio::time::timeout(
        Duration::from_millis(150),
        namespace.call("echo", vec![json!("quick")]),
    )
    .await
    .expect("echo must resolve while slow is in flight")
    .unwrap();

    assert_eq!(fast, json!("quick"));
    assert_eq!(slow.await.unwrap().unwrap(), json!("done"));
}

#[tokio::test]
async fn replaced_handler_serves_subsequent_calls() {
    let component = BridgeComponent::new();
    component
        .add_interface("greet", |_: &[Value]| Ok(Some("old".to_string())))
        .unwrap();
    let loopback = Loopback::connect(&component).unwrap();
    loopback.navigate("https://app.test/");

    let namespace = loopback.namespace();
    assert_eq!(namespace.call("greet", vec![]).await.unwrap(), json!("old"));

    component
        .set_interface("greet", |_: &[Value]| Ok(Some("new".to_string())))
        .unwrap();
    assert_eq!(namespace.call("greet", vec![]).await.unwrap(), json!("new"));
}

#[tokio::test]
async fn replacement_does_not_affect_in_flight_calls() {
    let component = BridgeComponent::new();
    let started = Arc::new(AtomicBool::new(false));
    component
        .add_interface("greet", {
            let started = started.clone();
            move |_: &[Value]| {
                started.store(true, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(120));
                Ok(Some("old".to_string()))
            }
        })
        .unwrap();
    let loopback = Loopback::connect(&component).unwrap();
    loopback.navigate("https://app.test/");

    let namespace = loopback.namespace();
    let in_flight = {
        let namespace = namespace.clone();
        tokio::spawn(async move { namespace.call("greet", vec![]).await })
    };
    for _ in 0..200 {
        if started.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    component
        .set_interface("greet", |_: &[Value]| Ok(Some("new".to_string())))
        .unwrap();

    assert_eq!(in_flight.await.unwrap().unwrap(), json!("old"));
    assert_eq!(namespace.call("greet", vec![]).await.unwrap(), json!("new"));
}

#[tokio::test]
async fn registration_is_sealed_by_attachment() {
    let component = echo_component();
    let reserved = component.add_interface("trestleEcho", |_: &[Value]| Ok(None));
    assert!(matches!(reserved, Err(RegistryError::ReservedName(_))));
    let duplicate = component.add_interface("echo", |_: &[Value]| Ok(None));
    assert!(matches!(duplicate, Err(RegistryError::Duplicate(_))));

    let _loopback = Loopback::connect(&component).unwrap();

    let late = component.add_interface("late", |_: &[Value]| Ok(None));
    assert!(matches!(late, Err(RegistryError::Attached(_))));
    let unknown = component.set_interface("ghost", |_: &[Value]| Ok(None));
    assert!(matches!(unknown, Err(RegistryError::Unknown(_))));
}

#[derive(Default)]
struct SequenceObserver {
    seen: Mutex<Vec<String>>,
}

impl NavigationObserver for SequenceObserver {
    fn on_started(&self, navigation: &Navigation) {
        self.seen
            .lock()
            .unwrap()
            .push(format!("started {}", navigation.url));
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
}

async fn wait_for_bootstraps(loopback: &Loopback, count: usize) {
    for _ in 0..200 {
        if loopback.bootstraps() == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    assert_eq!(loopback.bootstraps(), count);
}

#[tokio::test]
async fn chained_observer_sees_each_navigation_in_order() {
    let component = BridgeComponent::new();
    let observer = Arc::new(SequenceObserver::default());
    component.chain_observer(observer.clone()).unwrap();
    let loopback = Loopback::connect(&component).unwrap();

    let policy = loopback.navigate("https://app.test/");
    assert_eq!(policy, NavigationPolicy::Allow);
    assert_eq!(
        *observer.seen.lock().unwrap(),
        vec![
            "started https://app.test/".to_string(),
            "committed https://app.test/".to_string(),
            "finished https://app.test/".to_string(),
        ]
    );
    wait_for_bootstraps(&loopback, 1).await;

    loopback.navigate("https://app.test/next");
    wait_for_bootstraps(&loopback, 2).await;

    let second = component.chain_observer(Arc::new(SequenceObserver::default()));
    assert!(second.is_err());
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

#[tokio::test]
async fn external_scheme_is_cancelled_and_handed_off() {
    let opener = Arc::new(RecordingOpener::default());
    let component = BridgeComponent::new().with_opener(opener.clone());
    let loopback = Loopback::connect(&component).unwrap();

    let policy = loopback.navigate("mailto:team@app.test");
    assert_eq!(policy, NavigationPolicy::Cancel);
    assert_eq!(
        *opener.opened.lock().unwrap(),
        vec!["mailto:team@app.test".to_string()]
    );
    assert_eq!(loopback.bootstraps(), 0);
}

#[derive(Default)]
struct RecordingConsole {
    lines: Mutex<Vec<(ConsoleLevel, String)>>,
}

impl ConsoleSink for RecordingConsole {
    fn write(&self, level: ConsoleLevel, line: &str) {
        self.lines.lock().unwrap().push((level, line.to_string()));
    }
}

#[tokio::test]
async fn content_console_reaches_the_host_sink() {
    let sink = Arc::new(RecordingConsole::default());
    let component = BridgeComponent::new().with_console(sink.clone());
    let loopback = Loopback::connect(&component).unwrap();
    loopback.navigate("https://app.test/");

    let namespace = loopback.namespace();
    namespace.console().error(&[json!("exploded"), json!(7)]);

    let mut lines = Vec::new();
    for _ in 0..200 {
        lines = sink.lines.lock().unwrap().clone();
        if !lines.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    assert_eq!(lines, vec![(ConsoleLevel::Error, "exploded 7".to_string())]);
}

#[tokio::test]
async fn host_call_reaches_an_exposed_function() {
    let component = BridgeComponent::new();
    let loopback = Loopback::connect(&component).unwrap();
    loopback.navigate("https://app.test/");

    let received = Arc::new(Mutex::new(Vec::<Value>::new()));
    let namespace = loopback.namespace();
    namespace.expose("onPush", {
        let received = received.clone();
        move |args: &[Value]| received.lock().unwrap().extend(args.iter().cloned())
    });

    component
        .call_content("onPush", &[json!({"n": 1}), json!("two")])
        .unwrap();

    let mut seen = Vec::new();
    for _ in 0..200 {
        seen = received.lock().unwrap().clone();
        if !seen.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    assert_eq!(seen, vec![json!({"n": 1}), json!("two")]);
}
