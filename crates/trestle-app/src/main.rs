mod cli;
mod loopback;

#[cfg(test)]
mod tests;

use std::time::Duration;

use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use trestle_common::{display_value, BridgeOptions};
use trestle_host::BridgeComponent;

use crate::loopback::Loopback;

#[tokio::main]
async fn main() {
    let args = cli::parse();

    // Initialize logging
    let log_directive = args.log_level.as_deref().unwrap_or("trestle=info");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                log_directive
                    .parse()
                    .unwrap_or_else(|_| "trestle=info".parse().unwrap()),
            ),
        )
        .init();

    tracing::info!("trestle v{} starting", env!("CARGO_PKG_VERSION"));

    let mut options = BridgeOptions::default();
    if let Some(ms) = args.timeout_ms {
        options.call_timeout_ms = ms;
    }

    let component = BridgeComponent::new()
        .with_options(options)
        .with_device(json!({
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        }));
    register_demo_interfaces(&component);

    let loopback = match Loopback::connect(&component) {
        Ok(loopback) => loopback,
        Err(err) => {
            tracing::error!(%err, "bridge wiring failed");
            return;
        }
    };
    tracing::info!(
        channels = loopback.subscribed().len(),
        "bridge connected"
    );

    let namespace = loopback.namespace();
    namespace.expose("onGreeting", |args: &[Value]| {
        let payload = args.first().map(display_value).unwrap_or_default();
        tracing::info!(%payload, "host greeted the page");
    });

    let url = args
        .url
        .as_deref()
        .unwrap_or("https://app.internal/index.html");
    loopback.navigate(url);

    let message = args
        .message
        .unwrap_or_else(|| "hello across the bridge".to_string());
    match namespace.call("echo", vec![json!(message)]).await {
        Ok(value) => tracing::info!(reply = %display_value(&value), "echo resolved"),
        Err(err) => tracing::error!(%err, "echo failed"),
    }

    match namespace.call("sum", vec![json!(2), json!(40)]).await {
        Ok(value) => tracing::info!(total = %display_value(&value), "sum resolved"),
        Err(err) => tracing::error!(%err, "sum failed"),
    }

    namespace.console().log(&[json!("content console says hi")]);

    if let Err(err) = component.call_content("onGreeting", &[json!({"from": "host"})]) {
        tracing::warn!(%err, "content call failed");
    }

    // Let the detached console forward and the content call drain.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let policy = loopback.navigate("mailto:team@app.internal");
    tracing::info!(?policy, url = "mailto:team@app.internal", "external scheme decided");

    tracing::info!(bootstraps = loopback.bootstraps(), "demo complete");
}

fn register_demo_interfaces(component: &BridgeComponent) {
    let results = [
        component.add_interface("echo", |args: &[Value]| {
            Ok(args.first().map(display_value))
        }),
        component.add_interface("sum", |args: &[Value]| {
            let total: f64 = args.iter().filter_map(Value::as_f64).sum();
            Ok(Some(total.to_string()))
        }),
    ];
    for result in results {
        if let Err(err) = result {
            tracing::warn!(%err, "interface registration failed");
        }
    }
}
