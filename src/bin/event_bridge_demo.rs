use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use event_bridge::{BridgeConfig, Event, EventTarget, LocalHost, SystemEvent};
use serde::Deserialize;
use serde_json::json;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

const REMOVAL_POLLS: usize = 50;
const REMOVAL_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Deserialize)]
struct Size {
    width: u32,
    height: u32,
}

fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    setup_tracing();

    let config_path = std::env::var("EVENT_BRIDGE_CONFIG").ok().map(PathBuf::from);
    let config = BridgeConfig::load(config_path).context("load bridge config")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("event bridge runtime")?;

    runtime.block_on(run(config))
}

async fn run(config: BridgeConfig) -> Result<()> {
    let host = LocalHost::new();
    let bridge = host.connect(config);

    let resizes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&resizes);
    let resize = bridge
        .listen(
            SystemEvent::Resize,
            EventTarget::window("main"),
            move |event: Event<Size>| {
                counter.fetch_add(1, Ordering::SeqCst);
                info!(
                    id = %event.id,
                    width = event.payload.width,
                    height = event.payload.height,
                    "window resized"
                );
            },
        )
        .await
        .context("listen for resize")?;

    bridge
        .once("ping", EventTarget::Any, |event: Event<String>| {
            info!(id = %event.id, payload = %event.payload, "ping received");
        })
        .await
        .context("listen once for ping")?;

    host.dispatch(
        SystemEvent::Resize.as_str(),
        Some("main"),
        json!({ "width": 800, "height": 600 }),
    );
    host.dispatch(
        SystemEvent::Resize.as_str(),
        Some("settings"),
        json!({ "width": 320, "height": 240 }),
    );
    host.dispatch("ping", None, json!("first"));
    host.dispatch("ping", None, json!("second"));

    bridge
        .emit("custom-event", EventTarget::Any, &json!({ "a": 1 }))
        .await
        .context("emit custom-event")?;
    bridge
        .emit("greeting", EventTarget::window("main"), "hello")
        .await
        .context("emit greeting")?;

    resize.unlisten().await.context("unlisten resize")?;
    // The one-off listener removes itself in the background.
    for _ in 0..REMOVAL_POLLS {
        if host.live_registrations() == 0 {
            break;
        }
        sleep(REMOVAL_POLL_INTERVAL).await;
    }
    if host.live_registrations() != 0 {
        warn!(live = host.live_registrations(), "listeners still registered");
    }

    for emitted in host.emitted() {
        info!(
            event = %emitted.event,
            window = ?emitted.window_label,
            payload = %emitted.payload,
            "host received"
        );
    }
    info!(
        resizes = resizes.load(Ordering::SeqCst),
        live = host.live_registrations(),
        "done"
    );
    Ok(())
}
