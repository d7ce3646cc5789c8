use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use event_bridge::{
    BridgeConfig, BridgeError, CallbackRegistry, ChannelError, Command, CommandChannel, Event,
    EventBridge, EventId, EventTarget, LocalHost, SystemEvent,
};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::{json, Value};

fn counting_handler() -> (Arc<AtomicUsize>, impl Fn(Event<Value>) + Send + Sync + 'static) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    (calls, move |_event: Event<Value>| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

#[tokio::test]
async fn listen_registers_and_unlisten_sends_event_id() {
    let host = LocalHost::starting_at(7);
    let bridge = host.connect(BridgeConfig::default());
    let (_calls, handler) = counting_handler();

    let unlisten = bridge
        .listen(SystemEvent::Resize, EventTarget::Any, handler)
        .await
        .expect("listen");
    assert_eq!(unlisten.event_id(), EventId(7));

    let requests = host.requests();
    assert_eq!(requests[0]["message"]["cmd"], json!("listen"));
    assert_eq!(requests[0]["message"]["event"], json!("tauri://resize"));
    assert_eq!(requests[0]["message"]["windowLabel"], Value::Null);
    assert_eq!(
        requests[0]["message"]["handler"],
        json!(unlisten.handler().0)
    );

    unlisten.unlisten().await.expect("unlisten");
    assert_eq!(
        host.requests()[1],
        json!({
            "__tauriModule": "Event",
            "message": { "cmd": "unlisten", "eventId": 7 }
        })
    );
    assert!(!host.is_registered(EventId(7)));
}

#[tokio::test]
async fn handler_receives_every_delivery_until_unlisten() {
    let host = LocalHost::new();
    let bridge = host.connect(BridgeConfig::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let unlisten = bridge
        .listen("counter", EventTarget::Any, move |event: Event<u32>| {
            sink.lock().unwrap().push((event.id, event.payload));
        })
        .await
        .expect("listen");
    let id = unlisten.event_id();

    for n in 0..3 {
        assert_eq!(host.dispatch("counter", None, json!(n)), 1);
    }
    unlisten.unlisten().await.expect("unlisten");
    assert_eq!(host.dispatch("counter", None, json!(99)), 0);

    assert_eq!(*seen.lock().unwrap(), vec![(id, 0), (id, 1), (id, 2)]);
}

#[tokio::test]
async fn unlisten_before_delivery_means_no_invocations() {
    let host = LocalHost::new();
    let bridge = host.connect(BridgeConfig::default());
    let (calls, handler) = counting_handler();

    let unlisten = bridge
        .listen("tick", EventTarget::Any, handler)
        .await
        .expect("listen");
    unlisten.unlisten().await.expect("unlisten");

    assert_eq!(host.dispatch("tick", None, Value::Null), 0);
    assert!(!host.deliver(unlisten.event_id(), None, Value::Null).unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(bridge.callbacks().is_empty());
}

#[tokio::test]
async fn unlisten_twice_is_harmless() {
    let host = LocalHost::new();
    let bridge = host.connect(BridgeConfig::default());
    let (calls, handler) = counting_handler();

    let unlisten = bridge
        .listen("tick", EventTarget::Any, handler)
        .await
        .expect("listen");
    unlisten.unlisten().await.expect("first unlisten");
    unlisten.clone().unlisten().await.expect("second unlisten");

    // Both requests reach the host.
    let unlistens = host
        .requests()
        .into_iter()
        .filter(|request| request["message"]["cmd"] == json!("unlisten"))
        .count();
    assert_eq!(unlistens, 2);

    host.dispatch("tick", None, Value::Null);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn window_scoped_listener_ignores_other_windows() {
    let host = LocalHost::new();
    let bridge = host.connect(BridgeConfig::default());
    let labels = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&labels);

    bridge
        .listen(
            SystemEvent::Focus,
            EventTarget::window("main"),
            move |event: Event<Value>| {
                sink.lock().unwrap().push(event.window_label);
            },
        )
        .await
        .expect("listen");

    assert_eq!(host.requests()[0]["message"]["windowLabel"], json!("main"));
    host.dispatch("tauri://focus", Some("settings"), Value::Null);
    host.dispatch("tauri://focus", Some("main"), Value::Null);

    assert_eq!(*labels.lock().unwrap(), vec![Some("main".to_string())]);
}

#[tokio::test]
async fn rejected_listen_releases_the_callback() {
    let host = LocalHost::new();
    let bridge = host.connect(BridgeConfig::default());
    host.fail_next("listen", "host unavailable");
    let (_calls, handler) = counting_handler();

    let err = bridge
        .listen("tick", EventTarget::Any, handler)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Channel(ChannelError::Rejected { .. })
    ));
    assert!(bridge.callbacks().is_empty());
    assert_eq!(host.live_registrations(), 0);
}

#[tokio::test]
async fn failed_unlisten_surfaces_to_caller() {
    let host = LocalHost::new();
    let bridge = host.connect(BridgeConfig::default());
    let (calls, handler) = counting_handler();

    let unlisten = bridge
        .listen("tick", EventTarget::Any, handler)
        .await
        .expect("listen");
    host.fail_next("unlisten", "busy");

    assert!(unlisten.unlisten().await.is_err());
    // Still registered, still delivering.
    assert!(host.is_registered(unlisten.event_id()));
    assert_eq!(host.dispatch("tick", None, Value::Null), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    unlisten.unlisten().await.expect("retry by caller");
    assert_eq!(host.dispatch("tick", None, Value::Null), 0);
}

#[tokio::test]
async fn undecodable_payload_is_reported_to_the_dispatcher() {
    let host = LocalHost::new();
    let bridge = host.connect(BridgeConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let unlisten = bridge
        .listen("count", EventTarget::Any, move |_: Event<u64>| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .expect("listen");

    assert!(host
        .deliver(unlisten.event_id(), None, json!("not a number"))
        .is_err());
    // The registration survives a bad delivery.
    assert!(host.deliver(unlisten.event_id(), None, json!(5)).unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

struct OddHost;

impl CommandChannel for OddHost {
    fn invoke(&self, _command: Command) -> BoxFuture<'_, Result<Value, ChannelError>> {
        async { Ok(json!("not an id")) }.boxed()
    }
}

#[tokio::test]
async fn non_integer_listen_reply_is_an_error() {
    let callbacks = Arc::new(CallbackRegistry::new());
    let bridge = EventBridge::new(
        Arc::new(OddHost),
        Arc::clone(&callbacks),
        BridgeConfig::default(),
    );
    let (_calls, handler) = counting_handler();

    let err = bridge
        .listen("tick", EventTarget::Any, handler)
        .await
        .unwrap_err();
    match err {
        BridgeError::UnexpectedResponse { cmd, reply } => {
            assert_eq!(cmd, "listen");
            assert_eq!(reply, json!("not an id"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(callbacks.is_empty());
}
