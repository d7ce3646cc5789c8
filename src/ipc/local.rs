use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::{json, Value};
use tracing::{debug, error};

use super::{ChannelError, Command, CommandChannel, EventMessage};
use crate::bridge::EventBridge;
use crate::callback::{CallbackError, CallbackRegistry, CallbackToken};
use crate::config::BridgeConfig;
use crate::event::{EventId, EventTarget};

/// An event the frontend emitted towards the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedEvent {
    pub event: String,
    pub window_label: Option<String>,
    pub payload: String,
}

#[derive(Debug, Clone)]
struct Registration {
    event: String,
    target: EventTarget,
    handler: CallbackToken,
}

struct HostState {
    callbacks: Arc<CallbackRegistry>,
    next_id: AtomicU64,
    registrations: Mutex<BTreeMap<EventId, Registration>>,
    requests: Mutex<Vec<Value>>,
    emitted: Mutex<Vec<EmittedEvent>>,
    failures: Mutex<HashMap<String, String>>,
}

/// In-process host: owns the authoritative listener table and pushes events
/// into frontend callbacks.
#[derive(Clone)]
pub struct LocalHost {
    state: Arc<HostState>,
}

impl Default for LocalHost {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalHost {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Host whose first registration is assigned `first_id`.
    pub fn starting_at(first_id: u64) -> Self {
        Self {
            state: Arc::new(HostState {
                callbacks: Arc::new(CallbackRegistry::new()),
                next_id: AtomicU64::new(first_id),
                registrations: Mutex::new(BTreeMap::new()),
                requests: Mutex::new(Vec::new()),
                emitted: Mutex::new(Vec::new()),
                failures: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Callback table shared between this host and the frontend.
    pub fn callbacks(&self) -> Arc<CallbackRegistry> {
        Arc::clone(&self.state.callbacks)
    }

    /// Frontend bridge talking to this host.
    pub fn connect(&self, config: BridgeConfig) -> EventBridge {
        EventBridge::new(Arc::new(self.clone()), self.callbacks(), config)
    }

    /// Makes the next request with the given `cmd` reject.
    pub fn fail_next(&self, cmd: &str, reason: impl Into<String>) {
        lock(&self.state.failures).insert(cmd.to_string(), reason.into());
    }

    /// Every envelope received so far, in wire form.
    pub fn requests(&self) -> Vec<Value> {
        lock(&self.state.requests).clone()
    }

    pub fn emitted(&self) -> Vec<EmittedEvent> {
        lock(&self.state.emitted).clone()
    }

    pub fn is_registered(&self, id: EventId) -> bool {
        lock(&self.state.registrations).contains_key(&id)
    }

    pub fn live_registrations(&self) -> usize {
        lock(&self.state.registrations).len()
    }

    /// Pushes an event to every matching live registration.
    ///
    /// Returns how many handlers ran. Failures of individual handlers are
    /// logged and do not stop delivery to the others.
    pub fn dispatch(&self, event: &str, source_window: Option<&str>, payload: Value) -> usize {
        let targets: Vec<EventId> = lock(&self.state.registrations)
            .iter()
            .filter(|(_, registration)| {
                registration.event == event && registration.target.accepts(source_window)
            })
            .map(|(id, _)| *id)
            .collect();

        let mut delivered = 0;
        for id in targets {
            match self.deliver(id, source_window, payload.clone()) {
                Ok(true) => delivered += 1,
                Ok(false) => {}
                // A once listener already used up by an earlier delivery.
                Err(err @ CallbackError::UnknownToken(_)) => {
                    debug!(target = "event_bridge", event = %event, event_id = %id, error = %err, "skipping spent callback");
                }
                Err(err) => {
                    error!(target = "event_bridge", event = %event, event_id = %id, error = %err, "failed to deliver event");
                }
            }
        }
        delivered
    }

    /// Pushes one event to the registration `id`.
    ///
    /// Returns `Ok(false)` when the registration no longer exists.
    pub fn deliver(
        &self,
        id: EventId,
        source_window: Option<&str>,
        payload: Value,
    ) -> Result<bool, CallbackError> {
        let Some(registration) = lock(&self.state.registrations).get(&id).cloned() else {
            debug!(target = "event_bridge", event_id = %id, "dropping delivery for unknown registration");
            return Ok(false);
        };

        let event = json!({
            "event": registration.event,
            "windowLabel": source_window,
            "id": id,
            "payload": payload,
        });
        self.state.callbacks.invoke(registration.handler, event)?;
        Ok(true)
    }

    fn handle(&self, command: Command) -> Result<Value, ChannelError> {
        let wire = serde_json::to_value(&command)
            .map_err(|err| ChannelError::Transport(err.to_string()))?;
        lock(&self.state.requests).push(wire);

        let cmd = command.message.cmd();
        if let Some(reason) = lock(&self.state.failures).remove(cmd) {
            return Err(ChannelError::Rejected {
                cmd: cmd.to_string(),
                reason,
            });
        }

        match command.message {
            EventMessage::Listen {
                event,
                window_label,
                handler,
            } => {
                let id = EventId(self.state.next_id.fetch_add(1, Ordering::SeqCst));
                debug!(target = "event_bridge", event = %event, event_id = %id, %handler, "host registered listener");
                lock(&self.state.registrations).insert(
                    id,
                    Registration {
                        event,
                        target: EventTarget::from(window_label),
                        handler,
                    },
                );
                Ok(json!(id))
            }
            EventMessage::Unlisten { event_id } => {
                let removed = lock(&self.state.registrations).remove(&event_id).is_some();
                debug!(target = "event_bridge", %event_id, removed, "host removed listener");
                Ok(Value::Null)
            }
            EventMessage::Emit {
                event,
                window_label,
                payload,
            } => {
                lock(&self.state.emitted).push(EmittedEvent {
                    event,
                    window_label,
                    payload,
                });
                Ok(Value::Null)
            }
        }
    }
}

impl CommandChannel for LocalHost {
    fn invoke(&self, command: Command) -> BoxFuture<'_, Result<Value, ChannelError>> {
        async move { self.handle(command) }.boxed()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
