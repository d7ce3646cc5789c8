use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::bridge::{unregister, EventBridge};
use crate::callback::{CallbackError, CallbackRegistry, CallbackToken};
use crate::error::BridgeError;
use crate::event::{Event, EventId, EventName, EventTarget};
use crate::ipc::{CommandChannel, EventMessage};

/// Capability to remove one registration.
///
/// Calling [`Unlisten::unlisten`] more than once forwards every call to the
/// host, which is expected to ignore ids it no longer knows.
#[derive(Clone)]
pub struct Unlisten {
    event_id: EventId,
    handler: CallbackToken,
    channel: Arc<dyn CommandChannel>,
    callbacks: Arc<CallbackRegistry>,
    module: Arc<str>,
}

impl Unlisten {
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn handler(&self) -> CallbackToken {
        self.handler
    }

    /// Asks the host to drop the registration, then releases the local callback.
    pub async fn unlisten(&self) -> Result<(), BridgeError> {
        unregister(self.channel.as_ref(), &self.module, self.event_id).await?;
        self.callbacks.remove(self.handler);
        debug!(target = "event_bridge", event_id = %self.event_id, "listener removed");
        Ok(())
    }
}

impl fmt::Debug for Unlisten {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unlisten")
            .field("event_id", &self.event_id)
            .field("handler", &self.handler)
            .field("module", &self.module)
            .finish()
    }
}

/// Wraps a typed handler so the transport can call it with a raw event value.
fn typed_callback<T, F>(
    handler: F,
) -> impl Fn(Value) -> Result<(), CallbackError> + Send + Sync + 'static
where
    T: DeserializeOwned + 'static,
    F: Fn(Event<T>) + Send + Sync + 'static,
{
    move |value| {
        let event: Event<T> = serde_json::from_value(value)?;
        handler(event);
        Ok(())
    }
}

impl EventBridge {
    /// Registers `handler` for `name`, scoped to `target`.
    ///
    /// The handler may run any number of times, and concurrently, until the
    /// returned [`Unlisten`] is used. Delivery matching is left to the host.
    pub async fn listen<T, F>(
        &self,
        name: impl Into<EventName>,
        target: impl Into<EventTarget>,
        handler: F,
    ) -> Result<Unlisten, BridgeError>
    where
        T: DeserializeOwned + 'static,
        F: Fn(Event<T>) + Send + Sync + 'static,
    {
        let name = name.into();
        self.check_name(name.as_str())?;
        let token = self.callbacks.register(typed_callback(handler));
        self.register(name, target.into(), token).await
    }

    /// Sends the registration for an already allocated callback token.
    ///
    /// The token is released again when the host refuses the registration.
    pub(crate) async fn register(
        &self,
        name: EventName,
        target: EventTarget,
        token: CallbackToken,
    ) -> Result<Unlisten, BridgeError> {
        let message = EventMessage::Listen {
            event: name.to_string(),
            window_label: target.into_label(),
            handler: token,
        };

        let reply = match self.send(message).await {
            Ok(reply) => reply,
            Err(err) => {
                self.callbacks.remove(token);
                return Err(err);
            }
        };
        let event_id = match serde_json::from_value::<EventId>(reply.clone()) {
            Ok(event_id) => event_id,
            Err(_) => {
                self.callbacks.remove(token);
                return Err(BridgeError::UnexpectedResponse {
                    cmd: "listen",
                    reply,
                });
            }
        };

        debug!(target = "event_bridge", event = %name, %event_id, %token, "listener registered");
        Ok(Unlisten {
            event_id,
            handler: token,
            channel: Arc::clone(&self.channel),
            callbacks: Arc::clone(&self.callbacks),
            module: Arc::from(self.config.module.as_str()),
        })
    }
}
