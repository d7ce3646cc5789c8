use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::debug;

use crate::bridge::{unregister, EventBridge};
use crate::callback::CallbackError;
use crate::error::BridgeError;
use crate::event::{Event, EventId, EventName, EventTarget};
use crate::ipc::CommandChannel;
use crate::listener::Unlisten;

/// Wrapper installed by [`EventBridge::once`].
///
/// It is registered as a one-shot callback, so the callback table drops it on
/// the first delivery and later deliveries never reach `handler`, even when the
/// host pushes again before the unregistration arrives.
fn once_callback<T, F>(
    handler: F,
    channel: Arc<dyn CommandChannel>,
    module: Arc<str>,
    runtime: Handle,
) -> impl Fn(Value) -> Result<(), CallbackError> + Send + Sync + 'static
where
    T: DeserializeOwned + 'static,
    F: Fn(Event<T>) + Send + Sync + 'static,
{
    move |value| {
        let event_id = value
            .get("id")
            .and_then(|id| serde_json::from_value::<EventId>(id.clone()).ok());
        let result = serde_json::from_value::<Event<T>>(value)
            .map(&handler)
            .map_err(CallbackError::from);

        // The registration is used up whether or not the payload decoded.
        if let Some(event_id) = event_id {
            let channel = Arc::clone(&channel);
            let module = Arc::clone(&module);
            runtime.spawn(async move {
                if let Err(err) = unregister(channel.as_ref(), &module, event_id).await {
                    debug!(target = "event_bridge", %event_id, error = %err, "one-off unlisten failed");
                }
            });
        }
        result
    }
}

impl EventBridge {
    /// Like [`EventBridge::listen`], but `handler` runs for the first delivery
    /// only. The registration then removes itself in the background; failures
    /// of that removal are ignored.
    ///
    /// Must be called from within a Tokio runtime, which is used for the
    /// background removal.
    pub async fn once<T, F>(
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
        let runtime = Handle::try_current()?;
        let token = self.callbacks.register_once(once_callback(
            handler,
            Arc::clone(&self.channel),
            Arc::from(self.config.module.as_str()),
            runtime,
        ));
        self.register(name, target.into(), token).await
    }
}
