use serde::Serialize;
use tracing::debug;

use crate::bridge::EventBridge;
use crate::error::BridgeError;
use crate::event::{EventName, EventTarget};
use crate::ipc::EventMessage;
use crate::payload::Payload;

impl EventBridge {
    /// Emits `name` to the host, towards one window or all of them.
    ///
    /// Resolves once the host has accepted the request, not once any listener
    /// has seen it. Pass `&()` to emit without a payload.
    pub async fn emit<P: Serialize + ?Sized>(
        &self,
        name: impl Into<EventName>,
        target: impl Into<EventTarget>,
        payload: &P,
    ) -> Result<(), BridgeError> {
        let name = name.into();
        self.check_name(name.as_str())?;
        let payload = Payload::encode(payload)?;
        let scope = target.into();

        if self.config.log_payloads {
            debug!(target = "event_bridge", event = %name, window = ?scope.label(), payload = %payload.as_str(), "emitting event");
        } else {
            debug!(target = "event_bridge", event = %name, window = ?scope.label(), "emitting event");
        }

        self.send(EventMessage::Emit {
            event: name.to_string(),
            window_label: scope.into_label(),
            payload: payload.into_wire(),
        })
        .await?;
        Ok(())
    }
}
