use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::callback::CallbackRegistry;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::event::{validate_event_name, EventId};
use crate::ipc::{Command, CommandChannel, EventMessage};

/// Frontend side of the event bridge.
///
/// Cloning is cheap; clones share the channel and the callback table.
#[derive(Clone)]
pub struct EventBridge {
    pub(crate) channel: Arc<dyn CommandChannel>,
    pub(crate) callbacks: Arc<CallbackRegistry>,
    pub(crate) config: Arc<BridgeConfig>,
}

impl EventBridge {
    /// `callbacks` must be the table the transport invokes handler tokens from.
    pub fn new(
        channel: Arc<dyn CommandChannel>,
        callbacks: Arc<CallbackRegistry>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            channel,
            callbacks,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn callbacks(&self) -> &Arc<CallbackRegistry> {
        &self.callbacks
    }

    pub(crate) fn check_name(&self, name: &str) -> Result<(), BridgeError> {
        if self.config.strict_names {
            validate_event_name(name)?;
        }
        Ok(())
    }

    pub(crate) async fn send(&self, message: EventMessage) -> Result<Value, BridgeError> {
        send(self.channel.as_ref(), &self.config.module, message).await
    }
}

pub(crate) async fn send(
    channel: &dyn CommandChannel,
    module: &str,
    message: EventMessage,
) -> Result<Value, BridgeError> {
    let cmd = message.cmd();
    let reply = channel.invoke(Command::new(module, message)).await;
    if let Err(err) = &reply {
        debug!(target = "event_bridge", cmd, error = %err, "command rejected");
    }
    Ok(reply?)
}

/// Sends the unregistration request for `event_id`.
pub(crate) async fn unregister(
    channel: &dyn CommandChannel,
    module: &str,
    event_id: EventId,
) -> Result<(), BridgeError> {
    send(channel, module, EventMessage::Unlisten { event_id }).await?;
    Ok(())
}
