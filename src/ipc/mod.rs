//! Wire shapes for the event module and the channel that carries them to the host.
//!
//! Every request is wrapped in a [`Command`] envelope naming the host module that
//! should handle it; the message itself is tagged by its `cmd` field.

pub mod local;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::callback::CallbackToken;
use crate::event::EventId;

pub use local::{EmittedEvent, LocalHost};

/// Module tag the host routes event requests by.
pub const EVENT_MODULE: &str = "Event";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "__tauriModule")]
    pub module: String,
    pub message: EventMessage,
}

impl Command {
    pub fn new(module: impl Into<String>, message: EventMessage) -> Self {
        Self {
            module: module.into(),
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub enum EventMessage {
    #[serde(rename_all = "camelCase")]
    Listen {
        event: String,
        window_label: Option<String>,
        handler: CallbackToken,
    },
    #[serde(rename_all = "camelCase")]
    Unlisten { event_id: EventId },
    #[serde(rename_all = "camelCase")]
    Emit {
        event: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window_label: Option<String>,
        payload: String,
    },
}

impl EventMessage {
    pub fn cmd(&self) -> &'static str {
        match self {
            EventMessage::Listen { .. } => "listen",
            EventMessage::Unlisten { .. } => "unlisten",
            EventMessage::Emit { .. } => "emit",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("host rejected `{cmd}` request: {reason}")]
    Rejected { cmd: String, reason: String },
}

/// Request/response primitive towards the host.
///
/// Implementations resolve with the host's reply, or reject when the transport
/// fails or the host refuses the request. A call that never completes leaves
/// the caller pending; no timeout is applied here.
pub trait CommandChannel: Send + Sync {
    fn invoke(&self, command: Command) -> BoxFuture<'_, Result<Value, ChannelError>>;
}

impl<C: CommandChannel + ?Sized> CommandChannel for std::sync::Arc<C> {
    fn invoke(&self, command: Command) -> BoxFuture<'_, Result<Value, ChannelError>> {
        (**self).invoke(command)
    }
}
