// Event bridge between an embedded web frontend and its native host

pub mod bridge;
pub mod callback;
pub mod config;
pub mod emitter;
pub mod error;
pub mod event;
pub mod ipc;
pub mod listener;
pub mod once;
pub mod payload;

// Re-export commonly used types
pub use bridge::EventBridge;
pub use callback::{CallbackError, CallbackRegistry, CallbackToken};
pub use config::{BridgeConfig, ConfigError};
pub use error::BridgeError;
pub use event::{
    validate_event_name, Event, EventId, EventName, EventNameError, EventTarget, SystemEvent,
};
pub use ipc::{ChannelError, Command, CommandChannel, EventMessage, LocalHost, EVENT_MODULE};
pub use listener::Unlisten;
pub use payload::Payload;
