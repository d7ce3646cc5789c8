use serde_json::Value;
use thiserror::Error;

use crate::event::EventNameError;
use crate::ipc::ChannelError;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("host answered `{cmd}` with unexpected value {reply}")]
    UnexpectedResponse { cmd: &'static str, reply: Value },
    #[error("invalid event name: {0}")]
    InvalidName(#[from] EventNameError),
    #[error("one-off listeners need a Tokio runtime: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
