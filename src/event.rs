use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Host-assigned identifier of a live registration. Only used to unlisten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An event pushed by the host to a registered handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event<T> {
    pub event: String,
    /// Label of the window that emitted the event, when the host knows it.
    #[serde(default)]
    pub window_label: Option<String>,
    /// Identifier of the registration this delivery belongs to.
    pub id: EventId,
    pub payload: T,
}

/// Which UI surfaces an emission or a listener is scoped to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum EventTarget {
    /// Every window when emitting, any window when listening.
    #[default]
    Any,
    Window(String),
}

impl EventTarget {
    pub fn window(label: impl Into<String>) -> Self {
        Self::Window(label.into())
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Any => None,
            Self::Window(label) => Some(label),
        }
    }

    /// Whether an event emitted by `source` reaches a listener scoped to `self`.
    pub fn accepts(&self, source: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::Window(label) => source == Some(label.as_str()),
        }
    }

    pub(crate) fn into_label(self) -> Option<String> {
        match self {
            Self::Any => None,
            Self::Window(label) => Some(label),
        }
    }
}

impl From<&str> for EventTarget {
    fn from(label: &str) -> Self {
        Self::Window(label.to_string())
    }
}

impl From<String> for EventTarget {
    fn from(label: String) -> Self {
        Self::Window(label)
    }
}

impl<S: Into<String>> From<Option<S>> for EventTarget {
    fn from(label: Option<S>) -> Self {
        label.map_or(Self::Any, |label| Self::Window(label.into()))
    }
}

/// Event names the host emits on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemEvent {
    Update,
    UpdateAvailable,
    UpdateInstall,
    UpdateStatus,
    Resize,
    Move,
    CloseRequested,
    Focus,
    Blur,
    ScaleChange,
    Menu,
    FileDrop,
    FileDropHover,
    FileDropCancelled,
}

impl SystemEvent {
    pub const ALL: [SystemEvent; 14] = [
        SystemEvent::Update,
        SystemEvent::UpdateAvailable,
        SystemEvent::UpdateInstall,
        SystemEvent::UpdateStatus,
        SystemEvent::Resize,
        SystemEvent::Move,
        SystemEvent::CloseRequested,
        SystemEvent::Focus,
        SystemEvent::Blur,
        SystemEvent::ScaleChange,
        SystemEvent::Menu,
        SystemEvent::FileDrop,
        SystemEvent::FileDropHover,
        SystemEvent::FileDropCancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SystemEvent::Update => "tauri://update",
            SystemEvent::UpdateAvailable => "tauri://update-available",
            SystemEvent::UpdateInstall => "tauri://update-install",
            SystemEvent::UpdateStatus => "tauri://update-status",
            SystemEvent::Resize => "tauri://resize",
            SystemEvent::Move => "tauri://move",
            SystemEvent::CloseRequested => "tauri://close-requested",
            SystemEvent::Focus => "tauri://focus",
            SystemEvent::Blur => "tauri://blur",
            SystemEvent::ScaleChange => "tauri://scale-change",
            SystemEvent::Menu => "tauri://menu",
            SystemEvent::FileDrop => "tauri://file-drop",
            SystemEvent::FileDropHover => "tauri://file-drop-hover",
            SystemEvent::FileDropCancelled => "tauri://file-drop-cancelled",
        }
    }
}

impl fmt::Display for SystemEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemEvent {
    type Err = ();

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == name)
            .ok_or(())
    }
}

/// An event name: one of the reserved system names or anything user-defined.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventName {
    System(SystemEvent),
    Custom(String),
}

impl EventName {
    pub fn as_str(&self) -> &str {
        match self {
            EventName::System(system) => system.as_str(),
            EventName::Custom(name) => name,
        }
    }

    pub fn system(&self) -> Option<SystemEvent> {
        match self {
            EventName::System(system) => Some(*system),
            EventName::Custom(_) => None,
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SystemEvent> for EventName {
    fn from(system: SystemEvent) -> Self {
        EventName::System(system)
    }
}

impl From<&str> for EventName {
    fn from(name: &str) -> Self {
        match name.parse::<SystemEvent>() {
            Ok(system) => EventName::System(system),
            Err(()) => EventName::Custom(name.to_string()),
        }
    }
}

impl From<String> for EventName {
    fn from(name: String) -> Self {
        match name.parse::<SystemEvent>() {
            Ok(system) => EventName::System(system),
            Err(()) => EventName::Custom(name),
        }
    }
}

impl From<&String> for EventName {
    fn from(name: &String) -> Self {
        EventName::from(name.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventNameError {
    #[error("event name is empty")]
    Empty,
    #[error("event name {name:?} contains disallowed character {found:?}")]
    InvalidCharacter { name: String, found: char },
}

/// Checks that `name` only uses alphanumerics, `-`, `/`, `:` and `_`.
pub fn validate_event_name(name: &str) -> Result<(), EventNameError> {
    if name.is_empty() {
        return Err(EventNameError::Empty);
    }
    match name
        .chars()
        .find(|ch| !(ch.is_ascii_alphanumeric() || matches!(*ch, '-' | '/' | ':' | '_')))
    {
        Some(found) => Err(EventNameError::InvalidCharacter {
            name: name.to_string(),
            found,
        }),
        None => Ok(()),
    }
}
