use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Handle the host uses to call back into a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackToken(pub u64);

impl fmt::Display for CallbackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("no callback registered for token {0}")]
    UnknownToken(CallbackToken),
    #[error("failed to decode callback argument: {0}")]
    Decode(#[from] serde_json::Error),
}

type RawCallback = Arc<dyn Fn(Value) -> Result<(), CallbackError> + Send + Sync>;

struct CallbackEntry {
    callback: RawCallback,
    once: bool,
}

/// Arena mapping monotonically increasing tokens to handler closures.
///
/// Entries stay until they are explicitly removed (or, for `once` entries,
/// until their first invocation). The table lock is never held while a
/// callback runs, so callbacks may register or remove other callbacks.
pub struct CallbackRegistry {
    next_token: AtomicU64,
    callbacks: Mutex<HashMap<CallbackToken, CallbackEntry>>,
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self {
            next_token: AtomicU64::new(1),
            callbacks: Mutex::new(HashMap::new()),
        }
    }

    pub fn register<F>(&self, callback: F) -> CallbackToken
    where
        F: Fn(Value) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.insert(Arc::new(callback), false)
    }

    /// Registers a callback that is dropped from the table on its first call.
    pub fn register_once<F>(&self, callback: F) -> CallbackToken
    where
        F: Fn(Value) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.insert(Arc::new(callback), true)
    }

    fn insert(&self, callback: RawCallback, once: bool) -> CallbackToken {
        let token = CallbackToken(self.next_token.fetch_add(1, Ordering::SeqCst));
        self.lock().insert(token, CallbackEntry { callback, once });
        debug!(target = "event_bridge", %token, once, "registered callback");
        token
    }

    /// Looks up `token` and calls it with `argument`.
    pub fn invoke(&self, token: CallbackToken, argument: Value) -> Result<(), CallbackError> {
        let callback = {
            let mut callbacks = self.lock();
            let once = callbacks
                .get(&token)
                .map(|entry| entry.once)
                .ok_or(CallbackError::UnknownToken(token))?;
            if once {
                callbacks.remove(&token).map(|entry| entry.callback)
            } else {
                callbacks.get(&token).map(|entry| Arc::clone(&entry.callback))
            }
        }
        .ok_or(CallbackError::UnknownToken(token))?;
        callback(argument)
    }

    /// Returns true when an entry was actually removed.
    pub fn remove(&self, token: CallbackToken) -> bool {
        let removed = self.lock().remove(&token).is_some();
        if removed {
            debug!(target = "event_bridge", %token, "removed callback");
        }
        removed
    }

    pub fn contains(&self, token: CallbackToken) -> bool {
        self.lock().contains_key(&token)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CallbackToken, CallbackEntry>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn tokens_are_unique_and_increasing() {
        let registry = CallbackRegistry::new();
        let first = registry.register(|_| Ok(()));
        let second = registry.register(|_| Ok(()));
        assert!(second > first);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn invoke_passes_the_argument() {
        let registry = CallbackRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let token = registry.register(move |value| {
            sink.lock().unwrap().push(value);
            Ok(())
        });

        registry.invoke(token, serde_json::json!(1)).unwrap();
        registry.invoke(token, serde_json::json!("two")).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![serde_json::json!(1), serde_json::json!("two")]
        );
    }

    #[test]
    fn once_entries_are_dropped_after_first_call() {
        let registry = CallbackRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let token = registry.register_once(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert!(registry.contains(token));
        registry.invoke(token, Value::Null).unwrap();
        assert!(!registry.contains(token));
        assert!(matches!(
            registry.invoke(token, Value::Null),
            Err(CallbackError::UnknownToken(t)) if t == token
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn removed_tokens_are_not_reused() {
        let registry = CallbackRegistry::new();
        let token = registry.register(|_| Ok(()));
        assert!(registry.contains(token));
        assert!(registry.remove(token));
        assert!(!registry.contains(token));
        assert!(!registry.remove(token));
        let next = registry.register(|_| Ok(()));
        assert_ne!(token, next);
        assert!(registry.invoke(token, Value::Null).is_err());
    }

    #[test]
    fn callbacks_can_touch_the_registry_while_running() {
        let registry = Arc::new(CallbackRegistry::new());
        let inner = Arc::clone(&registry);
        let token = registry.register(move |_| {
            inner.register(|_| Ok(()));
            Ok(())
        });
        registry.invoke(token, Value::Null).unwrap();
        assert_eq!(registry.len(), 2);
    }
}
