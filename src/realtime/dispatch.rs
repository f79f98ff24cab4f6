//! Handler registry and message dispatch.

use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::realtime::messages::{Frame, Inbound};

/// Callback invoked with an event's payload.
pub type Handler = Arc<dyn Fn(Value) + Send + Sync>;

/// What happened to one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A handler for this type tag ran.
    Delivered { kind: String },
    /// Control frame consumed by the client itself.
    Control,
    /// No handler registered for this type tag.
    Unhandled { kind: String },
    /// The handler panicked; the connection stays up.
    HandlerFailed { kind: String },
    /// Frame could not be parsed.
    Malformed(String),
}

/// Handlers keyed by name. Subscribing registers under the channel name and
/// inbound events are matched against it by their type tag.
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: Arc<Mutex<HashMap<String, Handler>>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the handler for `name`.
    pub fn register(&self, name: &str, handler: Handler) {
        self.lock().insert(name.to_string(), handler);
    }

    pub fn remove(&self, name: &str) -> bool {
        self.lock().remove(name).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Registered names, sorted.
    pub fn channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    /// Parse and dispatch a text frame.
    pub fn dispatch_text(&self, text: &str) -> Dispatch {
        match Frame::decode(text) {
            Ok(frame) => self.dispatch(Inbound::from(frame)),
            Err(e) => Dispatch::Malformed(e.to_string()),
        }
    }

    pub fn dispatch(&self, message: Inbound) -> Dispatch {
        match message {
            Inbound::Subscribed { channel } => {
                tracing::debug!(channel = ?channel, "Subscription acknowledged");
                Dispatch::Control
            }
            Inbound::Unsubscribed { channel } => {
                tracing::debug!(channel = ?channel, "Unsubscription acknowledged");
                Dispatch::Control
            }
            Inbound::Pong => Dispatch::Control,
            Inbound::ServerError { message } => {
                tracing::warn!(error = %message, "Real-time server reported an error");
                Dispatch::Control
            }
            Inbound::Event { kind, payload, .. } => {
                // Clone out so the handler runs without the lock held
                let handler = self.lock().get(&kind).cloned();
                match handler {
                    Some(handler) => match catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                        Ok(()) => Dispatch::Delivered { kind },
                        Err(_) => Dispatch::HandlerFailed { kind },
                    },
                    None => Dispatch::Unhandled { kind },
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Handler>> {
        self.handlers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerTable")
            .field("channels", &self.channels())
            .finish()
    }
}
