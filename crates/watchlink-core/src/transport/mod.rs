//! The narrow seam over the platform's phone/watch connectivity service.
//!
//! The relay and presenter only ever need two things from the platform:
//! replicate the latest context snapshot, and send a one-way message.
//! Everything else (pairing, activation, delivery) is the platform's job.

mod loopback;

pub use loopback::{LoopbackEndpoint, LoopbackLink, Side};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;

/// Callback for a reply to a one-way message. Nothing in this crate waits on
/// replies, so callers normally pass `None`.
pub type ReplyHandler = Box<dyn FnOnce(Value) + Send>;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Companion device is not activated (state: {0})")]
    NotActivated(ConnectivityState),

    #[error("Peer is not reachable")]
    Unreachable,

    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Best-effort channel to the paired device.
pub trait Transport {
    /// Replicate `context` to the peer. Last write wins; intermediate
    /// snapshots may never be seen.
    fn update_application_context(&self, context: &Value) -> Result<(), TransportError>;

    /// Send a one-way message to the peer.
    fn send_message(&self, message: &Value, reply: Option<ReplyHandler>)
        -> Result<(), TransportError>;
}

/// Activation state of the companion app as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectivityState {
    #[default]
    NotActivated,
    Inactive,
    Activated,
}

impl ConnectivityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectivityState::NotActivated => "notActivated",
            ConnectivityState::Inactive => "inactive",
            ConnectivityState::Activated => "activated",
        }
    }
}

impl std::fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectivityState {
    type Err = String;

    /// Platform bridges report the state in varying case ("Activated",
    /// "ACTIVATED", "activated").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "notactivated" | "not_activated" => Ok(ConnectivityState::NotActivated),
            "inactive" => Ok(ConnectivityState::Inactive),
            "activated" => Ok(ConnectivityState::Activated),
            other => Err(format!("Unknown connectivity state: {other}")),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording fake used by relay and presenter tests.

    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records every outbound context and message. Clones share the record.
    #[derive(Clone, Default)]
    pub struct RecordingTransport {
        contexts: Arc<Mutex<Vec<Value>>>,
        messages: Arc<Mutex<Vec<Value>>>,
        failing: Arc<Mutex<bool>>,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every subsequent call fail with `Unreachable`.
        pub fn set_failing(&self, failing: bool) {
            *self.failing.lock().unwrap() = failing;
        }

        pub fn contexts(&self) -> Vec<Value> {
            self.contexts.lock().unwrap().clone()
        }

        pub fn last_context(&self) -> Option<Value> {
            self.contexts.lock().unwrap().last().cloned()
        }

        pub fn messages(&self) -> Vec<Value> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl Transport for RecordingTransport {
        fn update_application_context(&self, context: &Value) -> Result<(), TransportError> {
            if *self.failing.lock().unwrap() {
                return Err(TransportError::Unreachable);
            }
            self.contexts.lock().unwrap().push(context.clone());
            Ok(())
        }

        fn send_message(
            &self,
            message: &Value,
            _reply: Option<ReplyHandler>,
        ) -> Result<(), TransportError> {
            if *self.failing.lock().unwrap() {
                return Err(TransportError::Unreachable);
            }
            self.messages.lock().unwrap().push(message.clone());
            Ok(())
        }
    }
}
