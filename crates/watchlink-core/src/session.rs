//! Session identifiers used to fence companion commands.
//!
//! A new session starts whenever the active conference URL changes. Commands
//! from the watch carry the session they were issued against, so anything
//! that arrives after the phone moved on can be recognized and dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fencing token minted from the wall clock (epoch millis) at the moment the
/// conference URL changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl SessionId {
    /// Read a session id out of an inbound wire value.
    ///
    /// Peers written in JavaScript or Swift may deliver the number as a float.
    /// A missing, zero, or non-integral value yields `None`.
    pub fn from_wire(value: &Value) -> Option<Self> {
        let raw = match value.as_i64() {
            Some(n) => n,
            None => {
                let f = value.as_f64()?;
                if !f.is_finite() || f.fract() != 0.0 {
                    return None;
                }
                f as i64
            }
        };

        (raw != 0).then_some(Self(raw))
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out session ids that never repeat within one relay.
///
/// Two URL changes inside the same millisecond would otherwise collide, so a
/// clock reading at or behind the previous id is bumped past it.
#[derive(Debug, Clone, Default)]
pub struct SessionMinter {
    last: Option<SessionId>,
}

impl SessionMinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint the next session id from the current clock reading.
    pub fn mint(&mut self, now_millis: i64) -> SessionId {
        let next = match self.last {
            Some(SessionId(prev)) if now_millis <= prev => match prev.checked_add(1) {
                Some(next) => next,
                // Restored id at the top of the range; fall back to the clock.
                None if now_millis != prev => now_millis,
                None => prev - 1,
            },
            _ => now_millis,
        };
        // Zero reads as "absent" on the wire.
        let id = SessionId(if next == 0 { 1 } else { next });
        self.last = Some(id);
        id
    }

    /// The most recently minted id, if any.
    pub fn last(&self) -> Option<SessionId> {
        self.last
    }
}
