//! In-process transport joining a phone endpoint to a companion endpoint.
//!
//! Stands in for the platform connectivity service in tests and in the
//! simulator. Each direction has:
//!
//! - a `watch` channel for the application context, so readers only ever
//!   observe the latest snapshot (intermediate ones may be skipped)
//! - a `broadcast` channel for one-way messages
//!
//! # Example
//!
//! ```rust
//! use watchlink_core::transport::{ConnectivityState, LoopbackLink, Transport};
//! use serde_json::json;
//!
//! let link = LoopbackLink::new();
//! link.set_connectivity(ConnectivityState::Activated);
//!
//! let phone = link.phone();
//! let watch = link.companion();
//! let ctx = watch.application_context();
//!
//! phone.update_application_context(&json!({"conferenceURL": "NULL"})).unwrap();
//! assert_eq!(ctx.borrow().as_ref().unwrap()["conferenceURL"], "NULL");
//! ```

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, watch};

use super::{ConnectivityState, ReplyHandler, Transport, TransportError};

/// Messages beyond this many unread cause slow receivers to lag.
const DEFAULT_CAPACITY: usize = 64;

/// Which device an endpoint represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Phone,
    Companion,
}

impl Side {
    pub fn peer(self) -> Self {
        match self {
            Side::Phone => Side::Companion,
            Side::Companion => Side::Phone,
        }
    }
}

/// Channels carrying traffic toward one side.
struct Direction {
    context: watch::Sender<Option<Value>>,
    messages: broadcast::Sender<Value>,
}

impl Direction {
    fn new(capacity: usize) -> Self {
        let (context, _) = watch::channel(None);
        let (messages, _) = broadcast::channel(capacity);
        Self { context, messages }
    }
}

struct LinkInner {
    to_phone: Direction,
    to_companion: Direction,
    connectivity: watch::Sender<ConnectivityState>,
}

impl LinkInner {
    fn toward(&self, side: Side) -> &Direction {
        match side {
            Side::Phone => &self.to_phone,
            Side::Companion => &self.to_companion,
        }
    }
}

/// A paired phone/companion connection living in one process.
///
/// Cloning the link clones a pointer; all clones and endpoints share the
/// same channels.
#[derive(Clone)]
pub struct LoopbackLink {
    inner: Arc<LinkInner>,
}

impl LoopbackLink {
    /// Create a link with the default message capacity. The companion starts
    /// out not activated.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a link whose message channels buffer `capacity` messages.
    pub fn with_capacity(capacity: usize) -> Self {
        let (connectivity, _) = watch::channel(ConnectivityState::default());
        Self {
            inner: Arc::new(LinkInner {
                to_phone: Direction::new(capacity),
                to_companion: Direction::new(capacity),
                connectivity,
            }),
        }
    }

    pub fn endpoint(&self, side: Side) -> LoopbackEndpoint {
        LoopbackEndpoint {
            inner: Arc::clone(&self.inner),
            side,
        }
    }

    pub fn phone(&self) -> LoopbackEndpoint {
        self.endpoint(Side::Phone)
    }

    pub fn companion(&self) -> LoopbackEndpoint {
        self.endpoint(Side::Companion)
    }

    /// Change the companion's activation state and notify subscribers.
    pub fn set_connectivity(&self, state: ConnectivityState) {
        self.inner.connectivity.send_replace(state);
    }

    pub fn connectivity(&self) -> ConnectivityState {
        *self.inner.connectivity.borrow()
    }

    /// Receive activation state changes.
    pub fn subscribe_connectivity(&self) -> watch::Receiver<ConnectivityState> {
        self.inner.connectivity.subscribe()
    }
}

impl Default for LoopbackLink {
    fn default() -> Self {
        Self::new()
    }
}

/// One side of a [`LoopbackLink`].
#[derive(Clone)]
pub struct LoopbackEndpoint {
    inner: Arc<LinkInner>,
    side: Side,
}

impl LoopbackEndpoint {
    pub fn side(&self) -> Side {
        self.side
    }

    fn outbound(&self) -> &Direction {
        self.inner.toward(self.side.peer())
    }

    fn inbound(&self) -> &Direction {
        self.inner.toward(self.side)
    }

    /// Subscribe to one-way messages sent by the peer.
    ///
    /// Messages sent before subscribing are not delivered.
    pub fn subscribe_messages(&self) -> broadcast::Receiver<Value> {
        self.inbound().messages.subscribe()
    }

    /// Watch the application context replicated by the peer.
    pub fn application_context(&self) -> watch::Receiver<Option<Value>> {
        self.inbound().context.subscribe()
    }

    /// The latest context replicated by the peer, if any.
    pub fn latest_context(&self) -> Option<Value> {
        self.inbound().context.borrow().clone()
    }
}

impl Transport for LoopbackEndpoint {
    fn update_application_context(&self, context: &Value) -> Result<(), TransportError> {
        let state = *self.inner.connectivity.borrow();
        if state != ConnectivityState::Activated {
            return Err(TransportError::NotActivated(state));
        }

        self.outbound().context.send_replace(Some(context.clone()));
        Ok(())
    }

    fn send_message(
        &self,
        message: &Value,
        reply: Option<ReplyHandler>,
    ) -> Result<(), TransportError> {
        // Loopback peers never answer.
        drop(reply);

        self.outbound()
            .messages
            .send(message.clone())
            .map(|_| ())
            .map_err(|_| TransportError::Unreachable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn activated_link() -> LoopbackLink {
        let link = LoopbackLink::new();
        link.set_connectivity(ConnectivityState::Activated);
        link
    }

    mod side {
        use super::*;

        #[test]
        fn peer_flips() {
            assert_eq!(Side::Phone.peer(), Side::Companion);
            assert_eq!(Side::Companion.peer(), Side::Phone);
        }
    }

    mod application_context {
        use super::*;

        #[test]
        fn starts_empty() {
            let link = activated_link();
            assert!(link.companion().latest_context().is_none());
        }

        #[test]
        fn replicates_to_peer_only() {
            let link = activated_link();
            link.phone()
                .update_application_context(&json!({"conferenceURL": "https://x/a"}))
                .unwrap();

            assert_eq!(
                link.companion().latest_context(),
                Some(json!({"conferenceURL": "https://x/a"}))
            );
            assert!(link.phone().latest_context().is_none());
        }

        #[test]
        fn last_write_wins() {
            let link = activated_link();
            let phone = link.phone();
            let mut rx = link.companion().application_context();

            phone.update_application_context(&json!({"n": 1})).unwrap();
            phone.update_application_context(&json!({"n": 2})).unwrap();
            phone.update_application_context(&json!({"n": 3})).unwrap();

            assert!(rx.has_changed().unwrap());
            assert_eq!(*rx.borrow_and_update(), Some(json!({"n": 3})));
            assert!(!rx.has_changed().unwrap());
        }

        #[test]
        fn fails_when_not_activated() {
            let link = LoopbackLink::new();
            let result = link.phone().update_application_context(&json!({}));

            assert!(matches!(
                result,
                Err(TransportError::NotActivated(ConnectivityState::NotActivated))
            ));
            assert!(link.companion().latest_context().is_none());
        }

        #[test]
        fn fails_when_inactive() {
            let link = LoopbackLink::new();
            link.set_connectivity(ConnectivityState::Inactive);
            let result = link.phone().update_application_context(&json!({}));
            assert!(matches!(
                result,
                Err(TransportError::NotActivated(ConnectivityState::Inactive))
            ));
        }
    }

    mod messages {
        use super::*;

        #[test]
        fn unreachable_without_subscriber() {
            let link = activated_link();
            let result = link.companion().send_message(&json!({"command": "hangup"}), None);
            assert!(matches!(result, Err(TransportError::Unreachable)));
        }

        #[tokio::test]
        async fn message_reaches_peer() {
            let link = activated_link();
            let mut rx = link.phone().subscribe_messages();

            link.companion()
                .send_message(&json!({"command": "hangup", "sessionID": 1}), None)
                .unwrap();

            let msg = rx.recv().await.unwrap();
            assert_eq!(msg["command"], "hangup");
        }

        #[test]
        fn message_does_not_echo_to_sender() {
            let link = activated_link();
            let mut own = link.companion().subscribe_messages();
            let _peer = link.phone().subscribe_messages();

            link.companion().send_message(&json!({"x": 1}), None).unwrap();
            assert!(own.try_recv().is_err());
        }

        #[test]
        fn late_subscriber_misses_old_messages() {
            let link = activated_link();
            let mut early = link.phone().subscribe_messages();

            link.companion().send_message(&json!({"n": 1}), None).unwrap();
            let mut late = link.phone().subscribe_messages();
            link.companion().send_message(&json!({"n": 2}), None).unwrap();

            assert_eq!(early.try_recv().unwrap()["n"], 1);
            assert_eq!(early.try_recv().unwrap()["n"], 2);
            assert_eq!(late.try_recv().unwrap()["n"], 2);
        }

        #[test]
        fn reply_handler_is_never_called() {
            let link = activated_link();
            let _rx = link.phone().subscribe_messages();
            let handler: ReplyHandler = Box::new(|_| panic!("loopback never replies"));
            link.companion().send_message(&json!({}), Some(handler)).unwrap();
        }

        #[test]
        fn slow_subscriber_lags() {
            let link = LoopbackLink::with_capacity(2);
            let mut rx = link.phone().subscribe_messages();
            let watch = link.companion();

            for n in 0..4 {
                watch.send_message(&json!({"n": n}), None).unwrap();
            }

            assert!(matches!(
                rx.try_recv(),
                Err(broadcast::error::TryRecvError::Lagged(_))
            ));
        }
    }

    mod connectivity {
        use super::*;

        #[test]
        fn subscribers_see_changes() {
            let link = LoopbackLink::new();
            let mut rx = link.subscribe_connectivity();
            assert_eq!(*rx.borrow(), ConnectivityState::NotActivated);

            link.set_connectivity(ConnectivityState::Activated);
            assert!(rx.has_changed().unwrap());
            assert_eq!(*rx.borrow_and_update(), ConnectivityState::Activated);
            assert_eq!(link.connectivity(), ConnectivityState::Activated);
        }

        #[test]
        fn clones_share_channels() {
            let link = LoopbackLink::new();
            let clone = link.clone();
            clone.set_connectivity(ConnectivityState::Activated);
            assert_eq!(link.connectivity(), ConnectivityState::Activated);
        }
    }
}
