//! # watchlink-core
//!
//! Mirrors a slice of call state from a phone conferencing app to a paired
//! watch, and relays the watch's commands back.
//!
//! This crate is transport-agnostic and can be used by:
//! - a native bridge over the platform's phone/watch connectivity service
//! - the `watchlink-sim` simulator (via the in-process loopback transport)
//!
//! ## Key Concepts
//!
//! - **CallContext**: The snapshot replicated to the watch (URL, mute, timer, recents)
//! - **Session**: Minted whenever the conference URL changes; fences stale commands
//! - **PhoneRelay**: Owns the context, publishes it, applies current-session commands
//! - **CompanionPresenter**: Renders the context on the watch, turns taps into commands

pub mod clock;
pub mod command;
pub mod config;
pub mod context;
pub mod presenter;
pub mod relay;
pub mod session;
pub mod trace_log;
pub mod transport;

// Re-export commonly used types
pub use command::Command;
pub use config::RelayConfig;
pub use context::{CallContext, ConferenceUrl, RecentMeeting};
pub use presenter::{CompanionPresenter, PresenterView, TimerState};
pub use relay::{HostAction, HostDispatch, PhoneRelay, RelayState};
pub use session::SessionId;
pub use transport::{ConnectivityState, Transport, TransportError};
