//! A stand-in for the phone's conferencing app.
//!
//! Applies host actions from the relay and reports the resulting state
//! changes back to it, the way the real app's state listeners would.

use watchlink_core::clock::Clock;
use watchlink_core::{HostAction, PhoneRelay, Transport};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimConference {
    pub url: Option<String>,
    pub muted: bool,
}

type Relay<T, C> = PhoneRelay<T, Vec<HostAction>, C>;

impl SimConference {
    pub fn join<T: Transport, C: Clock>(&mut self, url: &str, relay: &mut Relay<T, C>) {
        self.url = Some(url.to_string());
        relay.on_conference_joined(url);
    }

    pub fn navigate<T: Transport, C: Clock>(&mut self, url: &str, relay: &mut Relay<T, C>) {
        self.url = Some(url.to_string());
        relay.on_conference_url_changed(url);
    }

    pub fn leave<T: Transport, C: Clock>(&mut self, relay: &mut Relay<T, C>) {
        self.url = None;
        relay.on_conference_url_changed("");
    }

    pub fn set_muted<T: Transport, C: Clock>(&mut self, muted: bool, relay: &mut Relay<T, C>) {
        self.muted = muted;
        relay.on_mute_changed(muted);
    }

    /// Carry out an action the relay dispatched.
    pub fn apply<T: Transport, C: Clock>(&mut self, action: HostAction, relay: &mut Relay<T, C>) {
        log::info!("Host action: {action:?}");
        match action {
            HostAction::Leave => self.leave(relay),
            HostAction::Navigate(url) => self.join(&url, relay),
            HostAction::SetAudioMuted { muted, .. } => self.set_muted(muted, relay),
        }
    }
}
