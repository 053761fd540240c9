//! PhoneRelay - keeps the watch's view of the call in sync and applies its
//! commands.
//!
//! The relay is the single owner of [`RelayState`]. Call-state notifications
//! from the phone application flow in through the `on_*` methods, each of
//! which republishes the context. Commands from the watch are only applied
//! when they carry the current session id; anything older is logged and
//! dropped.
//!
//! No method here returns an error. Transport and parsing failures are logged
//! and the next state change republishes the full context anyway.

use serde_json::Value;
use tokio::sync::mpsc;

use crate::clock::{Clock, SystemClock};
use crate::command::{message_session_id, Command};
use crate::config::RelayConfig;
use crate::context::{most_recent_first, CallContext, ConferenceUrl, RecentMeeting};
use crate::session::{SessionId, SessionMinter};
use crate::transport::{ConnectivityState, Transport, TransportError};

/// A local state change the relay asks the phone application to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostAction {
    /// Leave the current conference.
    Leave,

    /// Navigate to a conference URL.
    Navigate(String),

    /// Mute or unmute the microphone, creating the audio track if needed.
    SetAudioMuted { muted: bool, ensure_track: bool },
}

/// Where host actions go.
pub trait HostDispatch {
    fn dispatch(&mut self, action: HostAction);
}

impl HostDispatch for Vec<HostAction> {
    fn dispatch(&mut self, action: HostAction) {
        self.push(action);
    }
}

impl HostDispatch for mpsc::UnboundedSender<HostAction> {
    fn dispatch(&mut self, action: HostAction) {
        if let Err(e) = self.send(action) {
            log::warn!("Host is gone, dropping action: {:?}", e.0);
        }
    }
}

/// Call state owned by the relay.
#[derive(Debug, Clone, Default)]
pub struct RelayState {
    context: CallContext,
    minter: SessionMinter,
}

impl RelayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a previously published context, e.g. after a restart.
    /// Minted ids stay ahead of the restored session.
    pub fn from_context(context: CallContext) -> Self {
        let mut minter = SessionMinter::new();
        if let Some(id) = context.session_id {
            minter.mint(id.as_millis());
        }
        Self { context, minter }
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }
}

/// Phone-side half of the link.
pub struct PhoneRelay<T, H, C = SystemClock> {
    config: RelayConfig,
    state: RelayState,
    transport: T,
    host: H,
    clock: C,
}

impl<T: Transport, H: HostDispatch> PhoneRelay<T, H, SystemClock> {
    /// Create a relay using the system clock.
    pub fn new(config: RelayConfig, state: RelayState, transport: T, host: H) -> Self {
        Self::with_clock(config, state, transport, host, SystemClock)
    }
}

impl<T: Transport, H: HostDispatch, C: Clock> PhoneRelay<T, H, C> {
    pub fn with_clock(
        config: RelayConfig,
        state: RelayState,
        transport: T,
        host: H,
        clock: C,
    ) -> Self {
        Self {
            config,
            state,
            transport,
            host,
            clock,
        }
    }

    pub fn context(&self) -> &CallContext {
        &self.state.context
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.state.context.session_id
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    // ------------------------------------------------------------------
    // Phone-side state notifications
    // ------------------------------------------------------------------

    /// The phone joined `url`. Starts the watch timer from now, unless `url`
    /// normalizes to no conference.
    ///
    /// A session is minted only if `url` differs from the current conference,
    /// so a join that follows its own URL change keeps that session.
    pub fn on_conference_joined(&mut self, url: &str) {
        let url = ConferenceUrl::parse(url);
        let active = url.is_active();
        self.apply_conference_url(url);
        if active {
            self.state.context.conference_timestamp = Some(self.clock.now_millis());
        }
        self.publish_context();
    }

    /// The current conference URL changed (including to or from none).
    pub fn on_conference_url_changed(&mut self, url: &str) {
        if self.apply_conference_url(ConferenceUrl::parse(url)) {
            self.publish_context();
        }
    }

    pub fn on_mute_changed(&mut self, muted: bool) {
        if self.state.context.mic_muted == Some(muted) {
            return;
        }
        self.state.context.mic_muted = Some(muted);
        self.publish_context();
    }

    /// `list` is the phone's recent-meetings list, oldest first.
    pub fn on_recent_list_changed(&mut self, list: &[RecentMeeting]) {
        self.state.context.recent_urls = most_recent_first(list, self.config.max_recent_urls);
        self.publish_context();
    }

    /// The companion app's activation state changed.
    pub fn on_connectivity_changed(&mut self, state: ConnectivityState) {
        log::debug!("Companion connectivity: {state}");
        if state == ConnectivityState::Activated && self.config.publish_on_activation {
            self.publish_context();
        }
    }

    /// A transport subscription reported an error instead of a value.
    pub fn on_transport_error(&mut self, error: &TransportError) {
        log::error!("Companion transport error: {error}");
    }

    /// Set the conference URL, minting a new session if it changed.
    /// Returns whether anything changed.
    fn apply_conference_url(&mut self, url: ConferenceUrl) -> bool {
        if url == self.state.context.conference_url && self.state.context.session_id.is_some() {
            return false;
        }

        let session_id = self.state.minter.mint(self.clock.now_millis());
        log::debug!("Conference URL {url}, new session {session_id}");

        if !url.is_active() {
            self.state.context.conference_timestamp = Some(0);
        }
        self.state.context.conference_url = url;
        self.state.context.session_id = Some(session_id);
        true
    }

    // ------------------------------------------------------------------
    // Watch commands
    // ------------------------------------------------------------------

    /// Handle a message from the watch.
    pub fn on_command_received(&mut self, message: &Value) {
        let current = self.state.context.session_id;
        let session_id = message_session_id(message);

        if session_id.is_none() || session_id != current {
            log::warn!(
                "Ignoring outdated watch command: {} sessionID: {} current session ID: {}",
                message.get("command").unwrap_or(&Value::Null),
                session_id.map_or_else(|| "none".to_string(), |id| id.to_string()),
                current.map_or_else(|| "none".to_string(), |id| id.to_string()),
            );
            return;
        }

        let command = match Command::from_message(message) {
            Ok(command) => command,
            Err(e) => {
                log::debug!("Ignoring watch message: {e}");
                return;
            }
        };

        match command {
            Command::Hangup => {
                if self.state.context.conference_url.is_active() {
                    self.host.dispatch(HostAction::Leave);
                }
            }
            Command::SetMuted { muted } => {
                self.host.dispatch(HostAction::SetAudioMuted {
                    muted,
                    ensure_track: true,
                });
            }
            Command::JoinConference { url } => {
                if self.state.context.conference_url.as_str() != Some(url.as_str()) {
                    self.host.dispatch(HostAction::Navigate(url));
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Publishing
    // ------------------------------------------------------------------

    /// Send the current context to the watch. Failures are logged only.
    pub fn publish_context(&self) {
        if let Err(e) = self.try_publish() {
            log::error!("Failed to stringify or send the context: {e}");
        }
    }

    fn try_publish(&self) -> Result<(), TransportError> {
        let value = serde_json::to_value(&self.state.context)?;
        self.transport.update_application_context(&value)
    }
}
