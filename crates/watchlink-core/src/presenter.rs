//! Companion-side presenter.
//!
//! Turns context snapshots from the phone into a [`PresenterView`] and user
//! taps into command messages. Commands are stamped with the session id the
//! phone last sent; without one, nothing is sent.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::command::Command;
use crate::context::{CallContext, ConferenceUrl, RecentMeeting};
use crate::transport::Transport;

/// State of the elapsed-time counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum TimerState {
    #[default]
    Stopped,
    #[serde(rename_all = "camelCase")]
    Running { since_millis: i64 },
}

impl TimerState {
    /// Time on the counter at `now_millis`, or `None` if stopped.
    pub fn elapsed(&self, now_millis: i64) -> Option<Duration> {
        match self {
            TimerState::Stopped => None,
            TimerState::Running { since_millis } => {
                let ms = now_millis.saturating_sub(*since_millis).max(0);
                Some(Duration::from_millis(ms as u64))
            }
        }
    }
}

/// What the in-call screen shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenterView {
    /// Last path segment of the conference URL; empty without a conference.
    pub room_name: String,
    pub timer: TimerState,
    /// `None` until the phone reports a mute state.
    pub muted: Option<bool>,
    pub recents: Vec<RecentMeeting>,
}

/// Watch-side half of the link.
pub struct CompanionPresenter<T> {
    transport: T,
    context: CallContext,
    view: PresenterView,
}

impl<T: Transport> CompanionPresenter<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            context: CallContext::default(),
            view: PresenterView::default(),
        }
    }

    pub fn view(&self) -> &PresenterView {
        &self.view
    }

    /// The last steady-state context received (never holds a join request).
    pub fn context(&self) -> &CallContext {
        &self.context
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Handle a raw context value from the transport.
    pub fn on_context_value(&mut self, value: &Value) {
        match serde_json::from_value::<CallContext>(value.clone()) {
            Ok(ctx) => self.on_context_received(ctx),
            Err(e) => log::warn!("Ignoring unreadable context: {e}"),
        }
    }

    pub fn on_context_received(&mut self, mut ctx: CallContext) {
        let join_url = ctx.join_conference_url.take();
        let mut conference_url = ctx.conference_url.clone();
        self.context = ctx;

        if let Some(url) = join_url {
            self.send(Command::JoinConference { url: url.clone() });
            conference_url = ConferenceUrl::parse(&url);
        }

        self.view.room_name = conference_url.room_name().to_string();

        self.view.timer = match self.context.timer_anchor() {
            Some(since_millis) => {
                log::debug!("Timer started at {since_millis}");
                TimerState::Running { since_millis }
            }
            None => TimerState::Stopped,
        };

        if let Some(muted) = self.context.mic_muted {
            self.view.muted = Some(muted);
        }

        self.view.recents = self.context.recent_urls.clone();
    }

    pub fn on_hangup_tapped(&mut self) {
        self.send(Command::Hangup);
    }

    /// Flip the mute state optimistically once the request is sent; the
    /// phone's next context confirms or corrects it. Does nothing until a
    /// mute state is known.
    pub fn on_mute_tapped(&mut self) {
        let Some(current) = self.context.mic_muted else {
            log::debug!("Mute state unknown, ignoring tap");
            return;
        };

        let muted = !current;
        if !self.send(Command::SetMuted { muted }) {
            return;
        }
        self.context.mic_muted = Some(muted);
        self.view.muted = Some(muted);
    }

    /// The user picked an entry on the recents screen. Re-renders with a
    /// one-shot join request, which is echoed to the phone.
    pub fn on_recent_selected(&mut self, index: usize) {
        let Some(meeting) = self.context.recent_urls.get(index) else {
            log::debug!("No recent meeting at index {index}");
            return;
        };

        let ctx = CallContext {
            join_conference_url: Some(meeting.conference.clone()),
            ..self.context.clone()
        };
        self.on_context_received(ctx);
    }

    /// Returns whether the message was handed to the transport.
    fn send(&self, command: Command) -> bool {
        let Some(session_id) = self.context.session_id else {
            log::debug!("No session yet, not sending {}", command.name());
            return false;
        };

        let message = command.to_message(session_id);
        match self.transport.send_message(&message, None) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to send {} to phone: {e}", command.name());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionId;
    use crate::transport::testing::RecordingTransport;
    use serde_json::json;

    fn presenter() -> (CompanionPresenter<RecordingTransport>, RecordingTransport) {
        let transport = RecordingTransport::new();
        (CompanionPresenter::new(transport.clone()), transport)
    }

    fn in_call(url: &str, session: i64) -> CallContext {
        CallContext {
            conference_url: ConferenceUrl::parse(url),
            session_id: Some(SessionId(session)),
            conference_timestamp: Some(1_000),
            mic_muted: Some(false),
            ..CallContext::default()
        }
    }

    mod rendering {
        use super::*;

        #[test]
        fn room_name_and_timer() {
            let (mut p, _) = presenter();
            p.on_context_received(in_call("https://x/room1", 5));

            assert_eq!(p.view().room_name, "room1");
            assert_eq!(p.view().timer, TimerState::Running { since_millis: 1_000 });
            assert_eq!(p.view().muted, Some(false));
        }

        #[test]
        fn no_conference_shows_empty_name() {
            let (mut p, _) = presenter();
            p.on_context_value(&json!({"conferenceURL": "NULL", "sessionID": 3}));
            assert_eq!(p.view().room_name, "");
        }

        #[test]
        fn zero_or_missing_timestamp_stops_timer() {
            let (mut p, _) = presenter();
            p.on_context_received(in_call("https://x/a", 1));
            assert!(matches!(p.view().timer, TimerState::Running { .. }));

            let mut ctx = in_call("https://x/a", 1);
            ctx.conference_timestamp = Some(0);
            p.on_context_received(ctx);
            assert_eq!(p.view().timer, TimerState::Stopped);

            p.on_context_received(in_call("https://x/a", 1));
            let mut ctx = in_call("https://x/a", 1);
            ctx.conference_timestamp = None;
            p.on_context_received(ctx);
            assert_eq!(p.view().timer, TimerState::Stopped);
        }

        #[test]
        fn absent_mute_keeps_indicator() {
            let (mut p, _) = presenter();
            let mut ctx = in_call("https://x/a", 1);
            ctx.mic_muted = Some(true);
            p.on_context_received(ctx);

            let mut ctx = in_call("https://x/a", 1);
            ctx.mic_muted = None;
            p.on_context_received(ctx);
            assert_eq!(p.view().muted, Some(true));
        }

        #[test]
        fn recents_are_mirrored() {
            let (mut p, _) = presenter();
            let mut ctx = in_call("https://x/a", 1);
            ctx.recent_urls = vec![RecentMeeting::new("https://x/b", 2, 3)];
            p.on_context_received(ctx);
            assert_eq!(p.view().recents.len(), 1);
        }

        #[test]
        fn unreadable_context_is_ignored() {
            let (mut p, _) = presenter();
            p.on_context_received(in_call("https://x/a", 1));
            p.on_context_value(&json!({"sessionID": "not a number"}));
            assert_eq!(p.view().room_name, "a");
        }

        #[test]
        fn timer_elapsed() {
            let running = TimerState::Running { since_millis: 1_000 };
            assert_eq!(running.elapsed(4_500), Some(Duration::from_millis(3_500)));
            assert_eq!(running.elapsed(500), Some(Duration::ZERO));
            assert_eq!(TimerState::Stopped.elapsed(4_500), None);
        }

        #[test]
        fn view_serializes_camel_case() {
            let (mut p, _) = presenter();
            p.on_context_received(in_call("https://x/room1", 5));
            let value = serde_json::to_value(p.view()).unwrap();
            assert_eq!(value["roomName"], "room1");
            assert_eq!(value["timer"]["state"], "running");
            assert_eq!(value["timer"]["sinceMillis"], 1_000);
        }
    }

    mod taps {
        use super::*;

        #[test]
        fn hangup_carries_last_session() {
            let (mut p, transport) = presenter();
            p.on_context_received(in_call("https://x/a", 42));
            p.on_hangup_tapped();

            assert_eq!(
                transport.messages(),
                vec![json!({"command": "hangup", "sessionID": 42})]
            );
        }

        #[test]
        fn nothing_sent_without_session() {
            let (mut p, transport) = presenter();
            p.on_context_value(&json!({"conferenceURL": "https://x/a", "micMuted": false}));
            p.on_hangup_tapped();
            p.on_mute_tapped();
            assert!(transport.messages().is_empty());
        }

        #[test]
        fn mute_tap_flips_optimistically() {
            let (mut p, transport) = presenter();
            p.on_context_received(in_call("https://x/a", 7));

            p.on_mute_tapped();
            assert_eq!(p.view().muted, Some(true));
            assert_eq!(
                transport.messages(),
                vec![json!({"command": "setMuted", "muted": "true", "sessionID": 7})]
            );

            p.on_mute_tapped();
            assert_eq!(p.view().muted, Some(false));
            assert_eq!(transport.messages()[1]["muted"], "false");
        }

        #[test]
        fn mute_tap_without_known_state_does_nothing() {
            let (mut p, transport) = presenter();
            let mut ctx = in_call("https://x/a", 7);
            ctx.mic_muted = None;
            p.on_context_received(ctx);

            p.on_mute_tapped();
            assert!(transport.messages().is_empty());
            assert_eq!(p.view().muted, None);
        }

        #[test]
        fn send_failure_is_swallowed() {
            let (mut p, transport) = presenter();
            p.on_context_received(in_call("https://x/a", 7));
            transport.set_failing(true);
            p.on_hangup_tapped();
            p.on_mute_tapped();
            assert_eq!(p.view().muted, Some(false));
            assert_eq!(p.context().mic_muted, Some(false));
        }
    }

    mod join_requests {
        use super::*;

        #[test]
        fn join_url_is_echoed_and_labels_view() {
            let (mut p, transport) = presenter();
            let mut ctx = in_call("https://x/a", 9);
            ctx.join_conference_url = Some("https://x/b".to_string());
            p.on_context_received(ctx);

            assert_eq!(
                transport.messages(),
                vec![json!({"command": "joinConference", "data": "https://x/b", "sessionID": 9})]
            );
            assert_eq!(p.view().room_name, "b");
            assert!(p.context().join_conference_url.is_none());
        }

        #[test]
        fn selecting_recent_requests_join() {
            let (mut p, transport) = presenter();
            let mut ctx = in_call("https://x/a", 9);
            ctx.recent_urls = vec![
                RecentMeeting::new("https://x/newest", 3, 0),
                RecentMeeting::new("https://x/older", 2, 0),
            ];
            p.on_context_received(ctx);

            p.on_recent_selected(1);
            let messages = transport.messages();
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0]["command"], "joinConference");
            assert_eq!(messages[0]["data"], "https://x/older");
            assert_eq!(p.view().room_name, "older");
        }

        #[test]
        fn selecting_missing_recent_does_nothing() {
            let (mut p, transport) = presenter();
            p.on_context_received(in_call("https://x/a", 9));
            p.on_recent_selected(3);
            assert!(transport.messages().is_empty());
        }
    }
}
