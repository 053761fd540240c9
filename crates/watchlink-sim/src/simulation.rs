//! Phone relay, watch presenter and a simulated conference wired together
//! over the loopback link.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::watch;
use watchlink_core::clock::ManualClock;
use watchlink_core::trace_log::{TraceHandle, TracedTransport};
use watchlink_core::transport::{LoopbackEndpoint, LoopbackLink};
use watchlink_core::{
    CallContext, CompanionPresenter, ConnectivityState, HostAction, PhoneRelay, PresenterView,
    RelayConfig, RelayState, SessionId,
};

use crate::conference::SimConference;
use crate::script::ScriptEvent;

type SimTransport = TracedTransport<LoopbackEndpoint>;

/// One line of simulator output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport<'a> {
    pub step: usize,
    pub event: &'static str,
    #[serde(rename = "sessionID")]
    pub session_id: Option<SessionId>,
    pub phone: &'a CallContext,
    pub watch: &'a PresenterView,
}

pub struct Simulation {
    link: LoopbackLink,
    clock: ManualClock,
    relay: PhoneRelay<SimTransport, Vec<HostAction>, ManualClock>,
    presenter: CompanionPresenter<SimTransport>,
    conference: SimConference,
    phone_inbox: broadcast::Receiver<Value>,
    watch_context: watch::Receiver<Option<Value>>,
    connectivity: watch::Receiver<ConnectivityState>,
}

impl Simulation {
    pub fn new(config: RelayConfig, clock: ManualClock, trace: TraceHandle, activated: bool) -> Self {
        let link = LoopbackLink::new();
        if activated {
            link.set_connectivity(ConnectivityState::Activated);
        }

        let phone = TracedTransport::new(link.phone(), trace.clone(), "PHONE->WATCH");
        let companion = TracedTransport::new(link.companion(), trace, "WATCH->PHONE");

        Self {
            phone_inbox: link.phone().subscribe_messages(),
            watch_context: link.companion().application_context(),
            connectivity: link.subscribe_connectivity(),
            relay: PhoneRelay::with_clock(
                config,
                RelayState::new(),
                phone,
                Vec::new(),
                clock.clone(),
            ),
            presenter: CompanionPresenter::new(companion),
            conference: SimConference::default(),
            clock,
            link,
        }
    }

    pub fn conference(&self) -> &SimConference {
        &self.conference
    }

    pub fn presenter(&self) -> &CompanionPresenter<SimTransport> {
        &self.presenter
    }

    pub fn relay(&self) -> &PhoneRelay<SimTransport, Vec<HostAction>, ManualClock> {
        &self.relay
    }

    /// Apply one script event, then deliver everything it set in motion.
    pub fn apply(&mut self, event: &ScriptEvent) {
        match event {
            ScriptEvent::Join { url } => self.conference.join(url, &mut self.relay),
            ScriptEvent::Navigate { url } => self.conference.navigate(url, &mut self.relay),
            ScriptEvent::Leave => self.conference.leave(&mut self.relay),
            ScriptEvent::Mute { muted } => self.conference.set_muted(*muted, &mut self.relay),
            ScriptEvent::Recents { list } => self.relay.on_recent_list_changed(list),
            ScriptEvent::Connectivity { state } => self.link.set_connectivity(*state),
            ScriptEvent::TapHangup => self.presenter.on_hangup_tapped(),
            ScriptEvent::TapMute => self.presenter.on_mute_tapped(),
            ScriptEvent::SelectRecent { index } => self.presenter.on_recent_selected(*index),
            ScriptEvent::Wait { millis } => self.clock.advance(*millis),
        }
        self.pump();
    }

    /// Deliver pending connectivity changes, watch messages, host actions and
    /// contexts until nothing is left in flight.
    pub fn pump(&mut self) {
        loop {
            let mut progressed = false;

            if self.connectivity.has_changed().unwrap_or(false) {
                let state = *self.connectivity.borrow_and_update();
                self.relay.on_connectivity_changed(state);
                progressed = true;
            }

            loop {
                match self.phone_inbox.try_recv() {
                    Ok(message) => {
                        self.relay.on_command_received(&message);
                        progressed = true;
                    }
                    Err(TryRecvError::Lagged(missed)) => {
                        log::warn!("Phone missed {missed} watch messages");
                    }
                    Err(_) => break,
                }
            }

            for action in std::mem::take(self.relay.host_mut()) {
                self.conference.apply(action, &mut self.relay);
                progressed = true;
            }

            if self.watch_context.has_changed().unwrap_or(false) {
                let value = self.watch_context.borrow_and_update().clone();
                if let Some(value) = value {
                    self.presenter.on_context_value(&value);
                }
                progressed = true;
            }

            if !progressed {
                break;
            }
        }
    }

    pub fn report(&self, step: usize, event: &ScriptEvent) -> StepReport<'_> {
        StepReport {
            step,
            event: event.name(),
            session_id: self.relay.session_id(),
            phone: self.relay.context(),
            watch: self.presenter.view(),
        }
    }
}
