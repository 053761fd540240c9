//! Simulator script format.
//!
//! One JSON object per line, tagged by `event`. Blank lines and lines
//! starting with `#` are skipped.
//!
//! ```text
//! {"event": "connectivity", "state": "activated"}
//! {"event": "join", "url": "https://meet.example.com/room1"}
//! {"event": "wait", "millis": 5000}
//! {"event": "tapMute"}
//! {"event": "tapHangup"}
//! ```

use serde::Deserialize;
use watchlink_core::{ConnectivityState, RecentMeeting};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ScriptEvent {
    // === Phone side ===
    /// Phone joins a conference.
    Join { url: String },

    /// Phone's conference URL changes without a join (e.g. still connecting).
    Navigate { url: String },

    /// Phone leaves the conference.
    Leave,

    /// Microphone muted/unmuted on the phone.
    Mute { muted: bool },

    /// Phone's recent-meetings list, oldest first.
    Recents { list: Vec<RecentMeeting> },

    /// Watch app activation state changes.
    Connectivity { state: ConnectivityState },

    // === Watch side ===
    TapHangup,
    TapMute,
    SelectRecent { index: usize },

    // === Simulator ===
    /// Advance the clock.
    Wait { millis: i64 },
}

impl ScriptEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ScriptEvent::Join { .. } => "join",
            ScriptEvent::Navigate { .. } => "navigate",
            ScriptEvent::Leave => "leave",
            ScriptEvent::Mute { .. } => "mute",
            ScriptEvent::Recents { .. } => "recents",
            ScriptEvent::Connectivity { .. } => "connectivity",
            ScriptEvent::TapHangup => "tapHangup",
            ScriptEvent::TapMute => "tapMute",
            ScriptEvent::SelectRecent { .. } => "selectRecent",
            ScriptEvent::Wait { .. } => "wait",
        }
    }
}

/// Parse one script line. `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str) -> Result<Option<ScriptEvent>, serde_json::Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(trimmed).map(Some)
}
