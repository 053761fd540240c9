//! The call-state snapshot replicated to the companion watch.
//!
//! # Wire format
//!
//! ```text
//! {
//!   "conferenceURL": "https://meet.example.com/room1",   // or "NULL"
//!   "conferenceTimestamp": 1700000000000,                // optional
//!   "micMuted": false,                                   // optional
//!   "sessionID": 1700000000000,                          // optional until first URL
//!   "joinConferenceURL": "https://...",                  // optional, one-shot
//!   "recentURLs": [{"conference": "...", "date": 0, "duration": 0}]
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::session::SessionId;

/// Literal the watch app expects in `conferenceURL` when no conference is active.
pub const NO_CONFERENCE: &str = "NULL";

/// The active conference, or none.
///
/// Kept as an `Option` in Rust and written as the [`NO_CONFERENCE`] literal
/// on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ConferenceUrl(Option<String>);

impl ConferenceUrl {
    pub fn none() -> Self {
        Self(None)
    }

    /// Normalize a raw URL string.
    ///
    /// Empty strings, the sentinel itself, and URLs ending in `/` (a server
    /// root with no room) all mean "no conference".
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() || raw == NO_CONFERENCE || raw.ends_with('/') {
            Self(None)
        } else {
            Self(Some(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.0.is_some()
    }

    /// The string written on the wire.
    pub fn wire(&self) -> &str {
        self.0.as_deref().unwrap_or(NO_CONFERENCE)
    }

    /// Last path segment of the URL, or empty when no conference is active.
    pub fn room_name(&self) -> &str {
        match &self.0 {
            Some(url) => url.rsplit('/').next().unwrap_or(""),
            None => "",
        }
    }
}

impl std::fmt::Display for ConferenceUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire())
    }
}

impl Serialize for ConferenceUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.wire())
    }
}

impl<'de> Deserialize<'de> for ConferenceUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|s| Self::parse(&s)).unwrap_or_default())
    }
}

/// One entry of the phone's recent-meetings list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentMeeting {
    /// Conference URL.
    pub conference: String,

    /// When the meeting started (epoch millis).
    #[serde(default)]
    pub date: i64,

    /// How long the meeting lasted (millis).
    #[serde(default)]
    pub duration: i64,
}

impl RecentMeeting {
    pub fn new(conference: impl Into<String>, date: i64, duration: i64) -> Self {
        Self {
            conference: conference.into(),
            date,
            duration,
        }
    }
}

/// Keep the newest `max` entries of an oldest-first list, newest first.
pub fn most_recent_first(list: &[RecentMeeting], max: usize) -> Vec<RecentMeeting> {
    let start = list.len().saturating_sub(max);
    list[start..].iter().rev().cloned().collect()
}

/// Snapshot of call state shared with the companion device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallContext {
    #[serde(rename = "conferenceURL", default)]
    pub conference_url: ConferenceUrl,

    /// When the current conference was joined. `0` or absent: no timer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conference_timestamp: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mic_muted: Option<bool>,

    #[serde(rename = "sessionID", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,

    /// One-shot request to join a URL. Never part of steady-state sync.
    #[serde(
        rename = "joinConferenceURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub join_conference_url: Option<String>,

    /// Most recent first.
    #[serde(rename = "recentURLs", default)]
    pub recent_urls: Vec<RecentMeeting>,
}

impl CallContext {
    /// Whether the context carries a running conference timer.
    pub fn timer_anchor(&self) -> Option<i64> {
        self.conference_timestamp.filter(|ts| *ts != 0)
    }
}
