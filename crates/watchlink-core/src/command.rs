//! Commands sent from the watch to the phone.
//!
//! The protocol format is a flat JSON object:
//! ```text
//! {"command": "hangup", "sessionID": 1700000000000}
//! {"command": "setMuted", "muted": "true", "sessionID": 1700000000000}
//! {"command": "joinConference", "data": "https://meet.example.com/room", "sessionID": 1700000000000}
//! ```

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::session::SessionId;

pub const HANGUP: &str = "hangup";
pub const SET_MUTED: &str = "setMuted";
pub const JOIN_CONFERENCE: &str = "joinConference";

/// Wire key carrying the fencing token.
pub const SESSION_ID_KEY: &str = "sessionID";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("Message is not a JSON object")]
    NotAnObject,

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("Unknown command: {0}")]
    Unknown(String),
}

/// A request from the watch for the phone to change local call state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Leave the current conference.
    Hangup,

    /// Set the microphone mute state.
    SetMuted { muted: bool },

    /// Navigate to another conference.
    JoinConference { url: String },
}

impl Command {
    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Hangup => HANGUP,
            Command::SetMuted { .. } => SET_MUTED,
            Command::JoinConference { .. } => JOIN_CONFERENCE,
        }
    }

    /// Parse the command part of an inbound message. The session id is not
    /// looked at here.
    pub fn from_message(message: &Value) -> Result<Self, CommandError> {
        let map = message.as_object().ok_or(CommandError::NotAnObject)?;
        let name = map
            .get("command")
            .and_then(Value::as_str)
            .ok_or(CommandError::MissingField("command"))?;

        match name {
            HANGUP => Ok(Command::Hangup),
            SET_MUTED => Ok(Command::SetMuted {
                muted: parse_muted(map)?,
            }),
            JOIN_CONFERENCE => {
                let url = map
                    .get("data")
                    .and_then(Value::as_str)
                    .ok_or(CommandError::MissingField("data"))?;
                if url.is_empty() {
                    return Err(CommandError::InvalidField {
                        field: "data",
                        value: String::new(),
                    });
                }
                Ok(Command::JoinConference {
                    url: url.to_string(),
                })
            }
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }

    /// Build the outbound message for this command, stamped with `session_id`.
    pub fn to_message(&self, session_id: SessionId) -> Value {
        let mut message = json!({
            "command": self.name(),
            "sessionID": session_id,
        });

        if let Some(map) = message.as_object_mut() {
            match self {
                Command::Hangup => {}
                Command::SetMuted { muted } => {
                    map.insert("muted".into(), Value::from(if *muted { "true" } else { "false" }));
                }
                Command::JoinConference { url } => {
                    map.insert("data".into(), Value::from(url.as_str()));
                }
            }
        }

        message
    }
}

/// The watch sends `"true"`/`"false"` strings; a plain boolean is accepted too.
fn parse_muted(map: &Map<String, Value>) -> Result<bool, CommandError> {
    match map.get("muted") {
        None | Some(Value::Null) => Err(CommandError::MissingField("muted")),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) if s == "true" => Ok(true),
        Some(Value::String(s)) if s == "false" => Ok(false),
        Some(other) => Err(CommandError::InvalidField {
            field: "muted",
            value: other.to_string(),
        }),
    }
}

/// Session id carried by an inbound message, if any.
pub fn message_session_id(message: &Value) -> Option<SessionId> {
    message.get(SESSION_ID_KEY).and_then(SessionId::from_wire)
}
