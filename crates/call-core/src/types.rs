//! Core types for call-core
//!
//! Identifiers, registry-side call and participant shapes, and the
//! machine-owned [`CallContext`]. Wire names follow the registry's JSON
//! (camelCase fields, SCREAMING_CASE enums).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::state_table::CallState;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Registry-assigned call identifier
    CallId
);
string_id!(
    /// Registry user identifier
    UserId
);
string_id!(
    /// Registry participant row identifier
    ParticipantId
);

/// Media kind requested when creating a call
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallType {
    #[default]
    Audio,
    Video,
}

/// Role of a participant within a call
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantRole {
    Host,
    Participant,
}

/// Call-level status of a participant row
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantStatus {
    Calling,
    Connected,
    Disconnected,
    Failed,
}

/// Presence of the user behind a participant row
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresenceStatus {
    Online,
    #[default]
    Offline,
}

/// Nested user presence carried on every participant row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserPresence {
    pub status: PresenceStatus,
}

/// The machine's ephemeral copy of one registry participant row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub id: ParticipantId,
    pub user_id: UserId,
    pub role: ParticipantRole,
    pub status: ParticipantStatus,
    #[serde(default)]
    pub user: UserPresence,
}

impl ParticipantView {
    /// Whether the user behind this row is currently online
    pub fn is_online(&self) -> bool {
        self.user.status == PresenceStatus::Online
    }

    /// Whether this participant has connected to the call
    pub fn is_connected(&self) -> bool {
        self.status == ParticipantStatus::Connected
    }
}

/// Reference to a registry user, used for the call initiator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl UserRef {
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            email: None,
            name: None,
        }
    }
}

/// Registry-side lifecycle of a call
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallStatus {
    #[default]
    Pending,
    Active,
    Ended,
}

/// Denormalized call payload as returned by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSnapshot {
    pub id: CallId,
    #[serde(rename = "type", default)]
    pub call_type: CallType,
    #[serde(default)]
    pub status: CallStatus,
    pub initiator_id: UserId,
    #[serde(default)]
    pub initiator: Option<UserRef>,
    #[serde(default)]
    pub participants: Vec<ParticipantView>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    /// Duration in seconds, set once the call has ended
    #[serde(default)]
    pub duration: Option<i64>,
}

impl CallSnapshot {
    pub fn is_ended(&self) -> bool {
        self.status == CallStatus::Ended
    }

    /// The initiator reference, falling back to a bare id
    pub fn initiator_ref(&self) -> UserRef {
        self.initiator
            .clone()
            .unwrap_or_else(|| UserRef::new(self.initiator_id.clone()))
    }
}

/// Single mutable record owned exclusively by the machine
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CallContext {
    pub call_id: Option<CallId>,
    pub initiator: Option<UserRef>,
    pub participants: Vec<ParticipantView>,
    pub call: Option<CallSnapshot>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything learned about the previous call
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.call_id.is_none()
            && self.initiator.is_none()
            && self.participants.is_empty()
            && self.call.is_none()
    }
}

/// Read-only view of a machine published to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineSnapshot {
    pub state: CallState,
    pub context: CallContext,
    /// Number of state entries so far
    pub epoch: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_wire_format() {
        let json = r#"{
            "id": "p1",
            "userId": "u2",
            "role": "PARTICIPANT",
            "status": "CALLING",
            "user": { "status": "ONLINE" }
        }"#;

        let participant: ParticipantView = serde_json::from_str(json).unwrap();
        assert_eq!(participant.user_id, UserId::from("u2"));
        assert_eq!(participant.role, ParticipantRole::Participant);
        assert!(participant.is_online());
        assert!(!participant.is_connected());
    }

    #[test]
    fn test_participant_without_user_is_offline() {
        let json = r#"{"id":"p1","userId":"u2","role":"HOST","status":"CONNECTED"}"#;
        let participant: ParticipantView = serde_json::from_str(json).unwrap();
        assert!(!participant.is_online());
        assert!(participant.is_connected());
    }

    #[test]
    fn test_call_snapshot_from_registry_payload() {
        let json = r#"{
            "id": "c1",
            "type": "VIDEO",
            "status": "ENDED",
            "initiatorId": "u1",
            "participants": [],
            "duration": 42
        }"#;

        let call: CallSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(call.id.as_str(), "c1");
        assert_eq!(call.call_type, CallType::Video);
        assert!(call.is_ended());
        assert_eq!(call.duration, Some(42));
        assert_eq!(call.initiator_ref().id, UserId::from("u1"));
    }

    #[test]
    fn test_context_reset() {
        let mut context = CallContext {
            call_id: Some(CallId::from("c1")),
            initiator: Some(UserRef::new("u1")),
            participants: vec![],
            call: None,
        };
        assert!(!context.is_empty());

        context.reset();
        assert!(context.is_empty());
    }
}
