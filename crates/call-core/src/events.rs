//! Events accepted by the call machine
//!
//! [`CallEvent`] is the closed set of inputs: user intents from the UI,
//! signals derived from the live feed, and the internal completions posted
//! back by async tasks and timers. [`EventKind`] is its fieldless
//! discriminant, used as the state table key.

use serde::Serialize;
use std::fmt;

use crate::error::TaskError;
use crate::tasks::{TaskKind, TaskOutput};
use crate::types::{CallId, CallSnapshot, CallType, ParticipantView, UserId, UserRef};

/// Everything that can be sent to a call machine
#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    /// Start an outgoing call to the given receivers
    Connect {
        receiver_ids: Vec<UserId>,
        call_type: CallType,
    },
    /// Accept a ringing or incoming call
    Answer,
    /// Decline an incoming call
    Reject,
    /// Leave or abandon the current call
    Disconnect,
    /// Another user has started a call that includes us
    IncomingCall {
        initiator: UserRef,
        call_id: CallId,
        call: Option<CallSnapshot>,
    },
    /// First discovery of participant rows; appended to the context
    AddParticipant { participants: Vec<ParticipantView> },
    /// Full recomputation of participant rows; replaces the context copy
    UpdateParticipant { participants: Vec<ParticipantView> },

    /// An async task settled successfully
    TaskDone {
        task: TaskKind,
        epoch: u64,
        output: TaskOutput,
    },
    /// An async task failed
    TaskFailed {
        task: TaskKind,
        epoch: u64,
        error: TaskError,
    },
    /// A delayed transition armed on state entry has elapsed
    Timeout { epoch: u64 },
}

impl CallEvent {
    pub fn connect(receiver_ids: impl IntoIterator<Item = impl Into<UserId>>) -> Self {
        Self::Connect {
            receiver_ids: receiver_ids.into_iter().map(Into::into).collect(),
            call_type: CallType::Audio,
        }
    }

    pub fn incoming(initiator: UserRef, call_id: impl Into<CallId>) -> Self {
        Self::IncomingCall {
            initiator,
            call_id: call_id.into(),
            call: None,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            CallEvent::Connect { .. } => EventKind::Connect,
            CallEvent::Answer => EventKind::Answer,
            CallEvent::Reject => EventKind::Reject,
            CallEvent::Disconnect => EventKind::Disconnect,
            CallEvent::IncomingCall { .. } => EventKind::IncomingCall,
            CallEvent::AddParticipant { .. } => EventKind::AddParticipant,
            CallEvent::UpdateParticipant { .. } => EventKind::UpdateParticipant,
            CallEvent::TaskDone { .. } => EventKind::TaskDone,
            CallEvent::TaskFailed { .. } => EventKind::TaskFailed,
            CallEvent::Timeout { .. } => EventKind::Timeout,
        }
    }

    /// Epoch stamped on internal completions, `None` for external events
    pub fn epoch(&self) -> Option<u64> {
        match self {
            CallEvent::TaskDone { epoch, .. }
            | CallEvent::TaskFailed { epoch, .. }
            | CallEvent::Timeout { epoch } => Some(*epoch),
            _ => None,
        }
    }

    /// Task a completion reports on, `None` for everything else
    pub fn task(&self) -> Option<TaskKind> {
        match self {
            CallEvent::TaskDone { task, .. } | CallEvent::TaskFailed { task, .. } => Some(*task),
            _ => None,
        }
    }

    /// Internal events are produced by the runtime, never by callers
    pub fn is_internal(&self) -> bool {
        self.epoch().is_some()
    }
}

/// Fieldless discriminant of [`CallEvent`]
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize)]
pub enum EventKind {
    Connect,
    Answer,
    Reject,
    Disconnect,
    IncomingCall,
    AddParticipant,
    UpdateParticipant,
    TaskDone,
    TaskFailed,
    Timeout,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Connect => "CONNECT",
            EventKind::Answer => "ANSWER",
            EventKind::Reject => "REJECT",
            EventKind::Disconnect => "DISCONNECT",
            EventKind::IncomingCall => "INCOMING_CALL",
            EventKind::AddParticipant => "ADD_PARTICIPANT",
            EventKind::UpdateParticipant => "UPDATE_PARTICIPANT",
            EventKind::TaskDone => "TASK_DONE",
            EventKind::TaskFailed => "TASK_FAILED",
            EventKind::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
