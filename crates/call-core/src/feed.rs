//! Live feed adapters
//!
//! Translate registry pushes into machine events. The participant feed
//! drops the local user's own row and forwards each push as an
//! `ADD_PARTICIPANT` followed by an `UPDATE_PARTICIPANT`; the state table
//! decides which of the two the current state consumes. The incoming-call
//! detector watches the user's call list and announces calls started by
//! someone else.

use futures::{Stream, StreamExt};
use tracing::{debug, info};

use crate::actor::CallHandle;
use crate::error::CallResult;
use crate::events::CallEvent;
use crate::types::{CallSnapshot, ParticipantView, UserId, UserRef};

/// Forwards participant rows of the current call to a machine
#[derive(Debug, Clone)]
pub struct ParticipantFeed {
    local_user: UserId,
}

impl ParticipantFeed {
    pub fn new(local_user: impl Into<UserId>) -> Self {
        Self {
            local_user: local_user.into(),
        }
    }

    /// Rows belonging to other users
    pub fn filter(&self, rows: Vec<ParticipantView>) -> Vec<ParticipantView> {
        rows.into_iter().filter(|p| p.user_id != self.local_user).collect()
    }

    /// Events to send for one push, in order
    pub fn events(&self, rows: Vec<ParticipantView>) -> [CallEvent; 2] {
        let participants = self.filter(rows);
        [
            CallEvent::AddParticipant {
                participants: participants.clone(),
            },
            CallEvent::UpdateParticipant { participants },
        ]
    }

    /// Forward one push to the machine
    pub async fn publish(&self, handle: &CallHandle, rows: Vec<ParticipantView>) -> CallResult<()> {
        for event in self.events(rows) {
            handle.send(event).await?;
        }
        Ok(())
    }

    /// Forward every push until the stream ends
    pub async fn run<S>(&self, mut pushes: S, handle: &CallHandle) -> CallResult<()>
    where
        S: Stream<Item = Vec<ParticipantView>> + Unpin,
    {
        while let Some(rows) = pushes.next().await {
            debug!(rows = rows.len(), "Participant push");
            self.publish(handle, rows).await?;
        }
        Ok(())
    }
}

/// Announces calls initiated by other users
#[derive(Debug, Clone)]
pub struct IncomingCallDetector {
    local_user: UserId,
}

impl IncomingCallDetector {
    pub fn new(local_user: impl Into<UserId>) -> Self {
        Self {
            local_user: local_user.into(),
        }
    }

    /// INCOMING_CALL for the first live call someone else started
    ///
    /// The initiator is resolved from `directory`, falling back to the
    /// reference embedded in the call. Calls whose initiator cannot be
    /// resolved are not announced.
    pub fn detect(&self, calls: &[CallSnapshot], directory: &[UserRef]) -> Option<CallEvent> {
        let call = calls
            .iter()
            .find(|c| c.initiator_id != self.local_user && !c.is_ended())?;

        let initiator = directory
            .iter()
            .find(|u| u.id == call.initiator_id)
            .cloned()
            .or_else(|| call.initiator.clone())?;

        Some(CallEvent::IncomingCall {
            initiator,
            call_id: call.id.clone(),
            call: Some(call.clone()),
        })
    }

    /// Watch call lists and announce incoming calls until the stream ends
    pub async fn run<S>(&self, mut call_lists: S, directory: &[UserRef], handle: &CallHandle) -> CallResult<()>
    where
        S: Stream<Item = Vec<CallSnapshot>> + Unpin,
    {
        while let Some(calls) = call_lists.next().await {
            if let Some(event) = self.detect(&calls, directory) {
                if let CallEvent::IncomingCall { call_id, initiator, .. } = &event {
                    info!(call_id = %call_id, initiator = %initiator.id, "Incoming call");
                }
                handle.send(event).await?;
            }
        }
        Ok(())
    }
}
