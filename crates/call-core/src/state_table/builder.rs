//! Builder for state tables
//!
//! [`StateTableBuilder::default_table`] encodes the complete call lifecycle.
//! Custom tables can be assembled from the same helpers in tests.

use std::time::Duration;

use super::types::{Action, CallState, StateEntry, StateKey, StateTable, Transition};
use crate::events::EventKind;
use crate::guards::Guard;
use crate::tasks::TaskKind;

/// Incrementally assembles a [`StateTable`]
pub struct StateTableBuilder {
    table: StateTable,
}

impl StateTableBuilder {
    pub fn new() -> Self {
        Self {
            table: StateTable::new(),
        }
    }

    pub fn add_transition(
        &mut self,
        state: CallState,
        event: EventKind,
        transition: Transition,
    ) -> &mut Self {
        self.table.insert(StateKey::new(state, event), transition);
        self
    }

    /// Plain state change without guards or actions
    pub fn add_state_change(
        &mut self,
        from: CallState,
        event: EventKind,
        to: CallState,
    ) -> &mut Self {
        self.add_transition(from, event, Transition::to(to))
    }

    /// Transition that lands in idle and clears the context
    pub fn add_reset(&mut self, from: CallState, event: EventKind) -> &mut Self {
        self.add_transition(
            from,
            event,
            Transition::to(CallState::Idle).with_action(Action::ResetContext),
        )
    }

    pub fn add_always(&mut self, from: CallState, guard: Guard, to: CallState) -> &mut Self {
        self.table.insert_always(from, Transition::to(to).guarded(guard));
        self
    }

    pub fn add_always_transition(&mut self, from: CallState, transition: Transition) -> &mut Self {
        self.table.insert_always(from, transition);
        self
    }

    pub fn invoke(&mut self, state: CallState, task: TaskKind) -> &mut Self {
        let mut entry = self.table.entry(state).cloned().unwrap_or_default();
        entry.invoke = Some(task);
        self.table.set_entry(state, entry);
        self
    }

    pub fn after(&mut self, state: CallState, delay: Duration) -> &mut Self {
        let mut entry = self.table.entry(state).cloned().unwrap_or_default();
        entry.after = Some(delay);
        self.table.set_entry(state, entry);
        self
    }

    pub fn build(self) -> StateTable {
        self.table
    }

    /// The call lifecycle table
    pub fn default_table(failed_to_connect_timeout: Duration) -> StateTable {
        let mut b = Self::new();

        // idle
        b.add_transition(
            CallState::Idle,
            EventKind::Connect,
            Transition::to(CallState::InitiatingCall).guarded(Guard::HasReceivers),
        );
        b.add_transition(
            CallState::Idle,
            EventKind::IncomingCall,
            Transition::to(CallState::Incoming).with_action(Action::StoreInitiator),
        );

        // initiating_call
        b.invoke(CallState::InitiatingCall, TaskKind::CreateCall);
        b.add_transition(
            CallState::InitiatingCall,
            EventKind::TaskDone,
            Transition::to(CallState::CallCreated).with_action(Action::StoreCreatedCall),
        );
        b.add_state_change(
            CallState::InitiatingCall,
            EventKind::TaskFailed,
            CallState::FailedToConnect,
        );

        // call_created
        b.add_always(CallState::CallCreated, Guard::HasParticipants, CallState::Calling);
        b.add_transition(
            CallState::CallCreated,
            EventKind::AddParticipant,
            Transition::internal(vec![Action::AppendParticipants]),
        );
        b.add_state_change(
            CallState::CallCreated,
            EventKind::Disconnect,
            CallState::Disconnecting,
        );

        // calling
        b.add_always(CallState::Calling, Guard::AnyParticipantOnline, CallState::Ringing);
        b.add_transition(
            CallState::Calling,
            EventKind::UpdateParticipant,
            Transition::internal(vec![Action::ReplaceParticipants]),
        );
        b.add_state_change(CallState::Calling, EventKind::Disconnect, CallState::Disconnecting);

        // ringing
        b.add_always(
            CallState::Ringing,
            Guard::AnyParticipantConnected,
            CallState::Connected,
        );
        b.add_state_change(CallState::Ringing, EventKind::Answer, CallState::Connected);
        b.add_transition(
            CallState::Ringing,
            EventKind::UpdateParticipant,
            Transition::internal(vec![Action::ReplaceParticipants]),
        );
        b.add_state_change(CallState::Ringing, EventKind::Disconnect, CallState::Disconnecting);

        // incoming
        b.add_state_change(CallState::Incoming, EventKind::Answer, CallState::Joining);
        b.add_state_change(CallState::Incoming, EventKind::Reject, CallState::Disconnecting);

        // joining
        b.invoke(CallState::Joining, TaskKind::JoinCall);
        b.add_transition(
            CallState::Joining,
            EventKind::TaskDone,
            Transition::to(CallState::Connected).with_action(Action::StoreJoinedCall),
        );
        b.add_state_change(CallState::Joining, EventKind::TaskFailed, CallState::FailedToConnect);

        // connected
        b.add_transition(
            CallState::Connected,
            EventKind::UpdateParticipant,
            Transition::internal(vec![Action::ReplaceParticipants]),
        );
        b.add_state_change(
            CallState::Connected,
            EventKind::Disconnect,
            CallState::Disconnecting,
        );

        // disconnecting
        b.invoke(CallState::Disconnecting, TaskKind::EndCall);
        b.add_always_transition(
            CallState::Disconnecting,
            Transition::to(CallState::Idle)
                .guarded(Guard::CallIdAbsent)
                .with_action(Action::ResetContext),
        );
        b.add_reset(CallState::Disconnecting, EventKind::TaskDone);
        b.add_reset(CallState::Disconnecting, EventKind::TaskFailed);

        // failed_to_connect
        b.after(CallState::FailedToConnect, failed_to_connect_timeout);
        b.add_reset(CallState::FailedToConnect, EventKind::Timeout);
        b.add_reset(CallState::FailedToConnect, EventKind::Disconnect);

        b.build()
    }
}
