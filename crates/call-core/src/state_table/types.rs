use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;

use crate::events::EventKind;
use crate::guards::Guard;
use crate::tasks::TaskKind;

/// The ten lifecycle states of a call on this client
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    #[default]
    Idle,
    InitiatingCall,
    CallCreated,
    Calling,
    Ringing,
    Incoming,
    Joining,
    Connected,
    Disconnecting,
    FailedToConnect,
}

impl CallState {
    pub const ALL: [CallState; 10] = [
        CallState::Idle,
        CallState::InitiatingCall,
        CallState::CallCreated,
        CallState::Calling,
        CallState::Ringing,
        CallState::Incoming,
        CallState::Joining,
        CallState::Connected,
        CallState::Disconnecting,
        CallState::FailedToConnect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CallState::Idle => "idle",
            CallState::InitiatingCall => "initiating_call",
            CallState::CallCreated => "call_created",
            CallState::Calling => "calling",
            CallState::Ringing => "ringing",
            CallState::Incoming => "incoming",
            CallState::Joining => "joining",
            CallState::Connected => "connected",
            CallState::Disconnecting => "disconnecting",
            CallState::FailedToConnect => "failed_to_connect",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, CallState::Idle)
    }

    /// States that can be torn down with DISCONNECT
    pub fn can_disconnect(&self) -> bool {
        matches!(
            self,
            CallState::CallCreated
                | CallState::Calling
                | CallState::Ringing
                | CallState::Connected
                | CallState::FailedToConnect
        )
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key for looking up transitions in the state table
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct StateKey {
    pub state: CallState,
    pub event: EventKind,
}

impl StateKey {
    pub fn new(state: CallState, event: EventKind) -> Self {
        Self { state, event }
    }
}

/// Context updates executed while taking a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    /// Record initiator and call id from INCOMING_CALL
    StoreInitiator,
    /// Record call id, call snapshot and initiator from the create-call task
    StoreCreatedCall,
    /// Record the call snapshot returned by the join-call task
    StoreJoinedCall,
    /// Append the event's participants (first discovery)
    AppendParticipants,
    /// Replace participants with the event's payload (reconciliation)
    ReplaceParticipants,
    /// Clear everything in the context
    ResetContext,
}

/// Transition definition - what happens when an event occurs in a state
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Conditions that must all hold for this transition
    pub guards: Vec<Guard>,

    /// Actions to execute, in order
    pub actions: Vec<Action>,

    /// Next state; `None` keeps the current state without re-entering it
    pub next_state: Option<CallState>,
}

impl Transition {
    pub fn to(next_state: CallState) -> Self {
        Self {
            guards: vec![],
            actions: vec![],
            next_state: Some(next_state),
        }
    }

    /// Context-only update that stays in the current state
    pub fn internal(actions: Vec<Action>) -> Self {
        Self {
            guards: vec![],
            actions,
            next_state: None,
        }
    }

    pub fn guarded(mut self, guard: Guard) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }
}

/// Work started when a state is entered and dropped when it is left
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateEntry {
    /// Single-flight task owned by the state
    pub invoke: Option<TaskKind>,
    /// Delayed TIMEOUT event armed on entry
    pub after: Option<Duration>,
}

/// State table containing all transitions of the call lifecycle
#[derive(Debug, Clone, Default)]
pub struct StateTable {
    transitions: HashMap<StateKey, Transition>,
    /// Guarded automatic transitions, checked in insertion order
    always: HashMap<CallState, Vec<Transition>>,
    entries: HashMap<CallState, StateEntry>,
}

impl StateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: StateKey, transition: Transition) {
        self.transitions.insert(key, transition);
    }

    pub fn insert_always(&mut self, state: CallState, transition: Transition) {
        self.always.entry(state).or_default().push(transition);
    }

    pub fn set_entry(&mut self, state: CallState, entry: StateEntry) {
        self.entries.insert(state, entry);
    }

    pub fn get(&self, key: &StateKey) -> Option<&Transition> {
        self.transitions.get(key)
    }

    pub fn has_transition(&self, key: &StateKey) -> bool {
        self.transitions.contains_key(key)
    }

    pub fn always(&self, state: CallState) -> &[Transition] {
        self.always.get(&state).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn entry(&self, state: CallState) -> Option<&StateEntry> {
        self.entries.get(&state)
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len() + self.always.values().map(Vec::len).sum::<usize>()
    }

    /// Events the given state reacts to
    pub fn handled_events(&self, state: CallState) -> HashSet<EventKind> {
        self.transitions
            .keys()
            .filter(|k| k.state == state)
            .map(|k| k.event)
            .collect()
    }

    fn has_exit(&self, state: CallState) -> bool {
        let keyed = self
            .transitions
            .iter()
            .any(|(k, t)| k.state == state && t.next_state.is_some_and(|n| n != state));
        let automatic = self
            .always(state)
            .iter()
            .any(|t| t.next_state.is_some_and(|n| n != state));
        keyed || automatic
    }

    /// Check the table for states that could trap the machine
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for state in CallState::ALL {
            if !self.has_exit(state) {
                errors.push(format!("State {} has no exit transitions", state));
            }

            if let Some(entry) = self.entry(state) {
                if entry.invoke.is_some() {
                    for event in [EventKind::TaskDone, EventKind::TaskFailed] {
                        if !self.has_transition(&StateKey::new(state, event)) {
                            errors.push(format!(
                                "State {} invokes a task but does not handle {}",
                                state, event
                            ));
                        }
                    }
                }
                if entry.after.is_some() && !self.has_transition(&StateKey::new(state, EventKind::Timeout)) {
                    errors.push(format!("State {} arms a timer but does not handle TIMEOUT", state));
                }
            }
        }

        for transition in self.transitions.values().chain(self.always.values().flatten()) {
            if let Some(next) = transition.next_state {
                if next.is_idle() && !transition.actions.contains(&Action::ResetContext) {
                    errors.push("Transition into idle does not reset the context".to_string());
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
