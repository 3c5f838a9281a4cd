//! Synchronous state machine executor
//!
//! [`CallMachine`] owns the current state and context and applies events to
//! them one at a time. It performs no I/O: entering a state that owns a task
//! or a timer yields an [`Effect`] for the runtime to carry out, and the
//! runtime reports back with an internal event stamped with the epoch the
//! effect was issued under.
//!
//! Processing an event:
//!
//! 1. Internal events whose epoch is not the current one are discarded, as
//!    are completions of a task the current state does not invoke.
//! 2. The `(state, event)` pair is looked up; no entry means no-op.
//! 3. Guards are evaluated; a failing guard means no-op.
//! 4. Actions run in order, then the target state (if any) is entered.
//! 5. Automatic transitions of the new state are evaluated until none fires.
//! 6. Entry effects of the settled state are returned.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::actions::execute_action;
use super::history::{TransitionHistory, TransitionRecord};
use crate::config::MachineConfig;
use crate::events::{CallEvent, EventKind};
use crate::guards;
use crate::state_table::{self, CallState, StateKey, StateTable, Transition, DEFAULT_TABLE};
use crate::tasks::{TaskInput, TaskKind};
use crate::types::{CallContext, MachineSnapshot};

/// Work the runtime must start after an event has been processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Run a task and post its completion stamped with `epoch`
    Invoke {
        task: TaskKind,
        epoch: u64,
        input: TaskInput,
    },
    /// Post `TIMEOUT` stamped with `epoch` once `after` has elapsed
    ArmTimer { epoch: u64, after: Duration },
}

/// Result of processing one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub previous: CallState,
    pub current: CallState,
    /// Whether a transition was taken (including context-only ones)
    pub handled: bool,
    /// States entered, in order, including transient ones
    pub entered: Vec<CallState>,
    pub effects: Vec<Effect>,
}

impl ProcessOutcome {
    fn ignored(state: CallState) -> Self {
        Self {
            previous: state,
            current: state,
            handled: false,
            entered: vec![],
            effects: vec![],
        }
    }

    /// Whether any state was entered, re-entries included
    pub fn state_entered(&self) -> bool {
        !self.entered.is_empty()
    }
}

/// The call lifecycle machine
#[derive(Debug, Clone)]
pub struct CallMachine {
    table: Arc<StateTable>,
    state: CallState,
    context: CallContext,
    epoch: u64,
    history: TransitionHistory,
}

impl Default for CallMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl CallMachine {
    /// Machine on the default lifecycle table, in `idle`
    pub fn new() -> Self {
        Self::with_table(Arc::clone(&*DEFAULT_TABLE), MachineConfig::default().history_capacity)
    }

    pub fn with_config(config: &MachineConfig) -> Self {
        Self::with_table(
            state_table::table_for_timeout(config.failed_to_connect_timeout()),
            config.history_capacity,
        )
    }

    pub fn with_table(table: Arc<StateTable>, history_capacity: usize) -> Self {
        Self {
            table,
            state: CallState::Idle,
            context: CallContext::default(),
            epoch: 0,
            history: TransitionHistory::new(history_capacity),
        }
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }

    /// Number of state entries so far; stamps internal events
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn history(&self) -> &TransitionHistory {
        &self.history
    }

    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            state: self.state,
            context: self.context.clone(),
            epoch: self.epoch,
        }
    }

    /// Apply one event and report what happened
    pub fn process(&mut self, event: CallEvent) -> ProcessOutcome {
        let previous = self.state;
        let kind = event.kind();

        if let Some(epoch) = event.epoch() {
            if epoch != self.epoch {
                debug!(
                    state = %self.state,
                    event = %kind,
                    stale_epoch = epoch,
                    current_epoch = self.epoch,
                    "Discarding stale completion"
                );
                return ProcessOutcome::ignored(previous);
            }
        }

        if let Some(task) = event.task() {
            let owned = self.table.entry(self.state).and_then(|entry| entry.invoke);
            if owned != Some(task) {
                debug!(
                    state = %self.state,
                    %task,
                    owned = ?owned,
                    "Discarding completion of a task this state does not run"
                );
                return ProcessOutcome::ignored(previous);
            }
        }

        let key = StateKey::new(self.state, kind);
        let Some(transition) = self.table.get(&key).cloned() else {
            if kind == EventKind::IncomingCall {
                warn!(state = %self.state, "Dropping incoming call while busy");
            } else {
                debug!(state = %self.state, event = %kind, "No transition defined, ignoring");
            }
            return ProcessOutcome::ignored(previous);
        };

        if !guards::all_pass(&transition.guards, &self.context, Some(&event)) {
            debug!(state = %self.state, event = %kind, guards = ?transition.guards, "Guard rejected event");
            return ProcessOutcome::ignored(previous);
        }

        let mut entered = Vec::new();
        self.take(&transition, Some(&event), &mut entered);
        self.settle(&mut entered);

        let effects = if entered.is_empty() {
            vec![]
        } else {
            self.entry_effects(&event)
        };

        if previous != self.state {
            info!(from = %previous, to = %self.state, event = %kind, epoch = self.epoch, "Call state changed");
        }

        ProcessOutcome {
            previous,
            current: self.state,
            handled: true,
            entered,
            effects,
        }
    }

    /// Run the transition's actions and enter its target
    fn take(&mut self, transition: &Transition, event: Option<&CallEvent>, entered: &mut Vec<CallState>) {
        for action in &transition.actions {
            execute_action(*action, &mut self.context, event);
        }

        if let Some(next) = transition.next_state {
            self.enter(next, event.map(CallEvent::kind));
            entered.push(next);
        }
    }

    fn enter(&mut self, next: CallState, event: Option<EventKind>) {
        let from = self.state;
        self.state = next;
        self.epoch += 1;

        if next.is_idle() {
            self.context.reset();
        }

        self.history.push(TransitionRecord {
            from,
            to: next,
            event,
            epoch: self.epoch,
            at: Utc::now(),
        });
    }

    /// Follow automatic transitions until none applies
    fn settle(&mut self, entered: &mut Vec<CallState>) {
        for _ in 0..CallState::ALL.len() {
            let next = self
                .table
                .always(self.state)
                .iter()
                .find(|t| guards::all_pass(&t.guards, &self.context, None))
                .cloned();

            match next {
                Some(transition) => self.take(&transition, None, entered),
                None => return,
            }
        }

        warn!(state = %self.state, "Automatic transitions did not settle");
    }

    /// Entry effects of the current state
    fn entry_effects(&self, trigger: &CallEvent) -> Vec<Effect> {
        let Some(entry) = self.table.entry(self.state) else {
            return vec![];
        };

        let mut effects = Vec::new();
        if let Some(task) = entry.invoke {
            effects.push(Effect::Invoke {
                task,
                epoch: self.epoch,
                input: self.task_input(task, trigger),
            });
        }
        if let Some(after) = entry.after {
            effects.push(Effect::ArmTimer {
                epoch: self.epoch,
                after,
            });
        }
        effects
    }

    fn task_input(&self, task: TaskKind, trigger: &CallEvent) -> TaskInput {
        match task {
            TaskKind::CreateCall => match trigger {
                CallEvent::Connect {
                    receiver_ids,
                    call_type,
                } => TaskInput::CreateCall {
                    receiver_ids: receiver_ids.clone(),
                    call_type: *call_type,
                },
                other => {
                    warn!(event = %other.kind(), "Create-call entered without CONNECT, no receivers");
                    TaskInput::CreateCall {
                        receiver_ids: vec![],
                        call_type: Default::default(),
                    }
                }
            },
            TaskKind::JoinCall => TaskInput::JoinCall {
                call_id: self.context.call_id.clone(),
            },
            TaskKind::EndCall => TaskInput::EndCall {
                call_id: self.context.call_id.clone(),
            },
        }
    }
}
