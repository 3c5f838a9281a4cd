//! Call actor - runs a machine on its own task
//!
//! The actor serializes every input through one mpsc queue: events sent by
//! callers, completions of invoked tasks and timer expiries. Each processed
//! event publishes a fresh [`MachineSnapshot`] on a watch channel, so
//! observers always see a settled state.
//!
//! ```text
//! CallHandle::send ─┐
//! task completion ──┼──► queue ──► CallMachine::process ──► watch ──► observers
//! timer expiry ─────┘                    │
//!                                        └─► effects: spawn task / arm timer
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::MachineConfig;
use crate::error::{CallError, CallResult};
use crate::events::CallEvent;
use crate::machine::{CallMachine, Effect};
use crate::state_table::CallState;
use crate::tasks::{self, CallRegistry};
use crate::types::{MachineSnapshot, UserId};

enum Command {
    Event(CallEvent),
    Shutdown,
}

/// Owner of a running [`CallMachine`]
pub struct CallActor {
    machine: CallMachine,
    registry: Arc<dyn CallRegistry>,
    command_rx: mpsc::Receiver<Command>,
    /// Used to post completions; weak so dropped handles stop the actor
    command_tx: mpsc::WeakSender<Command>,
    snapshot_tx: watch::Sender<MachineSnapshot>,
    timer: Option<JoinHandle<()>>,
}

impl CallActor {
    /// Spawn a machine on the current runtime and return its handle
    pub fn spawn(registry: Arc<dyn CallRegistry>, config: MachineConfig) -> CallResult<CallHandle> {
        let (actor, handle) = Self::new(registry, config)?;
        tokio::spawn(actor.run());
        Ok(handle)
    }

    fn new(registry: Arc<dyn CallRegistry>, config: MachineConfig) -> CallResult<(Self, CallHandle)> {
        config.validate()?;

        let machine = CallMachine::with_config(&config);
        let (command_tx, command_rx) = mpsc::channel(config.event_queue_capacity);
        let (snapshot_tx, snapshot_rx) = watch::channel(machine.snapshot());

        let actor = Self {
            machine,
            registry,
            command_rx,
            command_tx: command_tx.downgrade(),
            snapshot_tx,
            timer: None,
        };
        let handle = CallHandle {
            command_tx,
            snapshot_rx,
        };
        Ok((actor, handle))
    }

    async fn run(mut self) {
        debug!("Call actor started");

        while let Some(command) = self.command_rx.recv().await {
            match command {
                Command::Event(event) => self.handle_event(event),
                Command::Shutdown => break,
            }
        }

        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        debug!(state = %self.machine.state(), "Call actor stopped");
    }

    fn handle_event(&mut self, event: CallEvent) {
        let outcome = self.machine.process(event);

        if outcome.state_entered() {
            // A pending timer belongs to the state just left
            if let Some(timer) = self.timer.take() {
                timer.abort();
            }
        }

        for effect in outcome.effects {
            self.execute_effect(effect);
        }

        if outcome.handled {
            self.snapshot_tx.send_replace(self.machine.snapshot());
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        let Some(tx) = self.command_tx.upgrade() else {
            debug!(?effect, "All handles dropped, not starting effect");
            return;
        };

        match effect {
            Effect::Invoke { task, epoch, input } => {
                info!(%task, epoch, "Starting task");
                let registry = Arc::clone(&self.registry);
                tokio::spawn(async move {
                    let event = match tasks::run_task(registry.as_ref(), input).await {
                        Ok(output) => CallEvent::TaskDone { task, epoch, output },
                        Err(error) => {
                            error!(%task, error = %error, category = error.category(), "Task failed");
                            CallEvent::TaskFailed { task, epoch, error }
                        }
                    };
                    // The actor may have stopped meanwhile
                    let _ = tx.send(Command::Event(event)).await;
                });
            }
            Effect::ArmTimer { epoch, after } => {
                debug!(epoch, after_ms = after.as_millis() as u64, "Arming timer");
                self.timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = tx.send(Command::Event(CallEvent::Timeout { epoch })).await;
                }));
            }
        }
    }
}

/// Cloneable handle to a running call machine
#[derive(Clone)]
pub struct CallHandle {
    command_tx: mpsc::Sender<Command>,
    snapshot_rx: watch::Receiver<MachineSnapshot>,
}

impl CallHandle {
    /// Queue an event for the machine
    ///
    /// Task completions and timeouts are posted by the actor itself; sending
    /// one here fails with [`CallError::InternalEvent`].
    pub async fn send(&self, event: CallEvent) -> CallResult<()> {
        if event.is_internal() {
            warn!(event = %event.kind(), "Refusing internal event from handle");
            return Err(CallError::InternalEvent { event: event.kind() });
        }

        self.command_tx
            .send(Command::Event(event))
            .await
            .map_err(|_| CallError::MachineStopped)
    }

    pub async fn connect(
        &self,
        receiver_ids: impl IntoIterator<Item = impl Into<UserId>>,
    ) -> CallResult<()> {
        self.send(CallEvent::connect(receiver_ids)).await
    }

    pub async fn answer(&self) -> CallResult<()> {
        self.send(CallEvent::Answer).await
    }

    pub async fn reject(&self) -> CallResult<()> {
        self.send(CallEvent::Reject).await
    }

    pub async fn disconnect(&self) -> CallResult<()> {
        self.send(CallEvent::Disconnect).await
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> MachineSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn state(&self) -> CallState {
        self.snapshot_rx.borrow().state
    }

    /// Receiver notified on every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<MachineSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Wait until a published snapshot satisfies `predicate`
    pub async fn wait_for<F>(&self, mut predicate: F, timeout: Duration) -> CallResult<MachineSnapshot>
    where
        F: FnMut(&MachineSnapshot) -> bool,
    {
        let mut rx = self.snapshot_rx.clone();
        let waited = tokio::time::timeout(timeout, async {
            rx.wait_for(|s| predicate(s))
                .await
                .map(|s| (*s).clone())
                .map_err(|_| CallError::MachineStopped)
        })
        .await;

        match waited {
            Ok(result) => result,
            Err(_) => Err(CallError::WaitTimeout {
                waiting_for: "matching snapshot".to_string(),
                duration_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Wait until the machine is in `state`
    pub async fn wait_for_state(&self, state: CallState, timeout: Duration) -> CallResult<MachineSnapshot> {
        self.wait_for(|s| s.state == state, timeout)
            .await
            .map_err(|e| match e {
                CallError::WaitTimeout { duration_ms, .. } => CallError::WaitTimeout {
                    waiting_for: format!("state {}", state),
                    duration_ms,
                },
                other => other,
            })
    }

    /// Stop the actor; queued events ahead of the request are still processed
    pub async fn shutdown(&self) -> CallResult<()> {
        self.command_tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| CallError::MachineStopped)
    }

    pub fn is_running(&self) -> bool {
        !self.command_tx.is_closed()
    }
}
