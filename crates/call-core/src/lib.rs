//! # Call-Core - Call lifecycle state machine for CallSync
//!
//! A single-call state machine that reconciles the local user's intents
//! (connect, answer, reject, disconnect) with participant updates pushed by
//! a shared call registry, and drives the registry through three async
//! tasks (create, join and end call).
//!
//! ## Layers
//!
//! - [`state_table`] - the declarative transition table and its builder
//! - [`machine`] - the synchronous executor applying events to a context
//! - [`actor`] - a tokio task owning a machine, running tasks and timers
//! - [`feed`] - adapters turning registry pushes into machine events
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use callsync_call_core::{CallActor, CallState, MachineConfig};
//!
//! let handle = CallActor::spawn(Arc::new(registry), MachineConfig::default())?;
//! handle.connect(["u2"]).await?;
//! handle.wait_for_state(CallState::CallCreated, Duration::from_secs(5)).await?;
//! ```

pub mod actor;
pub mod config;
pub mod error;
pub mod events;
pub mod feed;
pub mod guards;
pub mod logging;
pub mod machine;
pub mod merger;
pub mod state_table;
pub mod tasks;
pub mod types;

pub use actor::{CallActor, CallHandle};
pub use config::MachineConfig;
pub use error::{CallError, CallResult, RegistryError, RegistryResult, TaskError};
pub use events::{CallEvent, EventKind};
pub use feed::{IncomingCallDetector, ParticipantFeed};
pub use guards::Guard;
pub use logging::{setup_logging, LoggingConfig};
pub use machine::{CallMachine, Effect, ProcessOutcome};
pub use merger::MergePolicy;
pub use state_table::{CallState, StateTable, StateTableBuilder};
pub use tasks::{CallRegistry, LeaveOutcome, TaskInput, TaskKind, TaskOutput};
pub use types::{
    CallContext, CallId, CallSnapshot, CallStatus, CallType, MachineSnapshot, ParticipantId,
    ParticipantRole, ParticipantStatus, ParticipantView, PresenceStatus, UserId, UserPresence, UserRef,
};
