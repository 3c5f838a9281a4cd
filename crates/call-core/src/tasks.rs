//! Async task adapters
//!
//! The three asynchronous operations the machine invokes on state entry.
//! Each wraps a single exchange with the [`CallRegistry`] and translates the
//! result into a [`TaskOutput`] or a [`TaskError`]; the runtime posts that
//! back to the machine as a completion event.
//!
//! ```text
//! initiating_call ──► create_call_task ──► TaskDone / TaskFailed
//! joining         ──► join_call_task   ──► TaskDone / TaskFailed
//! disconnecting   ──► end_call_task    ──► TaskDone (failures absorbed)
//! ```

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{RegistryError, RegistryResult, TaskError};
use crate::types::{CallId, CallSnapshot, CallType, ParticipantStatus, UserId, UserRef};

/// Result of leaving a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// Call as it stands after leaving, if the registry returned it
    pub call: Option<CallSnapshot>,
    /// Whether our leave emptied the call and ended it
    pub call_ended: bool,
}

/// The external call registry, as seen from this client
///
/// Implementations attach the caller's bearer credential themselves and
/// must fail with [`RegistryError::MissingCredential`] when none is
/// available.
#[async_trait]
pub trait CallRegistry: Send + Sync {
    /// Create a call with one host row for the caller and one row per receiver
    async fn create_call(
        &self,
        receiver_ids: &[UserId],
        call_type: CallType,
    ) -> RegistryResult<CallSnapshot>;

    /// Join an existing call; idempotent for an already active row
    async fn join_call(&self, call_id: &CallId) -> RegistryResult<CallSnapshot>;

    /// Leave a call; the last leaver ends it
    async fn leave_call(&self, call_id: &CallId) -> RegistryResult<LeaveOutcome>;

    /// Update the caller's own participant status
    async fn update_participant_status(
        &self,
        call_id: &CallId,
        status: ParticipantStatus,
    ) -> RegistryResult<CallSnapshot>;
}

/// Tasks a state can invoke on entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TaskKind {
    CreateCall,
    JoinCall,
    EndCall,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::CreateCall => f.write_str("create_call"),
            TaskKind::JoinCall => f.write_str("join_call"),
            TaskKind::EndCall => f.write_str("end_call"),
        }
    }
}

/// Input captured from the machine when a task is invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskInput {
    CreateCall {
        receiver_ids: Vec<UserId>,
        call_type: CallType,
    },
    JoinCall {
        call_id: Option<CallId>,
    },
    EndCall {
        call_id: Option<CallId>,
    },
}

impl TaskInput {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskInput::CreateCall { .. } => TaskKind::CreateCall,
            TaskInput::JoinCall { .. } => TaskKind::JoinCall,
            TaskInput::EndCall { .. } => TaskKind::EndCall,
        }
    }
}

/// Successful task results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutput {
    Created {
        call_id: CallId,
        call: CallSnapshot,
        initiator: UserRef,
    },
    Joined {
        call: CallSnapshot,
    },
    Ended {
        call: Option<CallSnapshot>,
    },
}

/// Create a call and report its identity
pub async fn create_call_task(
    registry: &dyn CallRegistry,
    receiver_ids: &[UserId],
    call_type: CallType,
) -> Result<TaskOutput, TaskError> {
    debug!(receivers = receiver_ids.len(), ?call_type, "Creating call");

    let call = registry
        .create_call(receiver_ids, call_type)
        .await
        .map_err(|source| TaskError::CallCreation { source })?;

    info!(call_id = %call.id, participants = call.participants.len(), "Call created");
    Ok(TaskOutput::Created {
        call_id: call.id.clone(),
        initiator: call.initiator_ref(),
        call,
    })
}

/// Join the announced call
pub async fn join_call_task(
    registry: &dyn CallRegistry,
    call_id: Option<&CallId>,
) -> Result<TaskOutput, TaskError> {
    let call_id = call_id.ok_or_else(|| TaskError::CallJoin {
        source: RegistryError::rejected(400, "Call ID is required"),
    })?;

    let call = registry
        .join_call(call_id)
        .await
        .map_err(|source| TaskError::CallJoin { source })?;

    info!(call_id = %call_id, "Joined call");
    Ok(TaskOutput::Joined { call })
}

/// Leave the call; never fails so teardown always completes
pub async fn end_call_task(
    registry: &dyn CallRegistry,
    call_id: Option<&CallId>,
) -> Result<TaskOutput, TaskError> {
    let Some(call_id) = call_id else {
        debug!("No call to leave");
        return Ok(TaskOutput::Ended { call: None });
    };

    match registry.leave_call(call_id).await {
        Ok(outcome) => {
            info!(call_id = %call_id, call_ended = outcome.call_ended, "Left call");
            Ok(TaskOutput::Ended { call: outcome.call })
        }
        Err(source) => {
            let error = TaskError::CallEnd { source };
            warn!(
                call_id = %call_id,
                error = %error,
                category = error.category(),
                "Failed to leave call, continuing with local cleanup"
            );
            Ok(TaskOutput::Ended { call: None })
        }
    }
}

/// Run the task described by `input`
pub async fn run_task(registry: &dyn CallRegistry, input: TaskInput) -> Result<TaskOutput, TaskError> {
    debug!(task = %input.kind(), "Running task");
    match input {
        TaskInput::CreateCall {
            receiver_ids,
            call_type,
        } => create_call_task(registry, &receiver_ids, call_type).await,
        TaskInput::JoinCall { call_id } => join_call_task(registry, call_id.as_ref()).await,
        TaskInput::EndCall { call_id } => end_call_task(registry, call_id.as_ref()).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    /// Registry stub returning canned results and recording calls
    struct StubRegistry {
        create: RegistryResult<CallSnapshot>,
        join: RegistryResult<CallSnapshot>,
        leave: RegistryResult<LeaveOutcome>,
        calls: Mutex<Vec<String>>,
    }

    fn snapshot(id: &str) -> CallSnapshot {
        CallSnapshot {
            id: CallId::from(id),
            call_type: CallType::Audio,
            status: CallStatus::Pending,
            initiator_id: UserId::from("u1"),
            initiator: None,
            participants: vec![],
            started_at: None,
            ended_at: None,
            duration: None,
        }
    }

    impl StubRegistry {
        fn ok() -> Self {
            Self {
                create: Ok(snapshot("c1")),
                join: Ok(snapshot("c1")),
                leave: Ok(LeaveOutcome {
                    call: None,
                    call_ended: true,
                }),
                calls: Mutex::new(vec![]),
            }
        }

        fn failing(error: RegistryError) -> Self {
            Self {
                create: Err(error.clone()),
                join: Err(error.clone()),
                leave: Err(error),
                calls: Mutex::new(vec![]),
            }
        }

        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }
    }

    #[async_trait]
    impl CallRegistry for StubRegistry {
        async fn create_call(&self, _: &[UserId], _: CallType) -> RegistryResult<CallSnapshot> {
            self.record("create");
            self.create.clone()
        }

        async fn join_call(&self, _: &CallId) -> RegistryResult<CallSnapshot> {
            self.record("join");
            self.join.clone()
        }

        async fn leave_call(&self, _: &CallId) -> RegistryResult<LeaveOutcome> {
            self.record("leave");
            self.leave.clone()
        }

        async fn update_participant_status(
            &self,
            _: &CallId,
            _: ParticipantStatus,
        ) -> RegistryResult<CallSnapshot> {
            self.record("update");
            self.join.clone()
        }
    }

    #[tokio::test]
    async fn test_create_call_yields_identity() {
        let registry = StubRegistry::ok();
        let output = create_call_task(&registry, &[UserId::from("u2")], CallType::Audio)
            .await
            .unwrap();

        match output {
            TaskOutput::Created { call_id, initiator, .. } => {
                assert_eq!(call_id, CallId::from("c1"));
                assert_eq!(initiator.id, UserId::from("u1"));
            }
            other => panic!("Expected Created, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_call_failure_carries_message() {
        let registry = StubRegistry::failing(RegistryError::rejected(404, "Receiver not found"));
        let error = create_call_task(&registry, &[UserId::from("nobody")], CallType::Audio)
            .await
            .unwrap_err();

        assert!(matches!(error, TaskError::CallCreation { .. }));
        assert_eq!(error.message(), Some("Receiver not found"));
    }

    #[tokio::test]
    async fn test_missing_credential_is_a_task_failure() {
        let registry = StubRegistry::failing(RegistryError::MissingCredential);
        let error = join_call_task(&registry, Some(&CallId::from("c1")))
            .await
            .unwrap_err();

        assert_eq!(
            error,
            TaskError::CallJoin {
                source: RegistryError::MissingCredential
            }
        );
    }

    #[tokio::test]
    async fn test_join_without_call_id_does_not_hit_registry() {
        let registry = StubRegistry::ok();
        let error = join_call_task(&registry, None).await.unwrap_err();

        assert!(matches!(error, TaskError::CallJoin { .. }));
        assert!(registry.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_end_call_swallows_failures() {
        let registry = StubRegistry::failing(RegistryError::transport("connection refused"));
        let output = end_call_task(&registry, Some(&CallId::from("c1"))).await;

        assert_eq!(output, Ok(TaskOutput::Ended { call: None }));
        assert_eq!(*registry.calls.lock().unwrap(), vec!["leave".to_string()]);
        assert!(logs_contain("Failed to leave call"));
    }

    #[tokio::test]
    async fn test_end_call_without_call_is_noop() {
        let registry = StubRegistry::ok();
        let output = end_call_task(&registry, None).await;

        assert_eq!(output, Ok(TaskOutput::Ended { call: None }));
        assert!(registry.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_task_dispatches_by_input() {
        let registry = StubRegistry::ok();
        let input = TaskInput::JoinCall {
            call_id: Some(CallId::from("c1")),
        };
        assert_eq!(input.kind(), TaskKind::JoinCall);

        let output = run_task(&registry, input).await.unwrap();
        assert!(matches!(output, TaskOutput::Joined { .. }));
    }
}
