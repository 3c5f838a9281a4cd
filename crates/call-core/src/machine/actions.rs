use tracing::{debug, warn};

use crate::events::CallEvent;
use crate::merger::{self, MergePolicy};
use crate::state_table::Action;
use crate::tasks::TaskOutput;
use crate::types::CallContext;

/// Execute an action from the state table against the context
///
/// `event` is `None` for automatic transitions. An action whose payload is
/// missing from the event leaves the context untouched.
pub fn execute_action(action: Action, context: &mut CallContext, event: Option<&CallEvent>) {
    debug!("Executing action: {:?}", action);

    match (action, event) {
        (Action::ResetContext, _) => context.reset(),

        (
            Action::StoreInitiator,
            Some(CallEvent::IncomingCall {
                initiator,
                call_id,
                call,
            }),
        ) => {
            context.initiator = Some(initiator.clone());
            context.call_id = Some(call_id.clone());
            context.call = call.clone();
        }

        (
            Action::StoreCreatedCall,
            Some(CallEvent::TaskDone {
                output:
                    TaskOutput::Created {
                        call_id,
                        call,
                        initiator,
                    },
                ..
            }),
        ) => {
            context.call_id = Some(call_id.clone());
            context.call = Some(call.clone());
            context.initiator = Some(initiator.clone());
        }

        (
            Action::StoreJoinedCall,
            Some(CallEvent::TaskDone {
                output: TaskOutput::Joined { call },
                ..
            }),
        ) => {
            context.call = Some(call.clone());
        }

        (Action::AppendParticipants, Some(event)) | (Action::ReplaceParticipants, Some(event)) => {
            let incoming = match event {
                CallEvent::AddParticipant { participants } | CallEvent::UpdateParticipant { participants } => {
                    participants
                }
                other => {
                    warn!("{:?} carries no participants, skipping {:?}", other.kind(), action);
                    return;
                }
            };
            let policy = if action == Action::AppendParticipants {
                MergePolicy::Append
            } else {
                MergePolicy::Replace
            };
            merger::merge(policy, &mut context.participants, incoming);
        }

        (action, event) => {
            warn!(
                "Action {:?} has no payload in {:?}, context unchanged",
                action,
                event.map(CallEvent::kind)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskKind;
    use crate::types::*;

    fn row(id: &str) -> ParticipantView {
        ParticipantView {
            id: ParticipantId::from(id),
            user_id: UserId::from("u2"),
            role: ParticipantRole::Participant,
            status: ParticipantStatus::Calling,
            user: UserPresence::default(),
        }
    }

    fn call(id: &str) -> CallSnapshot {
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

    #[test]
    fn test_store_initiator_from_incoming_call() {
        let mut context = CallContext::new();
        let event = CallEvent::incoming(UserRef::new("u1"), "c9");

        execute_action(Action::StoreInitiator, &mut context, Some(&event));
        assert_eq!(context.call_id, Some(CallId::from("c9")));
        assert_eq!(context.initiator.map(|u| u.id), Some(UserId::from("u1")));
    }

    #[test]
    fn test_store_created_call() {
        let mut context = CallContext::new();
        let event = CallEvent::TaskDone {
            task: TaskKind::CreateCall,
            epoch: 1,
            output: TaskOutput::Created {
                call_id: CallId::from("c1"),
                call: call("c1"),
                initiator: UserRef::new("u1"),
            },
        };

        execute_action(Action::StoreCreatedCall, &mut context, Some(&event));
        assert_eq!(context.call_id, Some(CallId::from("c1")));
        assert!(context.call.is_some());
        assert!(context.participants.is_empty());
    }

    #[test]
    fn test_append_then_replace() {
        let mut context = CallContext::new();
        let add = CallEvent::AddParticipant {
            participants: vec![row("p1")],
        };
        execute_action(Action::AppendParticipants, &mut context, Some(&add));
        execute_action(Action::AppendParticipants, &mut context, Some(&add));
        assert_eq!(context.participants.len(), 2);

        let update = CallEvent::UpdateParticipant {
            participants: vec![row("p3")],
        };
        execute_action(Action::ReplaceParticipants, &mut context, Some(&update));
        assert_eq!(context.participants, vec![row("p3")]);
    }

    #[test]
    fn test_mismatched_payload_is_ignored() {
        let mut context = CallContext::new();
        context.call_id = Some(CallId::from("c1"));
        let before = context.clone();

        execute_action(Action::StoreCreatedCall, &mut context, Some(&CallEvent::Answer));
        execute_action(Action::AppendParticipants, &mut context, None);
        assert_eq!(context, before);

        execute_action(Action::ResetContext, &mut context, None);
        assert!(context.is_empty());
    }
}
