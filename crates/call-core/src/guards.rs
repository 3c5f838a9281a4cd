//! Guard evaluation
//!
//! Guards are pure predicates over the machine context (and, for
//! `HasReceivers`, the triggering event). The same evaluator gates keyed
//! transitions and decides which automatic transition fires after a
//! context write.

use serde::Serialize;

use crate::events::CallEvent;
use crate::types::CallContext;

/// Conditions that must hold for a transition to be taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Guard {
    /// CONNECT names at least one receiver
    HasReceivers,
    /// The context holds at least one participant row
    HasParticipants,
    /// Some participant's user is ONLINE
    AnyParticipantOnline,
    /// Some participant has status CONNECTED
    AnyParticipantConnected,
    /// No call identity is held
    CallIdAbsent,
}

/// Evaluate a guard. `event` is `None` when checking automatic transitions.
pub fn evaluate(guard: Guard, context: &CallContext, event: Option<&CallEvent>) -> bool {
    match guard {
        Guard::HasReceivers => match event {
            Some(CallEvent::Connect { receiver_ids, .. }) => !receiver_ids.is_empty(),
            _ => false,
        },
        Guard::HasParticipants => !context.participants.is_empty(),
        Guard::AnyParticipantOnline => context.participants.iter().any(|p| p.is_online()),
        Guard::AnyParticipantConnected => context.participants.iter().any(|p| p.is_connected()),
        Guard::CallIdAbsent => context.call_id.is_none(),
    }
}

/// Evaluate every guard; an empty list always passes
pub fn all_pass(guards: &[Guard], context: &CallContext, event: Option<&CallEvent>) -> bool {
    guards.iter().all(|g| evaluate(*g, context, event))
}
