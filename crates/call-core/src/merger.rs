//! Participant snapshot merger
//!
//! Folds participant collections pushed by the live feed into the machine's
//! local copy. The feed adapter is responsible for removing the local
//! user's own row before anything reaches the merger.

use serde::Serialize;

use crate::types::ParticipantView;

/// How an incoming participant collection is folded into the context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MergePolicy {
    /// Replace wholesale with the incoming sequence
    Replace,
    /// Concatenate, keeping existing rows and duplicates
    Append,
}

/// Merge `incoming` into `participants` under `policy`
pub fn merge(policy: MergePolicy, participants: &mut Vec<ParticipantView>, incoming: &[ParticipantView]) {
    match policy {
        MergePolicy::Replace => {
            participants.clear();
            participants.extend_from_slice(incoming);
        }
        MergePolicy::Append => participants.extend_from_slice(incoming),
    }
}
