use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

use crate::events::EventKind;
use crate::state_table::CallState;

/// One state entry taken by the machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionRecord {
    pub from: CallState,
    pub to: CallState,
    /// Triggering event; `None` for automatic transitions
    pub event: Option<EventKind>,
    /// Epoch of the state entered
    pub epoch: u64,
    pub at: DateTime<Utc>,
}

/// Bounded log of recent transitions, oldest first
#[derive(Debug, Clone)]
pub struct TransitionHistory {
    records: VecDeque<TransitionRecord>,
    capacity: usize,
}

impl TransitionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.min(256)),
            capacity,
        }
    }

    pub fn push(&mut self, record: TransitionRecord) {
        if self.capacity == 0 {
            return;
        }
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// States visited, starting from the source of the oldest record
    pub fn path(&self) -> Vec<CallState> {
        let mut path: Vec<CallState> = self.records.front().map(|r| r.from).into_iter().collect();
        path.extend(self.records.iter().map(|r| r.to));
        path
    }
}
