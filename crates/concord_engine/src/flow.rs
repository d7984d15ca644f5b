//! Flows: the transient scope of one root call's cascade.
//!
//! A flow remembers the records completed during its cascade so that rules
//! with several `when` clauses can join the fresh record against earlier
//! ones. It is dropped when the cascade goes quiet; nothing is retained
//! across root calls.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::action::ActionRecord;

static NEXT_FLOW_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of one root call and everything it cascaded into.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowId(u64);

impl FlowId {
    /// Allocates a fresh flow id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_FLOW_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flow-{}", self.0)
    }
}

/// In-flight state of a cascade.
#[derive(Debug)]
pub struct Flow {
    id: FlowId,
    records: Vec<ActionRecord>,
    dispatched: u32,
}

impl Flow {
    /// Opens a new flow.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: FlowId::next(),
            records: Vec::new(),
            dispatched: 0,
        }
    }

    /// Returns the flow id.
    #[must_use]
    pub fn id(&self) -> FlowId {
        self.id
    }

    /// Appends a completed record; returns its position in the flow.
    pub fn record(&mut self, record: ActionRecord) -> usize {
        self.records.push(record);
        self.records.len() - 1
    }

    /// Records completed strictly before `position`.
    #[must_use]
    pub fn before(&self, position: usize) -> &[ActionRecord] {
        &self.records[..position.min(self.records.len())]
    }

    /// All records completed so far, in completion order.
    #[must_use]
    pub fn records(&self) -> &[ActionRecord] {
        &self.records
    }

    /// Counts one dispatch and returns the new total.
    pub fn count_dispatch(&mut self) -> u32 {
        self.dispatched += 1;
        self.dispatched
    }

    /// Number of actions dispatched by rules so far.
    #[must_use]
    pub fn dispatched(&self) -> u32 {
        self.dispatched
    }

    /// Closes the flow, yielding its records.
    #[must_use]
    pub fn into_records(self) -> Vec<ActionRecord> {
        self.records
    }
}

impl Default for Flow {
    fn default() -> Self {
        Self::new()
    }
}
