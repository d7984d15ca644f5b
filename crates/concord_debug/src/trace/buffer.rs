//! Bounded trace storage.
//!
//! One ring holds the most recent records of every flow. Root calls running
//! concurrently interleave here, so per-flow reads filter. Record ids are
//! handed out consecutively and only ever leave from the front, which keeps
//! the ids in the ring contiguous.

use std::collections::{BTreeMap, VecDeque};

use concord_engine::FlowId;

use super::record::{TraceEvent, TraceRecord};

/// The most recent trace records, oldest first.
#[derive(Clone, Debug)]
pub struct TraceBuffer {
    records: VecDeque<TraceRecord>,
    capacity: usize,
    next_id: u64,
    evicted: u64,
}

impl TraceBuffer {
    /// A buffer keeping at most `capacity` records (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            next_id: 0,
            evicted: 0,
        }
    }

    /// Maximum number of records kept.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends an event, evicting the oldest record if full. Returns the new id.
    pub fn push(&mut self, flow: FlowId, elapsed_ns: u64, event: TraceEvent) -> u64 {
        if self.records.len() == self.capacity {
            self.records.pop_front();
            self.evicted += 1;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.records
            .push_back(TraceRecord::new(id, flow, elapsed_ns, event));
        id
    }

    /// Number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records pushed out by newer ones since creation.
    #[must_use]
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Drops every record. Ids keep counting up.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// All records, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TraceRecord> {
        self.records.iter()
    }

    /// The record with `id`, if still held.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<&TraceRecord> {
        let first = self.records.front()?.id;
        let offset = usize::try_from(id.checked_sub(first)?).ok()?;
        self.records.get(offset)
    }

    /// Records of one flow, in order.
    #[must_use]
    pub fn records_for_flow(&self, flow: FlowId) -> Vec<&TraceRecord> {
        self.records.iter().filter(|r| r.flow == flow).collect()
    }

    /// Records naming `rule`.
    #[must_use]
    pub fn by_rule(&self, rule: &str) -> Vec<&TraceRecord> {
        self.records
            .iter()
            .filter(|r| r.event.rule() == Some(rule))
            .collect()
    }

    /// The last `count` records.
    #[must_use]
    pub fn recent(&self, count: usize) -> Vec<&TraceRecord> {
        let skip = self.records.len().saturating_sub(count);
        self.records.iter().skip(skip).collect()
    }

    /// Flows with at least one record held, in order of first appearance.
    #[must_use]
    pub fn flows(&self) -> Vec<FlowId> {
        let mut flows: Vec<FlowId> = Vec::new();
        for record in &self.records {
            if !flows.contains(&record.flow) {
                flows.push(record.flow);
            }
        }
        flows
    }

    /// How many records of each event type are held.
    #[must_use]
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.event_type()).or_default() += 1;
        }
        counts
    }
}

impl Default for TraceBuffer {
    fn default() -> Self {
        Self::new(10_000)
    }
}
