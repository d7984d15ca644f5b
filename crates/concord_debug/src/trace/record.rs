//! What a tracer records.

use concord_engine::FlowId;
use concord_foundation::{Record, Value};

// =============================================================================
// Trace Event
// =============================================================================

/// Events that can be traced during a cascade.
#[derive(Clone, Debug)]
pub enum TraceEvent {
    /// A root call opened a flow.
    FlowStart {
        /// The root action (`Concept.action`).
        signature: String,
        /// Its arguments.
        args: Record,
    },

    /// A flow went quiet or stopped.
    FlowEnd {
        /// Number of actions completed in the flow.
        records: usize,
        /// The error that stopped it, if any.
        error: Option<String>,
    },

    /// An action completed.
    ActionCompleted {
        /// The action.
        signature: String,
        /// Its arguments.
        input: Record,
        /// Its result.
        output: Record,
        /// Nesting below the root call.
        depth: u32,
    },

    /// A rule's triggers matched a fresh record.
    RuleMatched {
        /// The rule.
        rule: String,
        /// The action that triggered it.
        trigger: String,
        /// Number of initial frames.
        frames: usize,
        /// Bindings of the first frame.
        bindings: Vec<(String, Value)>,
    },

    /// A rule's where steps ran.
    WhereEvaluated {
        /// The rule.
        rule: String,
        /// Frames going in.
        input: usize,
        /// Frames coming out.
        output: usize,
    },

    /// A rule invoked an action.
    ActionDispatched {
        /// The rule.
        rule: String,
        /// The action.
        signature: String,
        /// Its arguments.
        args: Record,
        /// Nesting below the root call.
        depth: u32,
    },

    /// A note added by the application.
    Custom {
        /// What the note is about.
        name: String,
        /// Payload.
        data: Value,
    },
}

impl TraceEvent {
    /// Returns a short name for the event type.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::FlowStart { .. } => "flow-start",
            Self::FlowEnd { .. } => "flow-end",
            Self::ActionCompleted { .. } => "action-completed",
            Self::RuleMatched { .. } => "rule-matched",
            Self::WhereEvaluated { .. } => "where-evaluated",
            Self::ActionDispatched { .. } => "action-dispatched",
            Self::Custom { .. } => "custom",
        }
    }

    /// The rule this event concerns, if any.
    #[must_use]
    pub fn rule(&self) -> Option<&str> {
        match self {
            Self::RuleMatched { rule, .. }
            | Self::WhereEvaluated { rule, .. }
            | Self::ActionDispatched { rule, .. } => Some(rule),
            _ => None,
        }
    }
}

// =============================================================================
// Trace Record
// =============================================================================

/// A timestamped trace record.
#[derive(Clone, Debug)]
pub struct TraceRecord {
    /// Unique record ID within the tracer.
    pub id: u64,
    /// The flow this event belongs to.
    pub flow: FlowId,
    /// Nanoseconds since the tracer was created.
    pub elapsed_ns: u64,
    /// The trace event.
    pub event: TraceEvent,
}

impl TraceRecord {
    /// Creates a new trace record.
    #[must_use]
    pub fn new(id: u64, flow: FlowId, elapsed_ns: u64, event: TraceEvent) -> Self {
        Self {
            id,
            flow,
            elapsed_ns,
            event,
        }
    }

    /// Returns the event type name.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        self.event.event_type()
    }
}

// =============================================================================
// Tests
// =============================================================================
