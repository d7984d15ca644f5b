//! Hooks for watching a cascade unfold.
//!
//! Every hook has an empty default, so observers implement only what they
//! need. Hooks run inline on the cascade and must not block.

use concord_foundation::{Error, Record};

use crate::action::{ActionRecord, ActionSignature};
use crate::flow::FlowId;
use crate::frame::FrameSet;

/// Receives cascade events from an [`Engine`](crate::Engine).
#[allow(unused_variables)]
pub trait CascadeObserver: Send + Sync {
    /// A root call opened a flow.
    fn flow_started(&self, flow: FlowId, signature: &ActionSignature, args: &Record) {}

    /// An action completed; `depth` is 0 for the root call.
    fn action_completed(&self, record: &ActionRecord, depth: u32) {}

    /// A rule's `when` clauses matched a fresh record.
    fn rule_matched(&self, flow: FlowId, rule: &str, trigger: &ActionRecord, frames: &FrameSet) {}

    /// A rule's `where` steps ran; `input` is the number of frames going in.
    fn where_evaluated(&self, flow: FlowId, rule: &str, input: usize, output: &FrameSet) {}

    /// A rule is about to invoke a `then` action.
    fn action_dispatched(
        &self,
        flow: FlowId,
        rule: &str,
        signature: &ActionSignature,
        args: &Record,
        depth: u32,
    ) {
    }

    /// The flow went quiet, or stopped on `error`.
    fn flow_finished(&self, flow: FlowId, records: usize, error: Option<&Error>) {}
}

/// An observer that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl CascadeObserver for NoopObserver {}
