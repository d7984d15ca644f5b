//! Attaching a tracer to an engine.
//!
//! The engine calls its observer through a shared reference from whatever
//! task is driving a cascade, so the tracer sits behind a mutex. Hooks hold
//! the lock only long enough to push one record.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use concord_engine::{ActionRecord, ActionSignature, CascadeObserver, FlowId, FrameSet};
use concord_foundation::{Error, Record};

use crate::config::TracerConfig;
use crate::trace::{TraceEvent, Tracer};

/// A cloneable handle to a [`Tracer`] that implements [`CascadeObserver`].
///
/// ```ignore
/// let tracer = SharedTracer::new(TracerConfig::new().enabled());
/// let engine = engine.with_observer(tracer.observer());
/// let cascade = engine.invoke(signature, args).await?;
/// println!("{}", tracer.render_flow(cascade.flow));
/// ```
#[derive(Clone, Debug, Default)]
pub struct SharedTracer {
    inner: Arc<Mutex<Tracer>>,
}

impl SharedTracer {
    /// Creates a shared tracer with the given configuration.
    #[must_use]
    pub fn new(config: TracerConfig) -> Self {
        Self::from_tracer(Tracer::new(config))
    }

    /// Wraps an existing tracer.
    #[must_use]
    pub fn from_tracer(tracer: Tracer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tracer)),
        }
    }

    /// This tracer as an engine observer.
    #[must_use]
    pub fn observer(&self) -> Arc<dyn CascadeObserver> {
        Arc::new(self.clone())
    }

    /// Locks the tracer for direct access.
    ///
    /// A panic while tracing leaves the buffer usable, so poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, Tracer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enables tracing.
    pub fn enable(&self) {
        self.lock().set_enabled(true);
    }

    /// Disables tracing.
    pub fn disable(&self) {
        self.lock().set_enabled(false);
    }

    /// Drops every buffered record.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of buffered records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().buffer().len()
    }

    /// Returns true if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().buffer().is_empty()
    }

    /// Event types recorded for one flow, in order.
    #[must_use]
    pub fn event_types(&self, flow: FlowId) -> Vec<&'static str> {
        self.lock()
            .buffer()
            .records_for_flow(flow)
            .iter()
            .map(|r| r.event_type())
            .collect()
    }

    /// Renders one flow with the tracer's current format.
    #[must_use]
    pub fn render_flow(&self, flow: FlowId) -> String {
        self.lock().render_flow(flow)
    }

    fn record(&self, flow: FlowId, event: impl FnOnce() -> TraceEvent) {
        let mut tracer = self.lock();
        if tracer.is_enabled() {
            tracer.record(flow, event());
        }
    }
}

impl CascadeObserver for SharedTracer {
    fn flow_started(&self, flow: FlowId, signature: &ActionSignature, args: &Record) {
        self.record(flow, || TraceEvent::FlowStart {
            signature: signature.to_string(),
            args: args.clone(),
        });
    }

    fn action_completed(&self, record: &ActionRecord, depth: u32) {
        self.record(record.flow, || TraceEvent::ActionCompleted {
            signature: record.signature.to_string(),
            input: record.input.clone(),
            output: record.output.clone(),
            depth,
        });
    }

    fn rule_matched(&self, flow: FlowId, rule: &str, trigger: &ActionRecord, frames: &FrameSet) {
        self.record(flow, || TraceEvent::RuleMatched {
            rule: rule.to_string(),
            trigger: trigger.signature.to_string(),
            frames: frames.len(),
            bindings: frames.first().map(|f| f.to_pairs()).unwrap_or_default(),
        });
    }

    fn where_evaluated(&self, flow: FlowId, rule: &str, input: usize, output: &FrameSet) {
        self.record(flow, || TraceEvent::WhereEvaluated {
            rule: rule.to_string(),
            input,
            output: output.len(),
        });
    }

    fn action_dispatched(
        &self,
        flow: FlowId,
        rule: &str,
        signature: &ActionSignature,
        args: &Record,
        depth: u32,
    ) {
        self.record(flow, || TraceEvent::ActionDispatched {
            rule: rule.to_string(),
            signature: signature.to_string(),
            args: args.clone(),
            depth,
        });
    }

    fn flow_finished(&self, flow: FlowId, records: usize, error: Option<&Error>) {
        self.record(flow, || TraceEvent::FlowEnd {
            records,
            error: error.map(ToString::to_string),
        });
    }
}
