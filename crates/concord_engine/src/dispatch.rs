//! The cascade dispatcher.
//!
//! [`Engine::invoke`] performs a root call and then drives its cascade:
//!
//! ```text
//! Received -> Matched(0..N rules)
//!          -> [per rule: WhereEvaluated -> per frame: ThenDispatched -> RecursiveMatch]
//!          -> Quiescent
//! ```
//!
//! Everything within one cascade is awaited sequentially and depth first:
//! rules in registration order, frames in frame-set order, `then` entries in
//! declaration order. Each dispatched action's record is matched against the
//! full rule registry before the next `then` entry runs.
//!
//! There is no retry and no rollback. An action that fails with an `error`
//! record is ordinary data; an infrastructure failure ends the cascade and is
//! returned from `invoke`, and actions that already ran stay done.

use std::sync::Arc;

use concord_foundation::{Error, ErrorContext, Record, Result, SemanticLimit};
use futures::future::BoxFuture;
use tracing::{debug, trace, warn};

use crate::action::{ActionRecord, ActionSignature};
use crate::concept::ConceptRegistry;
use crate::config::EngineConfig;
use crate::flow::{Flow, FlowId};
use crate::matcher::RuleMatcher;
use crate::observer::{CascadeObserver, NoopObserver};
use crate::query::{self, Refinement};
use crate::registry::RuleRegistry;
use crate::rule::{Rule, ThenClause};

// =============================================================================
// Cascade
// =============================================================================

/// Everything one root call led to.
#[derive(Clone, Debug)]
pub struct Cascade {
    /// The flow id shared by every record.
    pub flow: FlowId,
    /// The root call's record.
    pub root: ActionRecord,
    /// Every record of the flow in completion order, root first.
    pub records: Vec<ActionRecord>,
}

impl Cascade {
    /// The root call's result.
    #[must_use]
    pub fn output(&self) -> &Record {
        &self.root.output
    }

    /// Records of actions dispatched by rules, in completion order.
    #[must_use]
    pub fn dispatched(&self) -> &[ActionRecord] {
        self.records.get(1..).unwrap_or_default()
    }

    /// Records with the given signature, in completion order.
    pub fn records_for<'a>(
        &'a self,
        signature: &ActionSignature,
    ) -> impl Iterator<Item = &'a ActionRecord> + use<'a> {
        let signature = signature.clone();
        self.records.iter().filter(move |r| r.signature == signature)
    }

    /// How many times an action ran in this cascade.
    #[must_use]
    pub fn count(&self, signature: &ActionSignature) -> usize {
        self.records_for(signature).count()
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Reacts to completed actions by dispatching rule effects.
///
/// Holds no state between root calls beyond the concepts and rules it was
/// built with. Cheap to clone; clones share concepts, rules and observer.
#[derive(Clone)]
pub struct Engine {
    concepts: Arc<ConceptRegistry>,
    rules: Arc<RuleRegistry>,
    config: EngineConfig,
    observer: Arc<dyn CascadeObserver>,
}

impl Engine {
    /// Creates an engine.
    ///
    /// # Errors
    /// Returns a configuration error if a rule names an unknown concept,
    /// an undeclared action, or an undeclared query.
    pub fn new(concepts: ConceptRegistry, rules: RuleRegistry) -> Result<Self> {
        rules.check_against(&concepts)?;
        debug!(
            concepts = concepts.len(),
            rules = rules.len(),
            "engine ready"
        );
        Ok(Self {
            concepts: Arc::new(concepts),
            rules: Arc::new(rules),
            config: EngineConfig::default(),
            observer: Arc::new(NoopObserver),
        })
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches an observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn CascadeObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The registered concepts.
    #[must_use]
    pub fn concepts(&self) -> &ConceptRegistry {
        &self.concepts
    }

    /// The registered rules.
    #[must_use]
    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Performs a root call and drives its cascade to quiescence.
    ///
    /// # Errors
    /// Unknown signature, an infrastructure failure anywhere in the cascade,
    /// or a tripped limit.
    pub async fn invoke(&self, signature: ActionSignature, args: Record) -> Result<Cascade> {
        let mut flow = Flow::new();
        let id = flow.id();
        self.observer.flow_started(id, &signature, &args);
        debug!(flow = %id, %signature, "root call");

        let result = self.run(&mut flow, signature, args).await;
        self.observer
            .flow_finished(id, flow.records().len(), result.as_ref().err());

        match result {
            Ok(root) => {
                debug!(flow = %id, records = flow.records().len(), "flow quiescent");
                Ok(Cascade {
                    flow: id,
                    root,
                    records: flow.into_records(),
                })
            }
            Err(error) => {
                warn!(flow = %id, %error, "cascade stopped");
                Err(error)
            }
        }
    }

    /// Runs a read-only query outside any cascade.
    ///
    /// # Errors
    /// Unknown signature, or an infrastructure failure inside the concept.
    pub async fn query(&self, signature: &ActionSignature, args: Record) -> Result<Vec<Record>> {
        self.concepts.query(signature, args).await
    }

    async fn run(&self, flow: &mut Flow, signature: ActionSignature, args: Record) -> Result<ActionRecord> {
        let output = self.concepts.perform(&signature, args.clone()).await?;
        let root = ActionRecord::new(flow.id(), signature, args, output);
        self.react(flow, root.clone(), 0).await?;
        Ok(root)
    }

    /// Offers a completed record to every rule that triggers on it.
    fn react<'a>(
        &'a self,
        flow: &'a mut Flow,
        record: ActionRecord,
        depth: u32,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.observer.action_completed(&record, depth);
            trace!(flow = %flow.id(), depth, %record, "action completed");

            let position = flow.record(record.clone());
            let candidates: Vec<Arc<Rule>> =
                self.rules.candidates(&record.signature).cloned().collect();

            for rule in candidates {
                self.fire(flow, &rule, &record, position, depth)
                    .await
                    .map_err(|e| push_frame(e, &record.signature))?;
            }
            Ok(())
        })
    }

    async fn fire(
        &self,
        flow: &mut Flow,
        rule: &Rule,
        record: &ActionRecord,
        position: usize,
        depth: u32,
    ) -> Result<()> {
        let frames = RuleMatcher::match_rule(rule, record, flow.before(position));
        if frames.is_empty() {
            return Ok(());
        }
        self.observer
            .rule_matched(flow.id(), rule.name(), record, &frames);
        trace!(flow = %flow.id(), rule = rule.name(), frames = frames.len(), "rule matched");

        let cx = Refinement::new(Arc::clone(&self.concepts), flow.id(), rule.name());
        let input = frames.len();
        let frames = query::evaluate(rule.where_steps(), &cx, frames).await?;
        self.observer
            .where_evaluated(flow.id(), rule.name(), input, &frames);
        if frames.is_empty() {
            return Ok(());
        }
        debug!(flow = %flow.id(), rule = rule.name(), frames = frames.len(), depth, "rule fired");

        for frame in &frames {
            for clause in rule.then() {
                let args = clause
                    .args
                    .instantiate(frame)
                    .map_err(|e| e.with_context(rule_context(rule, &clause.signature)))?;
                self.dispatch(flow, rule, clause, args, depth + 1).await?;
            }
        }
        Ok(())
    }

    async fn dispatch(
        &self,
        flow: &mut Flow,
        rule: &Rule,
        clause: &ThenClause,
        args: Record,
        depth: u32,
    ) -> Result<()> {
        if depth > self.config.max_depth {
            warn!(flow = %flow.id(), rule = rule.name(), depth, "max cascade depth exceeded");
            return Err(Error::limit_exceeded(SemanticLimit::MaxCascadeDepth {
                limit: self.config.max_depth,
                rule: Some(rule.name().to_string()),
            })
            .with_context(rule_context(rule, &clause.signature)));
        }
        if flow.count_dispatch() > self.config.max_dispatches {
            warn!(flow = %flow.id(), rule = rule.name(), "max dispatches exceeded");
            return Err(Error::limit_exceeded(SemanticLimit::MaxDispatches {
                limit: self.config.max_dispatches,
            })
            .with_context(rule_context(rule, &clause.signature)));
        }

        self.observer
            .action_dispatched(flow.id(), rule.name(), &clause.signature, &args, depth);
        debug!(flow = %flow.id(), rule = rule.name(), signature = %clause.signature, depth, "dispatch");

        let output = self
            .concepts
            .perform(&clause.signature, args.clone())
            .await
            .map_err(|mut e| {
                let context = e.context.take().unwrap_or_default();
                let context = match context.rule {
                    Some(_) => context,
                    None => context.with_rule(rule.name()),
                };
                e.with_context(context)
            })?;
        let record = ActionRecord::new(flow.id(), clause.signature.clone(), args, output);
        self.react(flow, record, depth).await
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("concepts", &self.concepts)
            .field("rules", &self.rules.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn rule_context(rule: &Rule, signature: &ActionSignature) -> ErrorContext {
    ErrorContext::new()
        .with_rule(rule.name())
        .with_signature(signature.to_string())
}

/// Records that the error surfaced while reacting to `signature`.
fn push_frame(mut error: Error, signature: &ActionSignature) -> Error {
    let mut context = error.context.take().unwrap_or_default();
    context.stack.insert(0, signature.to_string());
    error.with_context(context)
}

// =============================================================================
// Tests
// =============================================================================
