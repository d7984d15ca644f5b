//! The `where` part of a rule: query extension and refinement.
//!
//! A rule's `where` is an ordered list of [`WhereStep`]s, each an async
//! `FrameSet -> FrameSet` transform. Queries fan frames out (one output frame
//! per result), filters prune them, and steps can inject an error-marker
//! variable so that a companion rule can report a failed lookup as data.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use concord_foundation::{ErrorContext, Record, Result, Value};
use futures::future::BoxFuture;

use crate::action::ActionSignature;
use crate::concept::ConceptRegistry;
use crate::flow::FlowId;
use crate::frame::{Frame, FrameSet, Var};
use crate::pattern::Template;

/// Predicate over a frame.
pub type FilterFn = Arc<dyn Fn(&Frame) -> bool + Send + Sync>;

/// Derives a value from a frame; `None` drops the frame.
pub type ComputeFn = Arc<dyn Fn(&Frame) -> Option<Value> + Send + Sync>;

/// Arbitrary async transform over a whole frame set.
pub type CustomFn =
    Arc<dyn Fn(Refinement, FrameSet) -> BoxFuture<'static, Result<FrameSet>> + Send + Sync>;

// =============================================================================
// Query Step
// =============================================================================

/// What a query step does with an input frame that no result row extends.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum OnEmpty {
    /// The frame is dropped (implicit filter-out).
    #[default]
    Drop,
    /// The frame survives with `var` bound to `value`.
    Inject {
        /// The error-marker variable.
        var: Var,
        /// The value to bind, usually an error message.
        value: Value,
    },
}

/// A read-only lookup that extends each frame once per result.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryStep {
    /// The query to run.
    pub signature: ActionSignature,
    /// Arguments, filled from the frame.
    pub input: Template,
    /// Result fields to bind, in order.
    pub output: Vec<(Arc<str>, Var)>,
    /// Behavior when no row extends a frame.
    pub on_empty: OnEmpty,
}

impl QueryStep {
    /// Creates a query step with no output bindings.
    #[must_use]
    pub fn new(signature: ActionSignature, input: Template) -> Self {
        Self {
            signature,
            input,
            output: Vec::new(),
            on_empty: OnEmpty::Drop,
        }
    }

    /// Binds a result field to a variable.
    #[must_use]
    pub fn bind(mut self, field: impl Into<Arc<str>>, var: &Var) -> Self {
        self.output.push((field.into(), var.clone()));
        self
    }

    /// When no row extends a frame, keep it with `var` bound to `value`.
    #[must_use]
    pub fn or_inject(mut self, var: &Var, value: impl Into<Value>) -> Self {
        self.on_empty = OnEmpty::Inject {
            var: var.clone(),
            value: value.into(),
        };
        self
    }

    /// Variables bound on the success path.
    pub fn output_variables(&self) -> impl Iterator<Item = &Var> {
        self.output.iter().map(|(_, var)| var)
    }

    /// Extends `frame` with one result row.
    ///
    /// A row missing a declared field, holding nil in one, or disagreeing
    /// with an existing binding, yields nothing.
    #[must_use]
    pub fn extend(&self, frame: &Frame, row: &Record) -> Option<Frame> {
        self.output.iter().try_fold(frame.clone(), |frame, (field, var)| {
            let value = row.get(field).filter(|v| !matches!(v, Value::Nil))?;
            frame.unify(var, value)
        })
    }

    async fn run(&self, cx: &Refinement, frames: FrameSet) -> Result<FrameSet> {
        let mut out = FrameSet::new();
        for frame in frames {
            let args = self
                .input
                .instantiate(&frame)
                .map_err(|e| e.with_context(cx.context(&self.signature)))?;
            let rows = cx.query(&self.signature, args).await?;

            let before = out.len();
            out.extend(rows.iter().filter_map(|row| self.extend(&frame, row)));
            // Rows that all fail to extend count as no result.
            if out.len() == before {
                if let OnEmpty::Inject { var, value } = &self.on_empty {
                    out.extend(frame.unify(var, value));
                }
            }
        }
        Ok(out)
    }
}

// =============================================================================
// Where Step
// =============================================================================

/// One step of a rule's `where` clause.
#[derive(Clone)]
pub enum WhereStep {
    /// Fan out through a query.
    Query(QueryStep),
    /// Keep frames satisfying a predicate.
    Filter(FilterFn),
    /// Keep frames where the variable is bound.
    Bound(Var),
    /// Keep frames where the variable is not bound.
    Unbound(Var),
    /// Bind a derived value.
    Bind {
        /// The variable to bind.
        var: Var,
        /// Computes its value.
        compute: ComputeFn,
    },
    /// Arbitrary async refinement.
    Custom {
        /// Variables the transform may bind.
        binds: Vec<Var>,
        /// The transform.
        f: CustomFn,
    },
}

impl WhereStep {
    /// A query step.
    #[must_use]
    pub fn query(step: QueryStep) -> Self {
        Self::Query(step)
    }

    /// A filter step.
    #[must_use]
    pub fn filter(predicate: impl Fn(&Frame) -> bool + Send + Sync + 'static) -> Self {
        Self::Filter(Arc::new(predicate))
    }

    /// Keep frames where `var` is bound.
    #[must_use]
    pub fn bound(var: &Var) -> Self {
        Self::Bound(var.clone())
    }

    /// Keep frames where `var` is not bound.
    #[must_use]
    pub fn unbound(var: &Var) -> Self {
        Self::Unbound(var.clone())
    }

    /// Bind `var` to a value derived from each frame.
    #[must_use]
    pub fn bind(
        var: &Var,
        compute: impl Fn(&Frame) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        Self::Bind {
            var: var.clone(),
            compute: Arc::new(compute),
        }
    }

    /// An arbitrary async transform that may bind `binds`.
    #[must_use]
    pub fn custom<F, Fut>(binds: &[&Var], f: F) -> Self
    where
        F: Fn(Refinement, FrameSet) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<FrameSet>> + Send + 'static,
    {
        Self::Custom {
            binds: binds.iter().map(|v| (*v).clone()).collect(),
            f: Arc::new(move |cx, frames| Box::pin(f(cx, frames))),
        }
    }

    async fn apply(&self, cx: &Refinement, frames: FrameSet) -> Result<FrameSet> {
        match self {
            Self::Query(step) => step.run(cx, frames).await,
            Self::Filter(predicate) => Ok(frames.filter(|f| predicate(f))),
            Self::Bound(var) => Ok(frames.filter(|f| f.is_bound(var))),
            Self::Unbound(var) => Ok(frames.filter(|f| !f.is_bound(var))),
            Self::Bind { var, compute } => Ok(frames.flat_map(|f| {
                compute(&f).and_then(|value| f.unify(var, &value))
            })),
            Self::Custom { f, .. } => f(cx.clone(), frames).await,
        }
    }
}

impl fmt::Debug for WhereStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query(step) => f.debug_tuple("Query").field(step).finish(),
            Self::Filter(_) => f.write_str("Filter(..)"),
            Self::Bound(var) => f.debug_tuple("Bound").field(var).finish(),
            Self::Unbound(var) => f.debug_tuple("Unbound").field(var).finish(),
            Self::Bind { var, .. } => f.debug_struct("Bind").field("var", var).finish_non_exhaustive(),
            Self::Custom { binds, .. } => f
                .debug_struct("Custom")
                .field("binds", binds)
                .finish_non_exhaustive(),
        }
    }
}

// =============================================================================
// Refinement
// =============================================================================

/// What `where` steps can see: the concepts, and which rule and flow they serve.
#[derive(Clone, Debug)]
pub struct Refinement {
    concepts: Arc<ConceptRegistry>,
    flow: FlowId,
    rule: Arc<str>,
}

impl Refinement {
    /// Creates a refinement context.
    #[must_use]
    pub fn new(concepts: Arc<ConceptRegistry>, flow: FlowId, rule: impl Into<Arc<str>>) -> Self {
        Self {
            concepts,
            flow,
            rule: rule.into(),
        }
    }

    /// The concept registry.
    #[must_use]
    pub fn concepts(&self) -> &ConceptRegistry {
        &self.concepts
    }

    /// The flow being refined.
    #[must_use]
    pub fn flow(&self) -> FlowId {
        self.flow
    }

    /// The rule being refined.
    #[must_use]
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Runs a query on behalf of the rule.
    ///
    /// # Errors
    /// Unknown signature, or an infrastructure failure inside the concept.
    pub async fn query(&self, signature: &ActionSignature, args: Record) -> Result<Vec<Record>> {
        self.concepts
            .query(signature, args)
            .await
            .map_err(|mut e| {
                let context = match e.context.take() {
                    Some(context) if context.rule.is_none() => context.with_rule(self.rule.as_ref()),
                    Some(context) => context,
                    None => self.context(signature),
                };
                e.with_context(context)
            })
    }

    fn context(&self, signature: &ActionSignature) -> ErrorContext {
        ErrorContext::new()
            .with_rule(self.rule.as_ref())
            .with_signature(signature.to_string())
    }
}

/// Runs `steps` in order over `frames`.
///
/// Stops early once no frames remain.
///
/// # Errors
/// The first infrastructure failure from a query or custom step.
pub async fn evaluate(steps: &[WhereStep], cx: &Refinement, frames: FrameSet) -> Result<FrameSet> {
    let mut frames = frames;
    for step in steps {
        if frames.is_empty() {
            break;
        }
        frames = step.apply(cx, frames).await?;
    }
    Ok(frames)
}

// =============================================================================
// Tests
// =============================================================================
