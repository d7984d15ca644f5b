//! Action signatures and completed action records.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use concord_foundation::Record;

use crate::flow::FlowId;

// =============================================================================
// Action Signature
// =============================================================================

/// Identifies an operation on a concept: `(concept, operation)`.
///
/// Query names conventionally start with `_`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionSignature {
    concept: Arc<str>,
    operation: Arc<str>,
}

impl ActionSignature {
    /// Creates a signature.
    #[must_use]
    pub fn new(concept: impl Into<Arc<str>>, operation: impl Into<Arc<str>>) -> Self {
        Self {
            concept: concept.into(),
            operation: operation.into(),
        }
    }

    /// Returns the concept name.
    #[must_use]
    pub fn concept(&self) -> &str {
        &self.concept
    }

    /// Returns the action or query name.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Returns true if the operation is named like a query.
    #[must_use]
    pub fn is_query(&self) -> bool {
        self.operation.starts_with('_')
    }
}

impl fmt::Debug for ActionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.concept, self.operation)
    }
}

impl fmt::Display for ActionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.concept, self.operation)
    }
}

// =============================================================================
// Action Record
// =============================================================================

static NEXT_ACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of one completed action.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(u64);

impl ActionId {
    fn next() -> Self {
        Self(NEXT_ACTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One completed action invocation. Immutable once created.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionRecord {
    /// Unique id of this completion.
    pub id: ActionId,
    /// The flow (root call) this completion belongs to.
    pub flow: FlowId,
    /// Which action completed.
    pub signature: ActionSignature,
    /// Arguments the action was invoked with.
    pub input: Record,
    /// What it returned: a success-shaped or an `error`-bearing record.
    pub output: Record,
}

impl ActionRecord {
    /// Creates a record with a fresh id.
    #[must_use]
    pub fn new(flow: FlowId, signature: ActionSignature, input: Record, output: Record) -> Self {
        Self {
            id: ActionId::next(),
            flow,
            signature,
            input,
            output,
        }
    }

    /// Returns true if the action reported an expected failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.output.is_error()
    }
}

impl fmt::Display for ActionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.signature, self.input, self.output)
    }
}
