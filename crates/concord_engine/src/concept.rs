//! The contract collaborating modules implement, and their registry.
//!
//! A concept owns its state and exposes named actions and queries. Actions
//! answer with a success-shaped record or an `error`-bearing record; queries
//! answer with zero or more records and never with an error record. An `Err`
//! from either is an infrastructure failure and ends the cascade branch.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use concord_foundation::{Error, ErrorContext, Record, Result};
use tracing::{trace, warn};

use crate::action::ActionSignature;

// =============================================================================
// Concept
// =============================================================================

/// An independently implemented state component.
#[async_trait]
pub trait Concept: Send + Sync {
    /// The concept name rules refer to.
    fn name(&self) -> &str;

    /// Declared action names.
    fn actions(&self) -> &[&str];

    /// Declared query names (conventionally `_`-prefixed).
    fn queries(&self) -> &[&str];

    /// Runs an action.
    ///
    /// Expected failures are reported as `Ok(Record::error(..))`.
    ///
    /// # Errors
    /// Only for unexpected failures (storage, network, bugs).
    async fn perform(&self, action: &str, args: Record) -> Result<Record>;

    /// Runs a read-only query. No results is `Ok(vec![])`.
    ///
    /// # Errors
    /// Only for unexpected failures.
    async fn query(&self, query: &str, args: Record) -> Result<Vec<Record>>;
}

// =============================================================================
// Concept Registry
// =============================================================================

/// Concepts by name.
#[derive(Clone, Default)]
pub struct ConceptRegistry {
    concepts: BTreeMap<String, Arc<dyn Concept>>,
}

impl ConceptRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a concept.
    ///
    /// # Errors
    /// Returns an error if a concept with the same name is already registered.
    pub fn register(&mut self, concept: impl Concept + 'static) -> Result<()> {
        self.register_shared(Arc::new(concept))
    }

    /// Registers a concept the caller keeps a handle to.
    ///
    /// # Errors
    /// Returns an error if a concept with the same name is already registered.
    pub fn register_shared(&mut self, concept: Arc<dyn Concept>) -> Result<()> {
        let name = concept.name().to_string();
        if self.concepts.contains_key(&name) {
            return Err(Error::duplicate_concept(name));
        }
        self.concepts.insert(name, concept);
        Ok(())
    }

    /// Looks up a concept.
    ///
    /// # Errors
    /// Returns an error if no concept has that name.
    pub fn get(&self, name: &str) -> Result<&Arc<dyn Concept>> {
        self.concepts
            .get(name)
            .ok_or_else(|| Error::unknown_concept(name))
    }

    /// Returns true if a concept has that name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.concepts.contains_key(name)
    }

    /// Registered concept names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.concepts.keys().map(String::as_str)
    }

    /// Returns the number of registered concepts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    /// Returns true if no concepts are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Checks that `signature` names a declared action.
    ///
    /// # Errors
    /// Unknown concept or undeclared action.
    pub fn check_action(&self, signature: &ActionSignature) -> Result<&Arc<dyn Concept>> {
        let concept = self.get(signature.concept())?;
        if concept.actions().contains(&signature.operation()) {
            Ok(concept)
        } else {
            Err(Error::unknown_action(
                signature.concept(),
                signature.operation(),
            ))
        }
    }

    /// Checks that `signature` names a declared query.
    ///
    /// # Errors
    /// Unknown concept or undeclared query.
    pub fn check_query(&self, signature: &ActionSignature) -> Result<&Arc<dyn Concept>> {
        let concept = self.get(signature.concept())?;
        if concept.queries().contains(&signature.operation()) {
            Ok(concept)
        } else {
            Err(Error::unknown_query(
                signature.concept(),
                signature.operation(),
            ))
        }
    }

    /// Invokes an action.
    ///
    /// # Errors
    /// Unknown signature, or an infrastructure failure inside the concept.
    pub async fn perform(&self, signature: &ActionSignature, args: Record) -> Result<Record> {
        let concept = Arc::clone(self.check_action(signature)?);
        trace!(%signature, %args, "performing action");
        concept
            .perform(signature.operation(), args)
            .await
            .map_err(|e| attach_signature(e, signature))
    }

    /// Invokes a query.
    ///
    /// # Errors
    /// Unknown signature, or an infrastructure failure inside the concept.
    pub async fn query(&self, signature: &ActionSignature, args: Record) -> Result<Vec<Record>> {
        let concept = Arc::clone(self.check_query(signature)?);
        trace!(%signature, %args, "running query");
        let results = concept
            .query(signature.operation(), args)
            .await
            .map_err(|e| attach_signature(e, signature))?;
        if results.iter().any(Record::is_error) {
            warn!(%signature, "query returned an error-shaped record");
        }
        Ok(results)
    }
}

impl std::fmt::Debug for ConceptRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

fn attach_signature(error: Error, signature: &ActionSignature) -> Error {
    if error.context.is_some() {
        return error;
    }
    error.with_context(ErrorContext::new().with_signature(signature.to_string()))
}

// =============================================================================
// Tests
// =============================================================================
