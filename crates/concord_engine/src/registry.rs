//! The static, ordered set of registered rules.
//!
//! Registration order is dispatch order. Rules are indexed by the action
//! signatures they trigger on, so a fresh record only visits the rules that
//! can possibly match it.

use std::collections::HashMap;
use std::sync::Arc;

use concord_foundation::{Error, Result};

use crate::action::ActionSignature;
use crate::concept::ConceptRegistry;
use crate::rule::{Rule, validate};

/// Registered rules, in registration order.
#[derive(Clone, Debug, Default)]
pub struct RuleRegistry {
    rules: Vec<Arc<Rule>>,
    by_signature: HashMap<ActionSignature, Vec<usize>>,
}

impl RuleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a rule.
    ///
    /// # Errors
    /// Returns an invalid rule error if a rule with the same name exists.
    pub fn register(&mut self, rule: Rule) -> Result<()> {
        if self.get(rule.name()).is_some() {
            return Err(Error::invalid_rule(rule.name(), "a rule with this name is already registered"));
        }

        let index = self.rules.len();
        let mut signatures: Vec<&ActionSignature> = rule.when().iter().map(|c| &c.signature).collect();
        signatures.sort();
        signatures.dedup();
        for signature in signatures {
            self.by_signature.entry(signature.clone()).or_default().push(index);
        }
        self.rules.push(Arc::new(rule));
        Ok(())
    }

    /// Registers several rules, stopping at the first failure.
    ///
    /// # Errors
    /// See [`register`](Self::register).
    pub fn register_all(&mut self, rules: impl IntoIterator<Item = Rule>) -> Result<()> {
        rules.into_iter().try_for_each(|rule| self.register(rule))
    }

    /// Looks up a rule by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<Rule>> {
        self.rules.iter().find(|r| r.name() == name)
    }

    /// All rules, in registration order.
    #[must_use]
    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    /// Rules with a trigger on `signature`, in registration order.
    pub fn candidates(&self, signature: &ActionSignature) -> impl Iterator<Item = &Arc<Rule>> {
        self.by_signature
            .get(signature)
            .into_iter()
            .flatten()
            .map(|&index| &self.rules[index])
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Checks every rule's signatures against the registered concepts.
    ///
    /// # Errors
    /// The first unknown concept, action or query.
    pub fn check_against(&self, concepts: &ConceptRegistry) -> Result<()> {
        self.rules
            .iter()
            .try_for_each(|rule| validate::check_signatures(rule, concepts))
    }
}
