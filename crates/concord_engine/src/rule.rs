//! Declarative when/where/then rules.
//!
//! A rule reacts to completed actions (`when`), refines its frames with
//! queries and filters (`where`), and invokes further actions with values
//! from each surviving frame (`then`). Rules are immutable once built and
//! are validated when built, so a bad rule fails before any traffic.

pub mod validate;

use std::fmt;
use std::sync::Arc;

use concord_foundation::Result;

use crate::action::ActionSignature;
use crate::frame::Var;
use crate::pattern::{Pattern, Template};
use crate::query::WhereStep;

// =============================================================================
// Clauses
// =============================================================================

/// A trigger: an action signature plus patterns over its input and output.
#[derive(Clone, Debug, PartialEq)]
pub struct WhenClause {
    /// The action that must have completed.
    pub signature: ActionSignature,
    /// Pattern over the action's arguments.
    pub input: Pattern,
    /// Pattern over the action's result.
    pub output: Pattern,
}

impl WhenClause {
    /// Creates a trigger.
    #[must_use]
    pub fn new(signature: ActionSignature, input: Pattern, output: Pattern) -> Self {
        Self {
            signature,
            input,
            output,
        }
    }
}

/// An effect: an action to invoke with arguments built from a frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ThenClause {
    /// The action to invoke.
    pub signature: ActionSignature,
    /// Its arguments.
    pub args: Template,
}

impl ThenClause {
    /// Creates an effect.
    #[must_use]
    pub fn new(signature: ActionSignature, args: Template) -> Self {
        Self { signature, args }
    }
}

// =============================================================================
// Rule
// =============================================================================

/// A validated synchronization rule.
#[derive(Clone)]
pub struct Rule {
    name: Arc<str>,
    variables: Vec<Var>,
    when: Vec<WhenClause>,
    where_steps: Vec<WhereStep>,
    then: Vec<ThenClause>,
}

impl Rule {
    /// Starts building a rule.
    #[must_use]
    pub fn builder(name: impl Into<Arc<str>>) -> RuleBuilder {
        RuleBuilder::new(name)
    }

    /// The rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared variables.
    #[must_use]
    pub fn variables(&self) -> &[Var] {
        &self.variables
    }

    /// Trigger clauses.
    #[must_use]
    pub fn when(&self) -> &[WhenClause] {
        &self.when
    }

    /// Refinement steps.
    #[must_use]
    pub fn where_steps(&self) -> &[WhereStep] {
        &self.where_steps
    }

    /// Effects, in dispatch order.
    #[must_use]
    pub fn then(&self) -> &[ThenClause] {
        &self.then
    }

    /// Returns true if any trigger clause is on `signature`.
    #[must_use]
    pub fn triggers_on(&self, signature: &ActionSignature) -> bool {
        self.when.iter().any(|c| &c.signature == signature)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("variables", &self.variables)
            .field("when", &self.when)
            .field("where", &self.where_steps)
            .field("then", &self.then)
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builds a [`Rule`]; [`build`](Self::build) validates it.
#[derive(Clone, Debug)]
#[must_use]
pub struct RuleBuilder {
    name: Arc<str>,
    variables: Vec<Var>,
    when: Vec<WhenClause>,
    where_steps: Vec<WhereStep>,
    then: Vec<ThenClause>,
}

impl RuleBuilder {
    /// Starts a rule with the given name.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
            when: Vec::new(),
            where_steps: Vec::new(),
            then: Vec::new(),
        }
    }

    /// Declares variables.
    pub fn variables<'a>(mut self, vars: impl IntoIterator<Item = &'a Var>) -> Self {
        for var in vars {
            if !self.variables.contains(var) {
                self.variables.push(var.clone());
            }
        }
        self
    }

    /// Adds a trigger clause.
    pub fn when(mut self, signature: ActionSignature, input: Pattern, output: Pattern) -> Self {
        self.when.push(WhenClause::new(signature, input, output));
        self
    }

    /// Adds a refinement step.
    pub fn where_step(mut self, step: WhereStep) -> Self {
        self.where_steps.push(step);
        self
    }

    /// Adds an effect.
    pub fn then(mut self, signature: ActionSignature, args: Template) -> Self {
        self.then.push(ThenClause::new(signature, args));
        self
    }

    /// Validates and builds the rule.
    ///
    /// # Errors
    /// Returns an invalid rule error describing the first problem found.
    pub fn build(self) -> Result<Rule> {
        let rule = Rule {
            name: self.name,
            variables: self.variables,
            when: self.when,
            where_steps: self.where_steps,
            then: self.then,
        };
        validate::validate(&rule)?;
        Ok(rule)
    }
}
