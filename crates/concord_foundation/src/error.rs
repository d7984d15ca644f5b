//! Error types for the Concord system.
//!
//! Expected failures of a concept (validation, missing records, denied
//! access) are *not* errors here: they travel as `error`-bearing records
//! through frames. This type covers configuration mistakes, infrastructure
//! failures, and tripped limits.

use std::fmt;

use thiserror::Error;

use crate::value::Value;

/// The main error type for Concord operations.
#[derive(Debug, Error)]
#[error("{kind}{}", .context.as_ref().map(|c| format!(" ({c})")).unwrap_or_default())]
pub struct Error {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Where in a cascade it went wrong, if known.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates a binding conflict error.
    #[must_use]
    pub fn binding_conflict(variable: impl Into<String>, existing: Value, incoming: Value) -> Self {
        Self::new(ErrorKind::BindingConflict {
            variable: variable.into(),
            existing,
            incoming,
        })
    }

    /// Creates an unbound variable error.
    #[must_use]
    pub fn unbound_variable(variable: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnboundVariable {
            variable: variable.into(),
        })
    }

    /// Creates an invalid rule (configuration) error.
    #[must_use]
    pub fn invalid_rule(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRule {
            rule: rule.into(),
            reason: reason.into(),
        })
    }

    /// Creates an unknown concept error.
    #[must_use]
    pub fn unknown_concept(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownConcept(name.into()))
    }

    /// Creates a duplicate concept registration error.
    #[must_use]
    pub fn duplicate_concept(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateConcept(name.into()))
    }

    /// Creates an unknown action error.
    #[must_use]
    pub fn unknown_action(concept: impl Into<String>, action: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownAction {
            concept: concept.into(),
            action: action.into(),
        })
    }

    /// Creates an unknown query error.
    #[must_use]
    pub fn unknown_query(concept: impl Into<String>, query: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownQuery {
            concept: concept.into(),
            query: query.into(),
        })
    }

    /// Creates an infrastructure failure error raised by a concept.
    #[must_use]
    pub fn concept_failure(
        concept: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::ConceptFailure {
            concept: concept.into(),
            operation: operation.into(),
            message: message.into(),
        })
    }

    /// Creates a semantic limit exceeded error.
    #[must_use]
    pub fn limit_exceeded(limit: SemanticLimit) -> Self {
        Self::new(ErrorKind::LimitExceeded(limit))
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(operation: impl Into<String>, millis: u64) -> Self {
        Self::new(ErrorKind::Timeout {
            operation: operation.into(),
            millis,
        })
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }

    /// Returns true if this is a registration-time configuration error.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::InvalidRule { .. }
                | ErrorKind::UnknownConcept(_)
                | ErrorKind::DuplicateConcept(_)
                | ErrorKind::UnknownAction { .. }
                | ErrorKind::UnknownQuery { .. }
        )
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// A variable was bound to two different values in one frame.
    #[error("binding conflict on ?{variable}: {existing} vs {incoming}")]
    BindingConflict {
        /// The variable name.
        variable: String,
        /// The value already bound.
        existing: Value,
        /// The value that disagreed.
        incoming: Value,
    },

    /// A template referenced a variable with no value in the frame.
    #[error("unbound variable ?{variable}")]
    UnboundVariable {
        /// The variable name.
        variable: String,
    },

    /// A rule failed registration-time validation.
    #[error("invalid rule {rule}: {reason}")]
    InvalidRule {
        /// The rule name.
        rule: String,
        /// What is wrong with it.
        reason: String,
    },

    /// No concept is registered under this name.
    #[error("unknown concept: {0}")]
    UnknownConcept(String),

    /// Two concepts were registered under the same name.
    #[error("concept registered twice: {0}")]
    DuplicateConcept(String),

    /// The concept does not declare this action.
    #[error("unknown action: {concept}.{action}")]
    UnknownAction {
        /// The concept name.
        concept: String,
        /// The action name.
        action: String,
    },

    /// The concept does not declare this query.
    #[error("unknown query: {concept}.{query}")]
    UnknownQuery {
        /// The concept name.
        concept: String,
        /// The query name.
        query: String,
    },

    /// A concept failed unexpectedly (storage, network, ...).
    #[error("{concept}.{operation} failed: {message}")]
    ConceptFailure {
        /// The concept name.
        concept: String,
        /// The action or query that failed.
        operation: String,
        /// Description of the failure.
        message: String,
    },

    /// A cascade outgrew one of its guards.
    #[error("limit exceeded: {0}")]
    LimitExceeded(SemanticLimit),

    /// Waiting on an asynchronous outcome took too long.
    #[error("timed out after {millis}ms waiting for {operation}")]
    Timeout {
        /// What was being waited for.
        operation: String,
        /// The timeout that elapsed.
        millis: u64,
    },

    /// Conversion between external data and records failed.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// A broken engine invariant.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Guards that stop a runaway cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticLimit {
    /// A cascade re-entered the matcher too many times.
    MaxCascadeDepth {
        /// The configured limit.
        limit: u32,
        /// The rule whose dispatch tripped the limit.
        rule: Option<String>,
    },
    /// Too many actions dispatched within one flow.
    MaxDispatches {
        /// The configured limit.
        limit: u32,
    },
}

impl fmt::Display for SemanticLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxCascadeDepth { limit, rule } => {
                write!(f, "max cascade depth ({limit}) exceeded")?;
                if let Some(rule) = rule {
                    write!(f, " in rule {rule}")?;
                }
                Ok(())
            }
            Self::MaxDispatches { limit } => {
                write!(f, "max dispatches per flow ({limit}) exceeded")
            }
        }
    }
}

/// Where in a cascade an error surfaced.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The rule being evaluated, if any.
    pub rule: Option<String>,
    /// The action or query signature involved (`Concept.operation`).
    pub signature: Option<String>,
    /// The chain of actions that led here, outermost first.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rule name.
    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    /// Sets the signature.
    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(rule) = &self.rule {
            parts.push(format!("rule {rule}"));
        }
        if let Some(sig) = &self.signature {
            parts.push(format!("at {sig}"));
        }
        if !self.stack.is_empty() {
            parts.push(format!("via {}", self.stack.join(" -> ")));
        }
        write!(f, "{}", parts.join(", "))
    }
}
