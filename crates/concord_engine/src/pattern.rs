//! Record patterns and argument templates.
//!
//! A [`Pattern`] is a partial description of a record: each named field is a
//! variable to bind (or check, if already bound), a literal to match exactly,
//! a wildcard, or a demand that the field be absent. Fields the pattern does
//! not name are ignored, so patterns match structurally rather than exactly.
//!
//! A [`Template`] is the inverse: it builds a record from a frame.

use std::collections::HashSet;
use std::sync::Arc;

use concord_foundation::{Error, Record, Result, Value};

use crate::frame::{Frame, Var};

// =============================================================================
// Pattern
// =============================================================================

/// What a pattern demands of one field.
#[derive(Clone, Debug, PartialEq)]
pub enum PatternValue {
    /// Bind to a variable on first use, check equality on repeat use.
    Variable(Var),
    /// Match a literal value exactly.
    Literal(Value),
    /// The field must be present; its value is ignored.
    Wildcard,
    /// The field must not be present (e.g. `error` on a success path).
    Absent,
}

/// A partial record pattern.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pattern {
    fields: Vec<(Arc<str>, PatternValue)>,
}

impl Pattern {
    /// Creates a pattern that matches every record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field demand.
    #[must_use]
    pub fn field(mut self, name: impl Into<Arc<str>>, value: PatternValue) -> Self {
        self.fields.push((name.into(), value));
        self
    }

    /// Binds the field to a variable.
    #[must_use]
    pub fn bind(self, name: impl Into<Arc<str>>, var: &Var) -> Self {
        self.field(name, PatternValue::Variable(var.clone()))
    }

    /// Requires the field to equal a literal.
    #[must_use]
    pub fn equals(self, name: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        self.field(name, PatternValue::Literal(value.into()))
    }

    /// Requires the field to be present with any value.
    #[must_use]
    pub fn present(self, name: impl Into<Arc<str>>) -> Self {
        self.field(name, PatternValue::Wildcard)
    }

    /// Requires the field to be absent.
    #[must_use]
    pub fn absent(self, name: impl Into<Arc<str>>) -> Self {
        self.field(name, PatternValue::Absent)
    }

    /// Returns the field demands in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[(Arc<str>, PatternValue)] {
        &self.fields
    }

    /// Returns the variables this pattern binds.
    pub fn variables(&self) -> impl Iterator<Item = &Var> {
        self.fields.iter().filter_map(|(_, v)| match v {
            PatternValue::Variable(var) => Some(var),
            _ => None,
        })
    }

    /// Returns the first field named twice, if any.
    #[must_use]
    pub fn duplicate_field(&self) -> Option<&str> {
        first_duplicate(self.fields.iter().map(|(name, _)| name.as_ref()))
    }

    /// Unifies the pattern with a record, extending `frame`.
    ///
    /// Returns `None` if a literal differs, a required field is missing, a
    /// forbidden field is present, or a variable disagrees with its binding.
    #[must_use]
    pub fn unify(&self, record: &Record, frame: &Frame) -> Option<Frame> {
        let mut frame = frame.clone();
        for (name, demand) in &self.fields {
            let actual = record.get(name);
            match (demand, actual) {
                (PatternValue::Absent, None) => {}
                (PatternValue::Absent, Some(_)) | (_, None) => return None,
                (PatternValue::Wildcard, Some(_)) => {}
                (PatternValue::Literal(expected), Some(value)) => {
                    if expected != value {
                        return None;
                    }
                }
                (PatternValue::Variable(var), Some(value)) => {
                    frame = frame.unify(var, value)?;
                }
            }
        }
        Some(frame)
    }
}

// =============================================================================
// Template
// =============================================================================

/// What a template puts in one field.
#[derive(Clone, Debug, PartialEq)]
pub enum TemplateValue {
    /// The value bound to a variable.
    Variable(Var),
    /// A fixed value.
    Literal(Value),
}

/// Builds argument records from frames.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Template {
    fields: Vec<(Arc<str>, TemplateValue)>,
}

impl Template {
    /// Creates an empty template (produces an empty record).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills the field from a variable.
    #[must_use]
    pub fn var(mut self, name: impl Into<Arc<str>>, var: &Var) -> Self {
        self.fields
            .push((name.into(), TemplateValue::Variable(var.clone())));
        self
    }

    /// Fills the field with a literal.
    #[must_use]
    pub fn literal(mut self, name: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        self.fields
            .push((name.into(), TemplateValue::Literal(value.into())));
        self
    }

    /// Returns the fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[(Arc<str>, TemplateValue)] {
        &self.fields
    }

    /// Returns the variables this template reads.
    pub fn variables(&self) -> impl Iterator<Item = &Var> {
        self.fields.iter().filter_map(|(_, v)| match v {
            TemplateValue::Variable(var) => Some(var),
            TemplateValue::Literal(_) => None,
        })
    }

    /// Returns the first field named twice, if any.
    #[must_use]
    pub fn duplicate_field(&self) -> Option<&str> {
        first_duplicate(self.fields.iter().map(|(name, _)| name.as_ref()))
    }

    /// Substitutes bound values into the template.
    ///
    /// # Errors
    /// Returns an unbound variable error if a variable has no value in `frame`.
    pub fn instantiate(&self, frame: &Frame) -> Result<Record> {
        self.fields
            .iter()
            .try_fold(Record::new(), |record, (name, value)| {
                let value = match value {
                    TemplateValue::Literal(v) => v.clone(),
                    TemplateValue::Variable(var) => frame
                        .get(var)
                        .cloned()
                        .ok_or_else(|| Error::unbound_variable(var.name()))?,
                };
                Ok(record.with(name.clone(), value))
            })
    }
}

fn first_duplicate<'a>(names: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = HashSet::new();
    names.into_iter().find(|name| !seen.insert(*name))
}

// =============================================================================
// Tests
// =============================================================================
