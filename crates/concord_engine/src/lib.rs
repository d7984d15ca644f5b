//! Rule matching, frame joins, and cascade dispatch for Concord.
//!
//! Concepts never call each other. Every completed action is offered to the
//! registered rules; a rule that matches extends its frames through queries
//! and dispatches further actions, whose records are offered to the rules in
//! turn until the cascade goes quiet.
//!
//! This crate provides:
//! - [`Frame`] / [`FrameSet`] - Variable bindings and their ordered alternatives
//! - [`Pattern`] / [`Template`] - Record matching and argument construction
//! - [`Concept`] / [`ConceptRegistry`] - The contract collaborating modules implement
//! - [`Rule`] / [`RuleRegistry`] - Declarative when/where/then rules, validated at registration
//! - [`RuleMatcher`] - Unifies fresh action records with rule triggers
//! - [`WhereStep`] - Query fan-out, filtering, and error-marker injection
//! - [`Engine`] - The cascade dispatcher

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod action;
pub mod concept;
pub mod config;
pub mod dispatch;
pub mod flow;
pub mod frame;
pub mod matcher;
pub mod observer;
pub mod pattern;
pub mod query;
pub mod registry;
pub mod rule;

pub use action::{ActionId, ActionRecord, ActionSignature};
pub use concept::{Concept, ConceptRegistry};
pub use config::EngineConfig;
pub use dispatch::{Cascade, Engine};
pub use flow::{Flow, FlowId};
pub use frame::{Frame, FrameSet, Var, vars};
pub use matcher::RuleMatcher;
pub use observer::{CascadeObserver, NoopObserver};
pub use pattern::{Pattern, PatternValue, Template, TemplateValue};
pub use query::{OnEmpty, QueryStep, Refinement, WhereStep};
pub use registry::RuleRegistry;
pub use rule::{Rule, RuleBuilder, ThenClause, WhenClause};
