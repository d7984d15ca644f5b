//! Core values, records, and errors for Concord.
//!
//! This crate provides:
//! - [`Value`] - The value type carried by every action argument and result
//! - [`Record`] - Named fields exchanged with concepts (inputs, outputs, query rows)
//! - [`Error`] - Rich error types with context
//! - Persistent collections ([`Seq`], [`SortedMap`])

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod collections;
pub mod error;
#[cfg(feature = "serde")]
pub mod json;
pub mod record;
pub mod value;

pub use collections::{SortedMap, Seq};
pub use error::{Error, ErrorContext, ErrorKind, SemanticLimit};
pub use record::Record;
pub use value::Value;

/// Result type alias using Concord's Error.
pub type Result<T> = std::result::Result<T, Error>;
