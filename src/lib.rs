//! Concord - Declarative synchronization rules composing independent concepts
//!
//! This crate re-exports all layers of the Concord system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: concord_debug      - Cascade tracing and formatters
//!          concord_runtime    - Requesting concept, gateway, passthrough routes
//! Layer 1: concord_engine     - Frames, rules, where steps, cascade dispatch
//! Layer 0: concord_foundation - Core types (Value, Record, Error)
//! ```

pub use concord_debug as debug;
pub use concord_engine as engine;
pub use concord_foundation as foundation;
pub use concord_runtime as runtime;
