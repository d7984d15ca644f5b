//! Cascade tracing for Concord.
//!
//! This crate provides:
//! - [`Tracer`] - Records cascade events into a bounded ring buffer
//! - [`TraceFormat`] - Renders records as indented lines or JSON
//! - [`SharedTracer`] - A tracer that attaches to an engine as its observer
//! - [`TracerConfig`] - What to keep and where to echo it

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod observer;
pub mod trace;

pub use config::TracerConfig;
pub use observer::SharedTracer;
pub use trace::{TraceBuffer, TraceEvent, TraceFormat, TraceRecord, Tracer};
