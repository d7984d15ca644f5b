//! Request/response plumbing for Concord.
//!
//! External callers never talk to concepts directly. A request is recorded as
//! a `Requesting.request` action, rules react to it, and some rule eventually
//! dispatches `Requesting.respond`. The [`Gateway`] turns that round trip into
//! a single awaitable call.
//!
//! This crate provides:
//! - [`Requesting`] - The request/response concept
//! - [`Gateway`] - Routes a path and body to a passthrough call or a request
//! - [`GatewayConfig`] - Base path, timeout, and passthrough routes

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod gateway;
pub mod requesting;

pub use config::GatewayConfig;
pub use gateway::{Gateway, Route};
pub use requesting::Requesting;
