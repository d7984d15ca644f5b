//! Turning external calls into actions.
//!
//! The gateway knows nothing about any transport. A server hands it a path
//! and a body; it answers with a record or an error.
//!
//! ```text
//! /api/UserAuthentication/login   (included)  -> UserAuthentication.login
//! /api/UserIdentity/_getUserById  (included)  -> {results: [...]}
//! /api/UserIdentity/updateUserName            -> Requesting.request, await respond
//! ```

use std::sync::Arc;

use concord_engine::{ActionSignature, Engine};
use concord_foundation::{Error, Record, Result, Value, record};
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::requesting::Requesting;

// =============================================================================
// Route
// =============================================================================

/// Where a path goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// Straight to a concept action or query.
    Passthrough(ActionSignature),
    /// Through `Requesting.request`, with the path relative to the base.
    Request(String),
}

/// Parses `/Concept/operation`.
fn parse_signature(relative: &str) -> Option<ActionSignature> {
    let mut segments = relative.strip_prefix('/')?.split('/');
    let concept = segments.next().filter(|s| !s.is_empty())?;
    let operation = segments.next().filter(|s| !s.is_empty())?;
    if segments.next().is_some() {
        return None;
    }
    Some(ActionSignature::new(concept, operation))
}

// =============================================================================
// Gateway
// =============================================================================

/// Routes external calls into an engine.
#[derive(Clone, Debug)]
pub struct Gateway {
    engine: Engine,
    requesting: Arc<Requesting>,
    config: GatewayConfig,
}

impl Gateway {
    /// Creates a gateway.
    ///
    /// `requesting` must be the instance registered with `engine`.
    ///
    /// # Errors
    /// The engine has no `Requesting` concept, or a passthrough route is
    /// malformed or names an undeclared action or query.
    pub fn new(engine: Engine, requesting: Arc<Requesting>, config: GatewayConfig) -> Result<Self> {
        engine
            .concepts()
            .check_action(&Requesting::signature("request"))?;

        for route in config.inclusions.keys() {
            if config.exclusions.contains(route) {
                warn!(route, "route is both included and excluded; excluding");
                continue;
            }
            let signature = config
                .relative(route)
                .and_then(parse_signature)
                .ok_or_else(|| Error::internal(format!("malformed passthrough route: {route}")))?;
            if signature.is_query() {
                engine.concepts().check_query(&signature)?;
            } else {
                engine.concepts().check_action(&signature)?;
            }
        }

        debug!(
            base = %config.base_path,
            passthrough = config.inclusions.len(),
            "gateway ready"
        );
        Ok(Self {
            engine,
            requesting,
            config,
        })
    }

    /// The engine calls are routed into.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Decides where `path` goes.
    #[must_use]
    pub fn route(&self, path: &str) -> Route {
        let relative = self.config.relative(path).unwrap_or(path);
        if self.config.is_passthrough(path) {
            if let Some(signature) = parse_signature(relative) {
                return Route::Passthrough(signature);
            }
        }
        Route::Request(relative.to_string())
    }

    /// Handles one external call.
    ///
    /// Passthrough actions answer with their result record and passthrough
    /// queries with `{results: [...]}`. Everything else answers with whatever
    /// a rule passes to `Requesting.respond`, minus the request id.
    ///
    /// # Errors
    /// Infrastructure failure in the cascade, or no response within the
    /// configured timeout.
    pub async fn handle(&self, path: &str, body: Record) -> Result<Record> {
        match self.route(path) {
            Route::Passthrough(signature) if signature.is_query() => {
                debug!(%signature, "passthrough query");
                let rows = self.engine.query(&signature, body).await?;
                let results: Value = Value::List(rows.into_iter().map(Record::into_value).collect());
                Ok(record! { "results" => results })
            }
            Route::Passthrough(signature) => {
                debug!(%signature, "passthrough action");
                let cascade = self.engine.invoke(signature, body).await?;
                Ok(cascade.output().clone())
            }
            Route::Request(relative) => self.request(&relative, body).await,
        }
    }

    async fn request(&self, relative: &str, body: Record) -> Result<Record> {
        let id = self.requesting.next_request_id();
        let response = self.open_and_wait(&id, relative, body).await;
        // Forgotten whether or not the cascade behind it succeeded.
        self.requesting.forget(&id);
        if let Err(error) = &response {
            warn!(request = %id, path = relative, %error, "no response");
        }
        response
    }

    async fn open_and_wait(&self, id: &str, relative: &str, body: Record) -> Result<Record> {
        let args = body.with("path", relative).with("request", id);
        let cascade = self.engine.invoke(Requesting::signature("request"), args).await?;
        let output = cascade.output();
        if output.get_str("request") != Some(id) {
            return Ok(output.clone());
        }

        debug!(request = id, path = relative, flow = %cascade.flow, "awaiting response");
        self.requesting.wait_for(id, self.config.timeout).await
    }
}

// =============================================================================
// Tests
// =============================================================================
