//! Gateway configuration.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Configuration for a [`Gateway`](crate::Gateway).
///
/// Routes are full paths including the base path, for example
/// `/api/UserAuthentication/login`.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Prefix every route lives under.
    pub base_path: String,

    /// How long to wait for a rule to respond to a request.
    pub timeout: Duration,

    /// Routes passed straight to their concept, each with a justification.
    pub inclusions: BTreeMap<String, String>,

    /// Routes that always go through `Requesting.request`.
    pub exclusions: BTreeSet<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_path: "/api".to_string(),
            timeout: Duration::from_secs(10),
            inclusions: BTreeMap::new(),
            exclusions: BTreeSet::new(),
        }
    }
}

impl GatewayConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the base path.
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Builder method to set the response timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder method to pass a route straight through.
    #[must_use]
    pub fn include(mut self, route: impl Into<String>, justification: impl Into<String>) -> Self {
        self.inclusions.insert(route.into(), justification.into());
        self
    }

    /// Builder method to force a route through `Requesting.request`.
    #[must_use]
    pub fn exclude(mut self, route: impl Into<String>) -> Self {
        self.exclusions.insert(route.into());
        self
    }

    /// Returns true if `route` is passed straight through.
    ///
    /// An excluded route is never passed through, even if also included.
    #[must_use]
    pub fn is_passthrough(&self, route: &str) -> bool {
        self.inclusions.contains_key(route) && !self.exclusions.contains(route)
    }

    /// Strips the base path from `route`, if it is under it.
    #[must_use]
    pub fn relative<'a>(&self, route: &'a str) -> Option<&'a str> {
        let base = self.base_path.trim_end_matches('/');
        route
            .strip_prefix(base)
            .filter(|rest| rest.starts_with('/'))
    }
}
