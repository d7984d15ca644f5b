//! Configuration for the cascade dispatcher.

/// Limits and switches for [`Engine`](crate::Engine).
///
/// The rule set is expected to terminate on its own. These limits are kill
/// switches for rule sets that do not.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum nesting of rule-dispatched actions below the root call.
    pub max_depth: u32,

    /// Maximum number of rule-dispatched actions in one flow.
    pub max_dispatches: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_dispatches: 10_000,
        }
    }
}

impl EngineConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the maximum cascade depth.
    #[must_use]
    pub fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    /// Builder method to set the per-flow dispatch budget.
    #[must_use]
    pub fn with_max_dispatches(mut self, dispatches: u32) -> Self {
        self.max_dispatches = dispatches;
        self
    }
}
