//! Tracer configuration.

use crate::observer::SharedTracer;
use crate::trace::TraceFormat;

/// What a [`Tracer`](crate::Tracer) keeps and where it echoes.
///
/// ```ignore
/// let tracer = TracerConfig::new().enabled().only(["rule-matched", "flow-end"]).build();
/// let engine = engine.with_observer(tracer.observer());
/// ```
#[derive(Clone, Debug)]
pub struct TracerConfig {
    /// Off means every hook returns at once.
    pub enabled: bool,

    /// Records kept before the oldest is evicted.
    pub capacity: usize,

    /// How records are rendered, both when echoed and when asked for.
    pub format: TraceFormat,

    /// Echo each record to stderr as it is recorded.
    pub echo: bool,

    /// Event types to keep (`"flow-start"`, `"rule-matched"`, ...). Empty keeps all.
    pub only: Vec<String>,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            capacity: 10_000,
            format: TraceFormat::Human,
            echo: false,
            only: Vec::new(),
        }
    }
}

impl TracerConfig {
    /// Disabled, human format, 10 000 records.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enabled, a smaller buffer, and every record echoed to stderr.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            capacity: 1000,
            echo: true,
            ..Self::default()
        }
    }

    /// Builder method to turn tracing on.
    #[must_use]
    pub fn enabled(mut self) -> Self {
        self.enabled = true;
        self
    }

    /// Builder method to set the buffer capacity.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Builder method to render as JSON.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.format = TraceFormat::Json;
        self
    }

    /// Builder method to echo records to stderr.
    #[must_use]
    pub fn echo(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Builder method to keep only some event types.
    #[must_use]
    pub fn only<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = types.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if events of `event_type` are kept.
    #[must_use]
    pub fn keeps(&self, event_type: &str) -> bool {
        self.only.is_empty() || self.only.iter().any(|t| t == event_type)
    }

    /// A tracer with this configuration, ready to attach to an engine.
    #[must_use]
    pub fn build(self) -> SharedTracer {
        SharedTracer::new(self)
    }
}
