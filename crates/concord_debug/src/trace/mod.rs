//! Recording cascades.
//!
//! A [`Tracer`] turns observer hooks into [`TraceRecord`]s: the root call,
//! every completed action, which rules matched, what their `where` steps
//! left, and what they dispatched. A disabled tracer does nothing at all.

pub mod buffer;
pub mod format;
pub mod record;

pub use buffer::TraceBuffer;
pub use format::{TraceFormat, human, to_json};
pub use record::{TraceEvent, TraceRecord};

use std::io::{self, Write};
use std::time::Instant;

use concord_engine::FlowId;
use concord_foundation::Value;

use crate::config::TracerConfig;

/// Records cascade events into a bounded buffer.
#[derive(Debug)]
pub struct Tracer {
    config: TracerConfig,
    buffer: TraceBuffer,
    epoch: Instant,
}

impl Tracer {
    /// Creates a tracer.
    #[must_use]
    pub fn new(config: TracerConfig) -> Self {
        Self {
            buffer: TraceBuffer::new(config.capacity),
            config,
            epoch: Instant::now(),
        }
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    /// Returns whether events are being recorded.
    #[must_use]
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Turns recording on or off. Buffered records are kept either way.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    /// Changes how records are rendered from now on.
    pub fn set_format(&mut self, format: TraceFormat) {
        self.config.format = format;
    }

    /// Records an event for `flow`.
    pub fn record(&mut self, flow: FlowId, event: TraceEvent) {
        if !self.config.enabled || !self.config.keeps(event.event_type()) {
            return;
        }

        let elapsed = u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX);
        let id = self.buffer.push(flow, elapsed, event);
        if self.config.echo {
            if let Some(record) = self.buffer.get(id) {
                let _ = writeln!(io::stderr().lock(), "{}", self.render(record));
            }
        }
    }

    /// Records an application note for `flow`.
    pub fn note(&mut self, flow: FlowId, name: impl Into<String>, data: impl Into<Value>) {
        self.record(
            flow,
            TraceEvent::Custom {
                name: name.into(),
                data: data.into(),
            },
        );
    }

    /// Renders one record in the configured format.
    #[must_use]
    pub fn render(&self, record: &TraceRecord) -> String {
        self.config.format.render(record)
    }

    /// Renders every buffered record of `flow`.
    #[must_use]
    pub fn render_flow(&self, flow: FlowId) -> String {
        self.config
            .format
            .render_all(&self.buffer.records_for_flow(flow))
    }

    /// The buffered records.
    #[must_use]
    pub fn buffer(&self) -> &TraceBuffer {
        &self.buffer
    }

    /// Drops every buffered record.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new(TracerConfig::default())
    }
}
