//! Rendering trace records.
//!
//! Human output is one line per record, prefixed with the flow and indented
//! by cascade depth:
//!
//! ```text
//! flow-3 === Requesting.request {path: "/UserIdentity/updateUserName", sessionID: "nope"} ===
//! flow-3   DONE Requesting.request {...} -> {request: "req-1"}
//! flow-3   MATCHED UpdateNameAuthError on Requesting.request {?request=req-1, ?sessionID=nope}
//! flow-3   WHERE UpdateNameAuthError 1 -> 1 frames
//! flow-3     THEN (UpdateNameAuthError) Requesting.respond {error: "...", request: "req-1"}
//! flow-3 === QUIESCENT (2 actions) ===
//! ```
//!
//! JSON output is one object per record with `id`, `flow`, `elapsed_ns`,
//! `type` and the event's own fields flattened in.

use std::fmt::Write;

use serde_json::{Map, Value as Json, json};

use super::record::{TraceEvent, TraceRecord};

/// How records are rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TraceFormat {
    /// One indented line per record.
    #[default]
    Human,
    /// One JSON object per record; several records make an array.
    Json,
}

impl TraceFormat {
    /// Renders one record.
    #[must_use]
    pub fn render(self, record: &TraceRecord) -> String {
        match self {
            Self::Human => human(record),
            Self::Json => to_json(record).to_string(),
        }
    }

    /// Renders several records: lines for humans, an array for JSON.
    #[must_use]
    pub fn render_all(self, records: &[&TraceRecord]) -> String {
        match self {
            Self::Human => records
                .iter()
                .map(|r| human(r))
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Json => Json::Array(records.iter().map(|r| to_json(r)).collect()).to_string(),
        }
    }
}

fn indent(depth: u32) -> String {
    "  ".repeat(depth as usize + 1)
}

/// Renders a record for reading.
#[must_use]
pub fn human(record: &TraceRecord) -> String {
    let mut line = format!("{} ", record.flow);
    // Writing to a String cannot fail.
    let _ = match &record.event {
        TraceEvent::FlowStart { signature, args } => write!(line, "=== {signature} {args} ==="),
        TraceEvent::FlowEnd { records, error: None } => {
            write!(line, "=== QUIESCENT ({records} actions) ===")
        }
        TraceEvent::FlowEnd {
            records,
            error: Some(error),
        } => write!(line, "=== STOPPED ({records} actions): {error} ==="),
        TraceEvent::ActionCompleted {
            signature,
            input,
            output,
            depth,
        } => write!(line, "{}DONE {signature} {input} -> {output}", indent(*depth)),
        TraceEvent::RuleMatched {
            rule,
            trigger,
            frames,
            bindings,
        } => {
            let bound: Vec<String> = bindings.iter().map(|(k, v)| format!("?{k}={v}")).collect();
            let _ = write!(line, "  MATCHED {rule} on {trigger} {{{}}}", bound.join(", "));
            if *frames > 1 {
                write!(line, " (+{} more)", frames - 1)
            } else {
                Ok(())
            }
        }
        TraceEvent::WhereEvaluated {
            rule,
            input,
            output,
        } => write!(line, "  WHERE {rule} {input} -> {output} frames"),
        TraceEvent::ActionDispatched {
            rule,
            signature,
            args,
            depth,
        } => write!(line, "{}THEN ({rule}) {signature} {args}", indent(*depth)),
        TraceEvent::Custom { name, data } => write!(line, "  NOTE {name}: {data}"),
    };
    line
}

/// Renders a record as a JSON object.
#[must_use]
pub fn to_json(record: &TraceRecord) -> Json {
    let fields = match &record.event {
        TraceEvent::FlowStart { signature, args } => {
            json!({ "signature": signature, "args": args.to_json() })
        }
        TraceEvent::FlowEnd { records, error } => json!({ "records": records, "error": error }),
        TraceEvent::ActionCompleted {
            signature,
            input,
            output,
            depth,
        } => json!({
            "signature": signature,
            "input": input.to_json(),
            "output": output.to_json(),
            "depth": depth,
        }),
        TraceEvent::RuleMatched {
            rule,
            trigger,
            frames,
            bindings,
        } => {
            let bindings: Map<String, Json> = bindings
                .iter()
                .map(|(k, v)| (k.clone(), Json::from(v)))
                .collect();
            json!({ "rule": rule, "trigger": trigger, "frames": frames, "bindings": bindings })
        }
        TraceEvent::WhereEvaluated {
            rule,
            input,
            output,
        } => json!({ "rule": rule, "input": input, "output": output }),
        TraceEvent::ActionDispatched {
            rule,
            signature,
            args,
            depth,
        } => json!({
            "rule": rule,
            "signature": signature,
            "args": args.to_json(),
            "depth": depth,
        }),
        TraceEvent::Custom { name, data } => json!({ "name": name, "data": Json::from(data) }),
    };

    let mut object = Map::new();
    object.insert("id".into(), json!(record.id));
    object.insert("flow".into(), json!(record.flow.get()));
    object.insert("elapsed_ns".into(), json!(record.elapsed_ns));
    object.insert("type".into(), json!(record.event_type()));
    if let Json::Object(fields) = fields {
        object.extend(fields);
    }
    Json::Object(object)
}
