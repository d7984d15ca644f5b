//! A scriptable concept shared by the engine tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use concord_engine::{ActionSignature, Concept, ConceptRegistry, Engine, Rule, RuleRegistry};
use concord_foundation::{Error, Record, Result, Value, record};

/// Logs every call.
///
/// - `start`, `emit`: echo their arguments
/// - `reject`: answers `{error: "rejected"}`
/// - `boom`: infrastructure failure
/// - `_items(n)`: `n` rows of `{item, label}`
#[derive(Default)]
pub struct Recorder {
    calls: Mutex<Vec<(String, Record)>>,
}

impl Recorder {
    pub fn calls(&self) -> Vec<(String, Record)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(op, _)| op == operation)
            .count()
    }
}

#[async_trait]
impl Concept for Recorder {
    fn name(&self) -> &str {
        "Recorder"
    }

    fn actions(&self) -> &[&str] {
        &["start", "emit", "reject", "boom"]
    }

    fn queries(&self) -> &[&str] {
        &["_items"]
    }

    async fn perform(&self, action: &str, args: Record) -> Result<Record> {
        self.calls
            .lock()
            .unwrap()
            .push((action.to_string(), args.clone()));
        match action {
            "reject" => Ok(Record::error("rejected")),
            "boom" => Err(Error::concept_failure("Recorder", action, "connection reset")),
            _ => Ok(args),
        }
    }

    async fn query(&self, query: &str, args: Record) -> Result<Vec<Record>> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), args.clone()));
        let n = args.get("n").and_then(Value::as_int).unwrap_or(0);
        Ok((0..n)
            .map(|i| record! { "item" => i, "label" => format!("item-{i}") })
            .collect())
    }
}

pub fn sig(operation: &str) -> ActionSignature {
    ActionSignature::new("Recorder", operation)
}

pub fn registry() -> (ConceptRegistry, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let mut concepts = ConceptRegistry::new();
    concepts.register_shared(recorder.clone()).unwrap();
    (concepts, recorder)
}

pub fn engine(rules: Vec<Rule>) -> (Engine, Arc<Recorder>) {
    let (concepts, recorder) = registry();
    let mut registry = RuleRegistry::new();
    registry.register_all(rules).unwrap();
    (Engine::new(concepts, registry).unwrap(), recorder)
}
