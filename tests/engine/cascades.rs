//! Cascade tests
//!
//! Tests ordering, joins, fan-out through dispatch, failure handling, and
//! the cascade guards.

use concord_engine::{ActionSignature, EngineConfig, Pattern, QueryStep, Rule, Template, WhereStep, vars};
use concord_foundation::{ErrorKind, Record, SemanticLimit, Value, record};

use crate::support::{engine, sig};

/// `start(n, tag)` fans out over `_items(n)` into one `then` per item.
fn fan_out(then: &str) -> Rule {
    let [n, tag, item] = vars(["n", "tag", "item"]);
    Rule::builder(format!("fan-out-{then}"))
        .variables([&n, &tag, &item])
        .when(sig("start"), Pattern::new().bind("n", &n).bind("tag", &tag), Pattern::new())
        .where_step(WhereStep::query(
            QueryStep::new(sig("_items"), Template::new().var("n", &n)).bind("item", &item),
        ))
        .then(sig(then), Template::new().var("tag", &tag).var("item", &item))
        .build()
        .unwrap()
}

fn dispatched(cascade: &concord_engine::Cascade) -> Vec<(ActionSignature, Record)> {
    cascade
        .dispatched()
        .iter()
        .map(|r| (r.signature.clone(), r.input.clone()))
        .collect()
}

// =============================================================================
// Ordering
// =============================================================================

#[tokio::test]
async fn dispatch_order_is_deterministic() {
    let [tag, item] = vars(["tag", "item"]);
    let follow_up = Rule::builder("follow-up")
        .variables([&tag, &item])
        .when(sig("emit"), Pattern::new().bind("tag", &tag).bind("item", &item), Pattern::new())
        .then(sig("reject"), Template::new().var("item", &item))
        .build()
        .unwrap();
    let rules = || vec![fan_out("emit"), follow_up.clone()];
    let args = record! { "n" => 3, "tag" => "t" };

    let (first_engine, _) = engine(rules());
    let first = first_engine.invoke(sig("start"), args.clone()).await.unwrap();
    let (second_engine, _) = engine(rules());
    let second = second_engine.invoke(sig("start"), args).await.unwrap();

    assert_eq!(dispatched(&first), dispatched(&second));

    // Depth first: each emit's follow-up runs before the next emit
    let order: Vec<_> = first
        .dispatched()
        .iter()
        .map(|r| {
            let item = r.input.get("item").and_then(Value::as_int).unwrap();
            format!("{}:{item}", r.signature.operation())
        })
        .collect();
    assert_eq!(
        order,
        vec!["emit:0", "reject:0", "emit:1", "reject:1", "emit:2", "reject:2"]
    );
}

#[tokio::test]
async fn then_entries_run_in_declaration_order() {
    let [x] = vars(["x"]);
    let rule = Rule::builder("two-effects")
        .variables([&x])
        .when(sig("start"), Pattern::new().bind("x", &x), Pattern::new())
        .then(sig("emit"), Template::new().var("x", &x).literal("step", 1))
        .then(sig("emit"), Template::new().var("x", &x).literal("step", 2))
        .build()
        .unwrap();
    let (engine, recorder) = engine(vec![rule]);

    let cascade = engine.invoke(sig("start"), record! { "x" => "a" }).await.unwrap();
    let steps: Vec<_> = cascade
        .dispatched()
        .iter()
        .filter_map(|r| r.input.get("step").and_then(Value::as_int))
        .collect();
    assert_eq!(steps, vec![1, 2]);
    assert_eq!(recorder.count("emit"), 2);
}

// =============================================================================
// Join Correctness
// =============================================================================

#[tokio::test]
async fn repeated_variable_must_agree_across_input_and_output() {
    let [x] = vars(["x"]);
    let rule = Rule::builder("agree")
        .variables([&x])
        .when(sig("start"), Pattern::new().bind("a", &x), Pattern::new().bind("b", &x))
        .then(sig("emit"), Template::new().var("x", &x))
        .build()
        .unwrap();
    let (engine, recorder) = engine(vec![rule]);

    let agree = engine
        .invoke(sig("start"), record! { "a" => 1, "b" => 1 })
        .await
        .unwrap();
    assert_eq!(agree.dispatched().len(), 1);
    assert_eq!(agree.dispatched()[0].input, record! { "x" => 1 });

    let conflict = engine
        .invoke(sig("start"), record! { "a" => 1, "b" => 2 })
        .await
        .unwrap();
    assert!(conflict.dispatched().is_empty());
    assert_eq!(recorder.count("emit"), 1);
}

#[tokio::test]
async fn multi_clause_rules_join_within_the_flow() {
    let [tag, item] = vars(["tag", "item"]);
    let summary = Rule::builder("summary")
        .variables([&tag, &item])
        .when(sig("start"), Pattern::new().bind("tag", &tag), Pattern::new())
        .when(sig("reject"), Pattern::new().bind("item", &item), Pattern::new().present("error"))
        .then(sig("emit"), Template::new().var("tag", &tag).var("item", &item).literal("summary", true))
        .build()
        .unwrap();
    let (engine, _) = engine(vec![fan_out("reject"), summary]);

    let cascade = engine
        .invoke(sig("start"), record! { "n" => 2, "tag" => "t" })
        .await
        .unwrap();
    // Each rejection joins with the one start of its flow
    assert_eq!(cascade.count(&sig("reject")), 2);
    let summaries: Vec<_> = cascade
        .records_for(&sig("emit"))
        .map(|r| r.input.get("item").and_then(Value::as_int).unwrap())
        .collect();
    assert_eq!(summaries, vec![0, 1]);

    // A rejection outside any start's flow has nothing to join with
    let alone = engine
        .invoke(sig("reject"), record! { "item" => 9 })
        .await
        .unwrap();
    assert!(alone.dispatched().is_empty());
}

// =============================================================================
// Fan-Out and Failure
// =============================================================================

#[tokio::test]
async fn query_fan_out_dispatches_once_per_result() {
    let (engine, recorder) = engine(vec![fan_out("emit")]);
    let cascade = engine
        .invoke(sig("start"), record! { "n" => 4, "tag" => "t" })
        .await
        .unwrap();

    assert_eq!(cascade.count(&sig("emit")), 4);
    assert!(cascade
        .records_for(&sig("emit"))
        .all(|r| r.input.get_str("tag") == Some("t")));
    assert_eq!(recorder.count("_items"), 1);
}

#[tokio::test]
async fn failed_actions_are_never_retried() {
    let [item, error] = vars(["item", "error"]);
    let on_failure = Rule::builder("report-rejection")
        .variables([&item, &error])
        .when(sig("reject"), Pattern::new().bind("item", &item), Pattern::new().bind("error", &error))
        .then(sig("emit"), Template::new().var("item", &item).var("error", &error))
        .build()
        .unwrap();
    let (engine, recorder) = engine(vec![fan_out("reject"), on_failure]);

    let cascade = engine
        .invoke(sig("start"), record! { "n" => 3, "tag" => "t" })
        .await
        .unwrap();

    // One invocation per surviving frame
    assert_eq!(recorder.count("reject"), 3);
    assert!(cascade.records_for(&sig("reject")).all(|r| r.is_error()));
    assert_eq!(cascade.count(&sig("emit")), 3);
}

#[tokio::test]
async fn infrastructure_errors_end_the_cascade_without_rollback() {
    let [tag, item] = vars(["tag", "item"]);
    let explode = Rule::builder("explode-on-one")
        .variables([&tag, &item])
        .when(
            sig("emit"),
            Pattern::new().bind("tag", &tag).equals("item", 1),
            Pattern::new(),
        )
        .then(sig("boom"), Template::new().var("tag", &tag))
        .build()
        .unwrap();
    let (engine, recorder) = engine(vec![fan_out("emit"), explode]);

    let err = engine
        .invoke(sig("start"), record! { "n" => 3, "tag" => "t" })
        .await
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ConceptFailure { .. }));
    let context = err.context.unwrap();
    assert_eq!(context.rule.as_deref(), Some("explode-on-one"));
    assert_eq!(context.stack, vec!["Recorder.start".to_string(), "Recorder.emit".to_string()]);

    // emit 0 and emit 1 stay done; emit 2 never runs
    assert_eq!(recorder.count("emit"), 2);
    assert_eq!(recorder.count("boom"), 1);
}

// =============================================================================
// Guards
// =============================================================================

#[tokio::test]
async fn self_triggering_rules_hit_the_depth_limit() {
    let [x] = vars(["x"]);
    let echo = Rule::builder("echo")
        .variables([&x])
        .when(sig("emit"), Pattern::new().bind("x", &x), Pattern::new())
        .then(sig("emit"), Template::new().var("x", &x))
        .build()
        .unwrap();
    let (engine, recorder) = engine(vec![echo]);
    let engine = engine.with_config(EngineConfig::new().with_max_depth(10));

    let err = engine.invoke(sig("emit"), record! { "x" => 1 }).await.unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::LimitExceeded(SemanticLimit::MaxCascadeDepth { limit: 10, .. })
    ));
    assert_eq!(recorder.count("emit"), 11);
}

#[tokio::test]
async fn dispatch_budget_stops_wide_cascades() {
    let (engine, recorder) = engine(vec![fan_out("emit")]);
    let engine = engine.with_config(EngineConfig::new().with_max_dispatches(5));

    let err = engine
        .invoke(sig("start"), record! { "n" => 20, "tag" => "t" })
        .await
        .unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::LimitExceeded(SemanticLimit::MaxDispatches { limit: 5 })
    ));
    assert_eq!(recorder.count("emit"), 5);

    // Within budget, the same engine completes
    let ok = engine
        .invoke(sig("start"), record! { "n" => 5, "tag" => "t" })
        .await
        .unwrap();
    assert_eq!(ok.count(&sig("emit")), 5);
}
