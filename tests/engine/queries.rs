//! Where step tests
//!
//! Tests query fan-out, error-marker injection, and refinement steps.

use std::sync::Arc;

use concord_engine::query::evaluate;
use concord_engine::{
    ConceptRegistry, FlowId, Frame, FrameSet, QueryStep, Refinement, Template, Var, WhereStep,
    vars,
};
use concord_foundation::{Value, record};
use proptest::prelude::*;

use crate::support::{registry, sig};

fn refinement(concepts: ConceptRegistry) -> Refinement {
    Refinement::new(Arc::new(concepts), FlowId::next(), "test-rule")
}

fn seed(tag: &Var, n: &Var, count: i64) -> FrameSet {
    FrameSet::single(
        Frame::new()
            .extend(tag, "t")
            .unwrap()
            .extend(n, count)
            .unwrap(),
    )
}

fn items(n: &Var, item: &Var, label: &Var) -> QueryStep {
    QueryStep::new(sig("_items"), Template::new().var("n", n))
        .bind("item", item)
        .bind("label", label)
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

// =============================================================================
// Fan-Out
// =============================================================================

#[tokio::test]
async fn query_fans_out_per_result() {
    let [tag, n, item, label] = vars(["tag", "n", "item", "label"]);
    let (concepts, _) = registry();
    let cx = refinement(concepts);

    let steps = [WhereStep::query(items(&n, &item, &label))];
    let out = evaluate(&steps, &cx, seed(&tag, &n, 3)).await.unwrap();

    assert_eq!(out.len(), 3);
    for (i, frame) in out.iter().enumerate() {
        // Unrelated bindings carried through unchanged
        assert_eq!(frame.get(&tag), Some(&Value::from("t")));
        assert_eq!(frame.get(&n), Some(&Value::Int(3)));
        assert_eq!(frame.get(&item), Some(&Value::Int(i64::try_from(i).unwrap())));
        assert_eq!(frame.get(&label), Some(&Value::from(format!("item-{i}"))));
    }
}

#[tokio::test]
async fn empty_results_drop_the_frame() {
    let [tag, n, item, label] = vars(["tag", "n", "item", "label"]);
    let (concepts, recorder) = registry();
    let cx = refinement(concepts);

    let steps = [
        WhereStep::query(items(&n, &item, &label)),
        WhereStep::filter(|_| panic!("later steps do not run on an empty set")),
    ];
    let out = evaluate(&steps, &cx, seed(&tag, &n, 0)).await.unwrap();
    assert!(out.is_empty());
    assert_eq!(recorder.count("_items"), 1);
}

#[tokio::test]
async fn empty_results_can_inject_a_marker() {
    let [tag, n, item, label, error] = vars(["tag", "n", "item", "label", "error"]);
    let (concepts, _) = registry();
    let cx = refinement(concepts);
    let lookup = || {
        WhereStep::query(items(&n, &item, &label).or_inject(&error, "Invalid or expired session"))
    };

    let failed = evaluate(&[lookup(), WhereStep::bound(&error)], &cx, seed(&tag, &n, 0))
        .await
        .unwrap();
    assert_eq!(failed.len(), 1);
    let frame = failed.first().unwrap();
    assert_eq!(frame.get(&error), Some(&Value::from("Invalid or expired session")));
    assert!(!frame.is_bound(&item));

    // A successful lookup never carries the marker
    let found = evaluate(&[lookup(), WhereStep::bound(&error)], &cx, seed(&tag, &n, 2))
        .await
        .unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn results_that_disagree_with_bindings_are_dropped() {
    let [tag, n, item, label] = vars(["tag", "n", "item", "label"]);
    let (concepts, _) = registry();
    let cx = refinement(concepts);

    let frames = FrameSet::single(
        seed(&tag, &n, 4)
            .first()
            .unwrap()
            .extend(&item, 2)
            .unwrap(),
    );
    let steps = [WhereStep::query(items(&n, &item, &label))];
    let out = evaluate(&steps, &cx, frames).await.unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out.first().unwrap().get(&label), Some(&Value::from("item-2")));
}

#[tokio::test]
async fn rows_that_all_disagree_still_inject_the_marker() {
    let [tag, n, item, label, error] = vars(["tag", "n", "item", "label", "error"]);
    let (concepts, _) = registry();
    let cx = refinement(concepts);

    // Four rows come back, none of them item 9.
    let frames = FrameSet::single(seed(&tag, &n, 4).first().unwrap().extend(&item, 9).unwrap());
    let step = items(&n, &item, &label).or_inject(&error, "Invalid or expired session");
    let out = evaluate(&[WhereStep::query(step)], &cx, frames).await.unwrap();

    assert_eq!(out.len(), 1);
    let frame = out.first().unwrap();
    assert_eq!(frame.get(&error), Some(&Value::from("Invalid or expired session")));
    assert_eq!(frame.get(&item), Some(&Value::Int(9)));
    assert!(!frame.is_bound(&label));
}

// =============================================================================
// Refinement Steps
// =============================================================================

#[tokio::test]
async fn bind_filter_and_custom_steps() {
    let [tag, n, item, label, double, note] = vars(["tag", "n", "item", "label", "double", "note"]);
    let (concepts, _) = registry();
    let cx = refinement(concepts);

    let item_for_bind = item.clone();
    let double_for_filter = double.clone();
    let note_for_custom = note.clone();
    let steps = [
        WhereStep::query(items(&n, &item, &label)),
        WhereStep::bind(&double, move |f| {
            f.get(&item_for_bind)
                .and_then(Value::as_int)
                .map(|i| Value::Int(i * 2))
        }),
        WhereStep::filter(move |f| {
            f.get(&double_for_filter).and_then(Value::as_int).unwrap_or(0) >= 4
        }),
        WhereStep::custom(&[&note], move |cx, frames| {
            let note = note_for_custom.clone();
            async move {
                let rows = cx.query(&sig("_items"), record! { "n" => 1 }).await?;
                let text = format!("{} via {}", rows.len(), cx.rule());
                Ok::<_, concord_foundation::Error>(
                    frames.flat_map(|f| f.extend(&note, text.as_str()).ok()),
                )
            }
        }),
    ];

    let out = evaluate(&steps, &cx, seed(&tag, &n, 4)).await.unwrap();
    let doubles: Vec<_> = out
        .iter()
        .filter_map(|f| f.get(&double).and_then(Value::as_int))
        .collect();
    assert_eq!(doubles, vec![4, 6]);
    assert!(out.iter().all(|f| f.get(&note) == Some(&Value::from("1 via test-rule"))));
}

proptest! {
    #[test]
    fn fan_out_cardinality_matches_result_count(k in 0_i64..25) {
        let [tag, n, item, label] = vars(["tag", "n", "item", "label"]);
        let (concepts, _) = registry();
        let cx = refinement(concepts);
        let steps = [WhereStep::query(items(&n, &item, &label))];

        let out = block_on(evaluate(&steps, &cx, seed(&tag, &n, k))).unwrap();
        prop_assert_eq!(out.len(), usize::try_from(k).unwrap());
        prop_assert!(out.iter().all(|f| f.get(&tag) == Some(&Value::from("t"))));
    }
}
