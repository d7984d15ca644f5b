//! Rule registration tests
//!
//! Configuration mistakes are rejected before any traffic is accepted.

use concord_engine::{
    ActionSignature, ConceptRegistry, Engine, Pattern, QueryStep, Rule, RuleRegistry, Template,
    WhereStep, vars,
};
use concord_foundation::{Error, ErrorKind};

use crate::support::{registry, sig};

fn reason(err: &Error) -> &str {
    match &err.kind {
        ErrorKind::InvalidRule { reason, .. } => reason,
        other => panic!("expected an invalid rule, got {other}"),
    }
}

// =============================================================================
// Rule Validation
// =============================================================================

#[test]
fn rule_without_when_is_rejected() {
    let err = Rule::builder("Empty").build().unwrap_err();
    assert!(err.is_configuration());
    assert!(reason(&err).contains("no when clause"));
}

#[test]
fn unbound_then_variable_is_rejected() {
    let [request, user] = vars(["request", "user"]);
    let err = Rule::builder("Respond")
        .variables([&request, &user])
        .when(sig("start"), Pattern::new(), Pattern::new().bind("request", &request))
        .then(sig("emit"), Template::new().var("request", &request).var("user", &user))
        .build()
        .unwrap_err();

    assert!(matches!(&err.kind, ErrorKind::InvalidRule { rule, .. } if rule == "Respond"));
    assert!(reason(&err).contains("?user"));
}

#[test]
fn undeclared_variable_is_rejected() {
    let [x, y] = vars(["x", "y"]);
    let err = Rule::builder("Sloppy")
        .variables([&x])
        .when(sig("start"), Pattern::new().bind("x", &x).bind("y", &y), Pattern::new())
        .build()
        .unwrap_err();
    assert!(reason(&err).contains("not declared"));
}

#[test]
fn contradictory_pattern_is_rejected() {
    let [x] = vars(["x"]);
    let err = Rule::builder("Twice")
        .variables([&x])
        .when(
            sig("start"),
            Pattern::new().bind("path", &x).equals("path", "/a"),
            Pattern::new(),
        )
        .build()
        .unwrap_err();
    assert!(reason(&err).contains("path"));
}

#[test]
fn injected_marker_is_only_bound_on_its_own_path() {
    let [session, user, error] = vars(["session", "user", "error"]);
    let lookup = || {
        WhereStep::query(
            QueryStep::new(sig("_items"), Template::new().var("n", &session))
                .bind("item", &user)
                .or_inject(&error, "Invalid or expired session"),
        )
    };
    let builder = |name: &str| {
        Rule::builder(name)
            .variables([&session, &user, &error])
            .when(sig("start"), Pattern::new().bind("session", &session), Pattern::new())
            .where_step(lookup())
    };

    // The error path reads only the marker.
    assert!(
        builder("AuthError")
            .where_step(WhereStep::bound(&error))
            .then(sig("emit"), Template::new().var("error", &error))
            .build()
            .is_ok()
    );

    // The success path reads only the lookup result.
    assert!(
        builder("AuthOk")
            .where_step(WhereStep::unbound(&error))
            .then(sig("emit"), Template::new().var("user", &user))
            .build()
            .is_ok()
    );

    // Without selecting a path, neither is definitely bound.
    let err = builder("AuthEither")
        .then(sig("emit"), Template::new().var("user", &user))
        .build()
        .unwrap_err();
    assert!(reason(&err).contains("?user"));
}

#[test]
fn query_inputs_must_be_bound() {
    let [n, item] = vars(["n", "item"]);
    let err = Rule::builder("Early")
        .variables([&n, &item])
        .when(sig("start"), Pattern::new(), Pattern::new())
        .where_step(WhereStep::query(
            QueryStep::new(sig("_items"), Template::new().var("n", &n)).bind("item", &item),
        ))
        .then(sig("emit"), Template::new().var("item", &item))
        .build()
        .unwrap_err();
    assert!(reason(&err).contains("?n"));
}

// =============================================================================
// Registries
// =============================================================================

fn passthrough(name: &str, trigger: ActionSignature) -> Rule {
    let [x] = vars(["x"]);
    Rule::builder(name)
        .variables([&x])
        .when(trigger, Pattern::new().bind("x", &x), Pattern::new())
        .then(sig("emit"), Template::new().var("x", &x))
        .build()
        .unwrap()
}

#[test]
fn duplicate_rule_names_are_rejected() {
    let mut rules = RuleRegistry::new();
    rules.register(passthrough("Same", sig("start"))).unwrap();
    let err = rules.register(passthrough("Same", sig("emit"))).unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(rules.len(), 1);
}

#[test]
fn duplicate_concepts_are_rejected() {
    let (mut concepts, recorder) = registry();
    let err = concepts.register_shared(recorder).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::DuplicateConcept(_)));
}

#[test]
fn engine_checks_signatures_against_concepts() {
    let cases = [
        passthrough("UnknownConcept", ActionSignature::new("Nobody", "start")),
        passthrough("UnknownAction", sig("launch")),
    ];
    for rule in cases {
        let (concepts, _) = registry();
        let mut rules = RuleRegistry::new();
        rules.register(rule).unwrap();
        let err = Engine::new(concepts, rules).unwrap_err();
        assert!(err.is_configuration(), "{err}");
    }

    let [n, item] = vars(["n", "item"]);
    let bad_query = Rule::builder("UnknownQuery")
        .variables([&n, &item])
        .when(sig("start"), Pattern::new().bind("n", &n), Pattern::new())
        .where_step(WhereStep::query(
            QueryStep::new(sig("_missing"), Template::new().var("n", &n)).bind("item", &item),
        ))
        .then(sig("emit"), Template::new().var("item", &item))
        .build()
        .unwrap();
    let (concepts, _) = registry();
    let mut rules = RuleRegistry::new();
    rules.register(bad_query).unwrap();
    let err = Engine::new(concepts, rules).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownQuery { .. }));
    assert_eq!(
        err.context.and_then(|c| c.rule).as_deref(),
        Some("UnknownQuery")
    );
}

#[test]
fn empty_registries_make_a_valid_engine() {
    let engine = Engine::new(ConceptRegistry::new(), RuleRegistry::new()).unwrap();
    assert!(engine.rules().is_empty());
    assert!(engine.concepts().is_empty());
}
