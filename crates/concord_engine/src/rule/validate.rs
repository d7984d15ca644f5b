//! Registration-time checks for rules.
//!
//! Every template variable must be bound by the time it is read, on every
//! path a frame can take through the `where` steps. A query with an
//! injected error marker splits frames into two paths: one with the query's
//! outputs bound, one with only the marker. `Bound`/`Unbound` steps select
//! paths again, so
//!
//! ```text
//! where: lookup(session -> user) or inject ?error ; Bound(?error)
//! then:  respond(request, error: ?error)
//! ```
//!
//! validates, while the same `then` reading `?user` does not.

use std::collections::BTreeSet;

use concord_foundation::{Error, Result};

use crate::concept::ConceptRegistry;
use crate::frame::Var;
use crate::pattern::{Pattern, Template};
use crate::query::{OnEmpty, WhereStep};
use crate::rule::Rule;

/// The set of variables definitely bound along one path.
type Path = BTreeSet<Var>;

/// Checks a rule's internal consistency.
///
/// # Errors
/// Returns an invalid rule error naming the first problem found.
pub fn validate(rule: &Rule) -> Result<()> {
    let invalid = |reason: String| Error::invalid_rule(rule.name(), reason);

    if rule.when().is_empty() {
        return Err(invalid("rule has no when clause".into()));
    }

    let declared: BTreeSet<&Var> = rule.variables().iter().collect();
    let check_declared = |var: &Var, site: &str| {
        if declared.contains(var) {
            Ok(())
        } else {
            Err(invalid(format!("{var} used in {site} is not declared")))
        }
    };

    // When patterns: declared variables, no field named twice.
    let mut start = Path::new();
    for clause in rule.when() {
        for (side, pattern) in [("input", &clause.input), ("output", &clause.output)] {
            check_pattern(pattern, &clause.signature.to_string(), side).map_err(&invalid)?;
            for var in pattern.variables() {
                check_declared(var, &format!("when {}", clause.signature))?;
                start.insert(var.clone());
            }
        }
    }

    // Where steps, tracking what is bound along each path.
    let mut paths: BTreeSet<Path> = BTreeSet::from([start]);
    for (index, step) in rule.where_steps().iter().enumerate() {
        let site = format!("where step {}", index + 1);
        match step {
            WhereStep::Query(query) => {
                check_template(&query.input, &site).map_err(&invalid)?;
                for var in query.input.variables() {
                    check_declared(var, &site)?;
                    require_bound(&paths, var, &site).map_err(&invalid)?;
                }
                for var in query.output_variables() {
                    check_declared(var, &site)?;
                }
                let mut next: BTreeSet<Path> =
                    paths.iter().map(|p| with(p, query.output_variables())).collect();
                if let OnEmpty::Inject { var, .. } = &query.on_empty {
                    check_declared(var, &site)?;
                    next.extend(paths.iter().map(|p| with(p, [var])));
                }
                paths = next;
            }
            WhereStep::Filter(_) => {}
            WhereStep::Bound(var) => {
                check_declared(var, &site)?;
                paths.retain(|p| p.contains(var));
                if paths.is_empty() {
                    return Err(invalid(format!("{var} is never bound before {site}")));
                }
            }
            WhereStep::Unbound(var) => {
                check_declared(var, &site)?;
                paths.retain(|p| !p.contains(var));
                if paths.is_empty() {
                    return Err(invalid(format!("{var} is always bound before {site}")));
                }
            }
            WhereStep::Bind { var, .. } => {
                check_declared(var, &site)?;
                paths = paths.iter().map(|p| with(p, [var])).collect();
            }
            WhereStep::Custom { binds, .. } => {
                for var in binds {
                    check_declared(var, &site)?;
                }
                paths = paths.iter().map(|p| with(p, binds)).collect();
            }
        }
    }

    // Then templates.
    for clause in rule.then() {
        let site = format!("then {}", clause.signature);
        check_template(&clause.args, &site).map_err(&invalid)?;
        for var in clause.args.variables() {
            check_declared(var, &site)?;
            require_bound(&paths, var, &site).map_err(&invalid)?;
        }
    }

    Ok(())
}

/// Checks every signature a rule names against the registered concepts.
///
/// Triggers and effects must be declared actions; query steps must be
/// declared queries.
///
/// # Errors
/// Unknown concept, action or query, with the rule name in the context.
pub fn check_signatures(rule: &Rule, concepts: &ConceptRegistry) -> Result<()> {
    let context = |e: Error| {
        e.with_context(concord_foundation::ErrorContext::new().with_rule(rule.name()))
    };
    for clause in rule.when() {
        concepts.check_action(&clause.signature).map_err(context)?;
    }
    for step in rule.where_steps() {
        if let WhereStep::Query(query) = step {
            concepts.check_query(&query.signature).map_err(context)?;
        }
    }
    for clause in rule.then() {
        concepts.check_action(&clause.signature).map_err(context)?;
    }
    Ok(())
}

fn with<'a>(path: &Path, vars: impl IntoIterator<Item = &'a Var>) -> Path {
    let mut path = path.clone();
    path.extend(vars.into_iter().cloned());
    path
}

fn require_bound(paths: &BTreeSet<Path>, var: &Var, site: &str) -> std::result::Result<(), String> {
    if paths.iter().all(|p| p.contains(var)) {
        Ok(())
    } else {
        Err(format!("{var} read in {site} is not bound on every path"))
    }
}

fn check_pattern(pattern: &Pattern, signature: &str, side: &str) -> std::result::Result<(), String> {
    match pattern.duplicate_field() {
        Some(field) => Err(format!(
            "{side} pattern of {signature} names field `{field}` twice"
        )),
        None => Ok(()),
    }
}

fn check_template(template: &Template, site: &str) -> std::result::Result<(), String> {
    match template.duplicate_field() {
        Some(field) => Err(format!("template in {site} names field `{field}` twice")),
        None => Ok(()),
    }
}
