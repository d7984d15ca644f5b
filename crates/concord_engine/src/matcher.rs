//! Unifies fresh action records with rule triggers.
//!
//! A single-clause rule yields at most one frame per record. A rule with
//! several `when` clauses unifies the fresh record with one clause and joins
//! the remaining clauses against records completed earlier in the same flow,
//! so every frame it produces includes the fresh record.

use crate::action::ActionRecord;
use crate::frame::{Frame, FrameSet};
use crate::rule::{Rule, WhenClause};

/// Matches rules against action records.
pub struct RuleMatcher;

impl RuleMatcher {
    /// Unifies one trigger clause with one record, extending `frame`.
    #[must_use]
    pub fn match_clause(clause: &WhenClause, record: &ActionRecord, frame: &Frame) -> Option<Frame> {
        if clause.signature != record.signature {
            return None;
        }
        let frame = clause.input.unify(&record.input, frame)?;
        clause.output.unify(&record.output, &frame)
    }

    /// Produces the initial frames of `rule` for the fresh record.
    ///
    /// `earlier` holds the records completed before `fresh` in the same
    /// flow. An empty result means the rule does not apply.
    #[must_use]
    pub fn match_rule(rule: &Rule, fresh: &ActionRecord, earlier: &[ActionRecord]) -> FrameSet {
        let clauses = rule.when();
        let mut result = FrameSet::new();

        for (index, clause) in clauses.iter().enumerate() {
            let Some(start) = Self::match_clause(clause, fresh, &Frame::new()) else {
                continue;
            };

            let mut frames = FrameSet::single(start);
            for (other_index, other) in clauses.iter().enumerate() {
                if other_index == index {
                    continue;
                }
                frames = frames.flat_map(|frame| {
                    earlier
                        .iter()
                        .filter_map(|record| Self::match_clause(other, record, &frame))
                        .collect::<Vec<_>>()
                });
                if frames.is_empty() {
                    break;
                }
            }
            result.append(frames);
        }

        result
    }
}
