//! Consistency scoring
//!
//! Combines all contradiction sources for one chunk into the running
//! session score. The running score is the smoothing mechanism: a single
//! noisy chunk can only move it by its own deductions, never re-derive it
//! from scratch. Higher score = more consistent.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{Contradiction, ContradictionOutput, Severity};

/// Starting score for a fresh session
pub const DEFAULT_SCORE: i64 = 100;

/// Per-severity deductions, strictly monotone in severity
fn deduction(severity: Severity) -> i64 {
    match severity {
        Severity::Minor => 2,
        Severity::Medium => 5,
        Severity::Major => 12,
        Severity::RedFlag => 25,
    }
}

/// Score band label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyLabel {
    Consistent,
    MostlyConsistent,
    Questionable,
    Inconsistent,
    HighlyInconsistent,
}

impl ConsistencyLabel {
    pub fn for_score(score: i64) -> Self {
        match score {
            85..=100 => ConsistencyLabel::Consistent,
            70..=84 => ConsistencyLabel::MostlyConsistent,
            50..=69 => ConsistencyLabel::Questionable,
            30..=49 => ConsistencyLabel::Inconsistent,
            _ => ConsistencyLabel::HighlyInconsistent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsistencyLabel::Consistent => "consistent",
            ConsistencyLabel::MostlyConsistent => "mostly_consistent",
            ConsistencyLabel::Questionable => "questionable",
            ConsistencyLabel::Inconsistent => "inconsistent",
            ConsistencyLabel::HighlyInconsistent => "highly_inconsistent",
        }
    }
}

/// Apply one chunk's combined contradictions to the running score.
///
/// Pure: `apply(s, [])` returns score `s` with trend `"0"` for every valid
/// `s`. The result is clamped to [0, 100] regardless of input. The full
/// contradiction list is carried into the output, including when empty.
pub fn apply(previous_score: i64, contradictions: Vec<Contradiction>) -> Result<ContradictionOutput> {
    if !(0..=100).contains(&previous_score) {
        return Err(Error::InvalidInput(format!(
            "Running score out of range: {}",
            previous_score
        )));
    }

    let total_deduction: i64 = contradictions.iter().map(|c| deduction(c.severity)).sum();
    let score = (previous_score - total_deduction).clamp(0, 100);
    let trend = (score - previous_score).to_string();
    let label = ConsistencyLabel::for_score(score).as_str().to_string();

    Ok(ContradictionOutput {
        contradiction_score: score,
        trend,
        label,
        contradictions,
    })
}
