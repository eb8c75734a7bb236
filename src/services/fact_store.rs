//! Fact Store: confidence-weighted, conflict-aware profile merging
//!
//! Extraction is partial per chunk, so "not mentioned now" must never be
//! read as "retracted now". The merge therefore only moves a field when
//! the new observation actually carries information:
//!
//! - Scalars: tri-state per-field update (absent / same / different).
//!   A genuine difference is a conflict, resolved by confidence; with
//!   `keep_conflicts` the losing value is retained in `other_facts`
//!   rather than discarded.
//! - Array fields: set-union with exact-string dedup; prior entries are
//!   never dropped.
//! - `other_facts`: key-overwrite union, new wins.

use chrono::Utc;
use std::collections::BTreeSet;
use tracing::debug;

use crate::models::{Contradiction, ProfileFacts, Severity};

/// Scalar field delta, made explicit so a legitimate zero-valued fact is
/// never confused with an absent one.
#[derive(Debug, Clone, Copy, PartialEq)]
enum FieldUpdate {
    /// New observation says nothing about this field
    Absent,
    /// New observation repeats the known value
    Same,
    /// New observation disagrees with the known value
    Different { old: f64, new: f64 },
    /// Field was unknown and is now observed
    Adopt(f64),
}

fn classify_scalar(old: Option<f64>, new: Option<f64>) -> FieldUpdate {
    match (old, new) {
        (_, None) => FieldUpdate::Absent,
        (None, Some(v)) => FieldUpdate::Adopt(v),
        (Some(o), Some(n)) if (o - n).abs() < f64::EPSILON => FieldUpdate::Same,
        (Some(o), Some(n)) => FieldUpdate::Different { old: o, new: n },
    }
}

/// Merge tuning options
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Minimum confidence for a new value to displace a conflicting old one
    pub min_confidence: f64,
    /// Retain the losing value of a conflict in `other_facts`
    pub keep_conflicts: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            keep_conflicts: true,
        }
    }
}

/// Result of merging one extraction into the store
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub merged: ProfileFacts,
    pub conflicts: Vec<Contradiction>,
}

/// Holds the most confident known facts about the candidate
#[derive(Debug, Default)]
pub struct FactStore {
    facts: Option<ProfileFacts>,
    options: MergeOptions,
}

impl FactStore {
    pub fn new(options: MergeOptions) -> Self {
        Self {
            facts: None,
            options,
        }
    }

    /// Current facts, if any extraction has landed yet
    pub fn current(&self) -> Option<&ProfileFacts> {
        self.facts.as_ref()
    }

    /// Merge a new partial extraction; the stored record is replaced
    /// wholesale with the merge result.
    pub fn merge(&mut self, new: ProfileFacts) -> MergeOutcome {
        let outcome = merge_facts(self.facts.as_ref(), new, &self.options);
        self.facts = Some(outcome.merged.clone());
        outcome
    }

    pub fn clear(&mut self) {
        self.facts = None;
    }
}

/// Pure merge of an optional old record with a new partial extraction
pub fn merge_facts(
    old: Option<&ProfileFacts>,
    new: ProfileFacts,
    options: &MergeOptions,
) -> MergeOutcome {
    let Some(old) = old else {
        let mut merged = new;
        merged.extracted_at = Some(Utc::now());
        return MergeOutcome {
            merged,
            conflicts: Vec::new(),
        };
    };

    let mut conflicts = Vec::new();
    let mut merged = old.clone();

    merged.years_experience = merge_scalar(
        "years_experience",
        old.years_experience,
        new.years_experience,
        old.confidence,
        new.confidence,
        options,
        &mut merged,
        &mut conflicts,
        years_severity,
    );
    merged.salary_expectations = merge_scalar(
        "salary_expectations",
        old.salary_expectations,
        new.salary_expectations,
        old.confidence,
        new.confidence,
        options,
        &mut merged,
        &mut conflicts,
        salary_severity,
    );

    merged.job_titles = union_sets(old.job_titles.as_ref(), new.job_titles.as_ref());
    merged.companies = union_sets(old.companies.as_ref(), new.companies.as_ref());
    merged.degrees = union_sets(old.degrees.as_ref(), new.degrees.as_ref());
    merged.leadership_experience = union_sets(
        old.leadership_experience.as_ref(),
        new.leadership_experience.as_ref(),
    );
    merged.languages = union_sets(old.languages.as_ref(), new.languages.as_ref());
    merged.tech_stack = union_sets(old.tech_stack.as_ref(), new.tech_stack.as_ref());

    // Key-overwrite union: new wins on collision
    for (key, value) in new.other_facts {
        merged.other_facts.insert(key, value);
    }

    merged.confidence = old.confidence.max(new.confidence);
    merged.extracted_at = Some(Utc::now());

    if !conflicts.is_empty() {
        debug!(conflict_count = conflicts.len(), "Profile merge produced conflicts");
    }

    MergeOutcome { merged, conflicts }
}

/// Merge one scalar field, recording a conflict when old and new genuinely
/// disagree. Returns the value the merged record keeps.
#[allow(clippy::too_many_arguments)]
fn merge_scalar(
    field: &str,
    old: Option<f64>,
    new: Option<f64>,
    old_confidence: f64,
    new_confidence: f64,
    options: &MergeOptions,
    merged: &mut ProfileFacts,
    conflicts: &mut Vec<Contradiction>,
    severity_for: fn(f64, f64) -> Severity,
) -> Option<f64> {
    match classify_scalar(old, new) {
        FieldUpdate::Absent | FieldUpdate::Same => old,
        FieldUpdate::Adopt(value) => Some(value),
        FieldUpdate::Different {
            old: old_value,
            new: new_value,
        } => {
            let severity = severity_for(old_value, new_value);
            conflicts.push(Contradiction::new(
                format!(
                    "Candidate previously stated {} = {}, now states {}",
                    field, old_value, new_value
                ),
                severity,
                Some(field.to_string()),
            ));

            let new_wins = new_confidence > old_confidence && new_confidence >= options.min_confidence;
            if new_wins {
                if options.keep_conflicts {
                    merged
                        .other_facts
                        .insert(format!("disputed_{}", field), old_value.into());
                }
                Some(new_value)
            } else {
                if options.keep_conflicts {
                    merged
                        .other_facts
                        .insert(format!("disputed_{}", field), new_value.into());
                }
                Some(old_value)
            }
        }
    }
}

/// Additive set union; an empty or absent new set leaves old untouched
fn union_sets(
    old: Option<&BTreeSet<String>>,
    new: Option<&BTreeSet<String>>,
) -> Option<BTreeSet<String>> {
    match (old, new) {
        (old, None) => old.cloned(),
        (old, Some(new)) if new.is_empty() => old.cloned(),
        (None, Some(new)) => Some(new.clone()),
        (Some(old), Some(new)) => Some(old.union(new).cloned().collect()),
    }
}

/// Years-of-experience conflicts of 2+ years are material
fn years_severity(old: f64, new: f64) -> Severity {
    if (old - new).abs() >= 2.0 {
        Severity::Major
    } else {
        Severity::Medium
    }
}

/// Salary deltas over 30% are material
fn salary_severity(old: f64, new: f64) -> Severity {
    let base = old.abs().max(1.0);
    if (old - new).abs() / base > 0.30 {
        Severity::Major
    } else {
        Severity::Medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(years: Option<f64>, confidence: f64) -> ProfileFacts {
        ProfileFacts {
            years_experience: years,
            confidence,
            ..Default::default()
        }
    }

    fn titles(values: &[&str]) -> Option<BTreeSet<String>> {
        Some(values.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_no_prior_facts_adopts_new() {
        let outcome = merge_facts(None, facts(Some(5.0), 0.8), &MergeOptions::default());
        assert_eq!(outcome.merged.years_experience, Some(5.0));
        assert!(outcome.conflicts.is_empty());
        assert!(outcome.merged.extracted_at.is_some());
    }

    #[test]
    fn test_absent_in_new_keeps_old() {
        let old = facts(Some(5.0), 0.8);
        let outcome = merge_facts(Some(&old), facts(None, 0.9), &MergeOptions::default());
        assert_eq!(outcome.merged.years_experience, Some(5.0));
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn test_equal_scalar_is_noop() {
        let old = facts(Some(5.0), 0.8);
        let outcome = merge_facts(Some(&old), facts(Some(5.0), 0.6), &MergeOptions::default());
        assert_eq!(outcome.merged.years_experience, Some(5.0));
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn test_conflicting_scalar_reports_major_contradiction() {
        let old = facts(Some(5.0), 0.8);
        let outcome = merge_facts(Some(&old), facts(Some(2.0), 0.7), &MergeOptions::default());

        assert_eq!(outcome.conflicts.len(), 1);
        let conflict = &outcome.conflicts[0];
        assert_eq!(conflict.severity, Severity::Major);
        assert_eq!(conflict.field.as_deref(), Some("years_experience"));
        // New confidence lower: old value wins, new value retained as disputed
        assert_eq!(outcome.merged.years_experience, Some(5.0));
        assert_eq!(
            outcome.merged.other_facts.get("disputed_years_experience"),
            Some(&serde_json::json!(2.0))
        );
    }

    #[test]
    fn test_higher_confidence_new_value_replaces() {
        let old = facts(Some(5.0), 0.5);
        let outcome = merge_facts(Some(&old), facts(Some(2.0), 0.9), &MergeOptions::default());
        assert_eq!(outcome.merged.years_experience, Some(2.0));
        assert_eq!(
            outcome.merged.other_facts.get("disputed_years_experience"),
            Some(&serde_json::json!(5.0))
        );
        assert_eq!(outcome.conflicts.len(), 1);
    }

    #[test]
    fn test_new_value_below_min_confidence_does_not_replace() {
        let options = MergeOptions::default();
        let old = facts(Some(5.0), 0.3);
        // Higher than old, but below min_confidence 0.5
        let outcome = merge_facts(Some(&old), facts(Some(2.0), 0.4), &options);
        assert_eq!(outcome.merged.years_experience, Some(5.0));
    }

    #[test]
    fn test_small_years_delta_is_medium() {
        let old = facts(Some(5.0), 0.8);
        let outcome = merge_facts(Some(&old), facts(Some(6.0), 0.7), &MergeOptions::default());
        assert_eq!(outcome.conflicts[0].severity, Severity::Medium);
    }

    #[test]
    fn test_salary_delta_severity() {
        let mut old = ProfileFacts {
            salary_expectations: Some(100_000.0),
            confidence: 0.8,
            ..Default::default()
        };
        old.extracted_at = Some(Utc::now());

        let new = ProfileFacts {
            salary_expectations: Some(150_000.0),
            confidence: 0.7,
            ..Default::default()
        };
        let outcome = merge_facts(Some(&old), new, &MergeOptions::default());
        assert_eq!(outcome.conflicts[0].severity, Severity::Major);

        let new_small = ProfileFacts {
            salary_expectations: Some(110_000.0),
            confidence: 0.7,
            ..Default::default()
        };
        let outcome = merge_facts(Some(&old), new_small, &MergeOptions::default());
        assert_eq!(outcome.conflicts[0].severity, Severity::Medium);
    }

    #[test]
    fn test_array_union_never_drops_entries() {
        let old = ProfileFacts {
            job_titles: titles(&["Engineer", "Team Lead"]),
            confidence: 0.8,
            ..Default::default()
        };
        let new = ProfileFacts {
            job_titles: titles(&["Team Lead", "Architect"]),
            confidence: 0.7,
            ..Default::default()
        };
        let outcome = merge_facts(Some(&old), new, &MergeOptions::default());

        let merged = outcome.merged.job_titles.unwrap();
        // Superset of both inputs' populated entries
        for title in ["Engineer", "Team Lead", "Architect"] {
            assert!(merged.contains(title), "missing {}", title);
        }
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_empty_new_array_keeps_old() {
        let old = ProfileFacts {
            tech_stack: titles(&["Rust", "Postgres"]),
            confidence: 0.8,
            ..Default::default()
        };
        let new = ProfileFacts {
            tech_stack: Some(BTreeSet::new()),
            confidence: 0.9,
            ..Default::default()
        };
        let outcome = merge_facts(Some(&old), new, &MergeOptions::default());
        assert_eq!(outcome.merged.tech_stack.unwrap().len(), 2);
    }

    #[test]
    fn test_other_facts_new_wins_on_collision() {
        let mut old = ProfileFacts {
            confidence: 0.8,
            ..Default::default()
        };
        old.other_facts
            .insert("location".to_string(), "Berlin".into());

        let mut new = ProfileFacts {
            confidence: 0.7,
            ..Default::default()
        };
        new.other_facts
            .insert("location".to_string(), "Munich".into());
        new.other_facts.insert("visa".to_string(), "EU".into());

        let outcome = merge_facts(Some(&old), new, &MergeOptions::default());
        assert_eq!(
            outcome.merged.other_facts.get("location"),
            Some(&serde_json::json!("Munich"))
        );
        assert_eq!(
            outcome.merged.other_facts.get("visa"),
            Some(&serde_json::json!("EU"))
        );
    }

    #[test]
    fn test_merged_confidence_is_max() {
        let old = facts(Some(5.0), 0.8);
        let outcome = merge_facts(Some(&old), facts(None, 0.6), &MergeOptions::default());
        assert_eq!(outcome.merged.confidence, 0.8);

        let outcome = merge_facts(Some(&old), facts(None, 0.95), &MergeOptions::default());
        assert_eq!(outcome.merged.confidence, 0.95);
    }

    #[test]
    fn test_store_replaces_record_wholesale() {
        let mut store = FactStore::default();
        assert!(store.current().is_none());

        store.merge(facts(Some(5.0), 0.8));
        assert_eq!(store.current().unwrap().years_experience, Some(5.0));

        store.merge(facts(Some(5.0), 0.9));
        assert_eq!(store.current().unwrap().confidence, 0.9);

        store.clear();
        assert!(store.current().is_none());
    }
}
