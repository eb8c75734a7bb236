//! Candidate profile facts and contradiction types
//!
//! `ProfileFacts` is the structured picture of a candidate's claims,
//! accumulated across chunks. Each extraction is partial: a field that is
//! absent from one extraction means "not mentioned now", never "retracted".
//! The Fact Store (`services::fact_store`) owns the merge semantics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Contradiction severity, ordered from least to most serious.
///
/// Ordering matters: the consistency scorer deducts monotonically more
/// for higher severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Medium,
    Major,
    RedFlag,
}

impl Severity {
    /// String representation matching the wire format
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Medium => "medium",
            Severity::Major => "major",
            Severity::RedFlag => "red_flag",
        }
    }
}

/// A single detected inconsistency. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contradiction {
    /// Human-readable description of the inconsistency
    pub msg: String,
    /// How serious the inconsistency is
    pub severity: Severity,
    /// Profile field the contradiction concerns, when attributable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl Contradiction {
    pub fn new(msg: impl Into<String>, severity: Severity, field: Option<String>) -> Self {
        Self {
            msg: msg.into(),
            severity,
            field,
        }
    }
}

/// Structured facts about a candidate, merged across extractions.
///
/// Array fields are deduplicated sets (order irrelevant); scalar fields
/// carry the single most credible value. `confidence` comes from the most
/// recent contributing observation; the merge keeps the max of old and new.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileFacts {
    pub years_experience: Option<f64>,
    pub job_titles: Option<BTreeSet<String>>,
    pub companies: Option<BTreeSet<String>>,
    pub degrees: Option<BTreeSet<String>>,
    pub leadership_experience: Option<BTreeSet<String>>,
    pub languages: Option<BTreeSet<String>>,
    pub tech_stack: Option<BTreeSet<String>>,
    pub salary_expectations: Option<f64>,
    /// Open key-value bag for facts with no dedicated field
    pub other_facts: BTreeMap<String, serde_json::Value>,
    /// Confidence of the most recent contributing observation (0.0-1.0)
    pub confidence: f64,
    /// When this record was last extracted or merged
    pub extracted_at: Option<DateTime<Utc>>,
}

impl ProfileFacts {
    /// True when no field carries any information
    pub fn is_empty(&self) -> bool {
        self.years_experience.is_none()
            && self.salary_expectations.is_none()
            && self.job_titles.as_ref().map_or(true, |s| s.is_empty())
            && self.companies.as_ref().map_or(true, |s| s.is_empty())
            && self.degrees.as_ref().map_or(true, |s| s.is_empty())
            && self
                .leadership_experience
                .as_ref()
                .map_or(true, |s| s.is_empty())
            && self.languages.as_ref().map_or(true, |s| s.is_empty())
            && self.tech_stack.as_ref().map_or(true, |s| s.is_empty())
            && self.other_facts.is_empty()
    }
}
