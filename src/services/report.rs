//! Session summary reports
//!
//! On-demand snapshot of an active session: consistency picture, merged
//! facts, and script progress, as JSON or a human-readable Markdown
//! rendering for recruiter handoff.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Contradiction, ProfileFacts};
use crate::services::scoring::ConsistencyLabel;
use crate::services::script_tracker::ScriptState;

/// Script-progress portion of a report
#[derive(Debug, Clone, Serialize)]
pub struct ScriptSummary {
    pub current_section: u32,
    pub current_subsection: Option<String>,
    pub completed_subsections: usize,
    pub total_subsections: usize,
    pub progress: u32,
}

/// Point-in-time summary of one session
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub chunks_processed: u64,
    pub consistency_score: i64,
    pub consistency_label: String,
    pub contradictions: Vec<Contradiction>,
    pub facts: Option<ProfileFacts>,
    pub script: ScriptSummary,
    /// More than two distinct sections in the recent window
    pub mixed_topics: bool,
    /// Two or more direction reversals in the recent window
    pub out_of_order: bool,
}

impl SessionReport {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: Uuid,
        started_at: DateTime<Utc>,
        chunks_processed: u64,
        consistency_score: i64,
        contradictions: Vec<Contradiction>,
        facts: Option<ProfileFacts>,
        state: ScriptState,
        mixed_topics: bool,
        out_of_order: bool,
    ) -> Self {
        let total_subsections = state.completed_subsections.len();
        let completed_subsections = state
            .completed_subsections
            .values()
            .filter(|&&v| v)
            .count();

        Self {
            session_id,
            started_at,
            generated_at: Utc::now(),
            chunks_processed,
            consistency_score,
            consistency_label: ConsistencyLabel::for_score(consistency_score)
                .as_str()
                .to_string(),
            contradictions,
            facts,
            script: ScriptSummary {
                current_section: state.current_section,
                current_subsection: state.current_subsection,
                completed_subsections,
                total_subsections,
                progress: state.progress,
            },
            mixed_topics,
            out_of_order,
        }
    }

    /// Human-readable Markdown rendering
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Interview Session Report\n\n");
        out.push_str(&format!("- Session: `{}`\n", self.session_id));
        out.push_str(&format!("- Started: {}\n", self.started_at.to_rfc3339()));
        out.push_str(&format!("- Chunks processed: {}\n\n", self.chunks_processed));

        out.push_str("## Consistency\n\n");
        out.push_str(&format!(
            "Score **{}** / 100 ({})\n\n",
            self.consistency_score, self.consistency_label
        ));

        if self.contradictions.is_empty() {
            out.push_str("No contradictions detected.\n\n");
        } else {
            out.push_str("| Severity | Field | Detail |\n|---|---|---|\n");
            for c in &self.contradictions {
                out.push_str(&format!(
                    "| {} | {} | {} |\n",
                    c.severity.as_str(),
                    c.field.as_deref().unwrap_or("-"),
                    c.msg
                ));
            }
            out.push('\n');
        }

        out.push_str("## Candidate profile\n\n");
        match &self.facts {
            Some(facts) => {
                if let Some(years) = facts.years_experience {
                    out.push_str(&format!("- Years of experience: {}\n", years));
                }
                if let Some(titles) = &facts.job_titles {
                    out.push_str(&format!(
                        "- Job titles: {}\n",
                        titles.iter().cloned().collect::<Vec<_>>().join(", ")
                    ));
                }
                if let Some(companies) = &facts.companies {
                    out.push_str(&format!(
                        "- Companies: {}\n",
                        companies.iter().cloned().collect::<Vec<_>>().join(", ")
                    ));
                }
                if let Some(stack) = &facts.tech_stack {
                    out.push_str(&format!(
                        "- Tech stack: {}\n",
                        stack.iter().cloned().collect::<Vec<_>>().join(", ")
                    ));
                }
                if let Some(salary) = facts.salary_expectations {
                    out.push_str(&format!("- Salary expectations: {}\n", salary));
                }
                out.push('\n');
            }
            None => out.push_str("No facts extracted yet.\n\n"),
        }

        out.push_str("## Script progress\n\n");
        out.push_str(&format!(
            "Section {} ({} of {} subsections, {}% overall)\n",
            self.script.current_section,
            self.script.completed_subsections,
            self.script.total_subsections,
            self.script.progress
        ));
        if self.mixed_topics {
            out.push_str("\nNote: conversation is mixing multiple script topics.\n");
        }
        if self.out_of_order {
            out.push_str("\nNote: script sections are being covered out of order.\n");
        }

        out
    }
}
