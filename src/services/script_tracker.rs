//! Script Tracker: monotonic interview-progress state machine
//!
//! Tracks the interviewer's position and completion within the fixed
//! script. Completion flags are one-way latches: once a subsection is
//! complete it stays complete for the session's lifetime, so classifier
//! noise can never un-finish work. Section flags are derived as the AND of
//! their subsections' flags, never set directly by classification.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::config::AnalysisParams;
use crate::error::{Error, Result};
use crate::models::script::is_subsection_id;
use crate::models::{InterviewScript, SectionClassification};

/// Snapshot of tracker state, cheap to clone into outbound results
#[derive(Debug, Clone)]
pub struct ScriptState {
    pub current_section: u32,
    pub current_subsection: Option<String>,
    pub completed_sections: BTreeMap<u32, bool>,
    pub completed_subsections: BTreeMap<String, bool>,
    pub progress: u32,
}

/// Monotonic state machine over the interview script
#[derive(Debug)]
pub struct ScriptTracker {
    script: Arc<InterviewScript>,
    section_threshold: f64,
    subsection_threshold: f64,
    completion_threshold: f64,
    current_section: u32,
    current_subsection: Option<String>,
    completed_sections: BTreeMap<u32, bool>,
    completed_subsections: BTreeMap<String, bool>,
}

impl ScriptTracker {
    pub fn new(script: Arc<InterviewScript>, params: &AnalysisParams) -> Self {
        let mut tracker = Self {
            script,
            section_threshold: params.section_threshold,
            subsection_threshold: params.subsection_threshold,
            completion_threshold: params.completion_threshold,
            current_section: 1,
            current_subsection: None,
            completed_sections: BTreeMap::new(),
            completed_subsections: BTreeMap::new(),
        };
        tracker.init_flags();
        tracker
    }

    fn init_flags(&mut self) {
        self.completed_sections = self
            .script
            .sections
            .iter()
            .map(|s| (s.number, false))
            .collect();
        self.completed_subsections = self
            .script
            .subsection_ids()
            .map(|id| (id.to_string(), false))
            .collect();
    }

    pub fn current_section(&self) -> u32 {
        self.current_section
    }

    /// Apply one classification of interviewer speech.
    ///
    /// Off-script speech is ignored entirely so off-topic digressions
    /// cannot corrupt position. Section and subsection adoption are gated
    /// by their confidence thresholds; completion latching requires the
    /// higher completion threshold on top of subsection adoption.
    pub fn apply(&mut self, classification: &SectionClassification) {
        if classification.is_off_script {
            return;
        }

        if let Some(section) = classification.section {
            let in_range = section >= 1 && section <= self.script.total_sections();
            if in_range && classification.confidence >= self.section_threshold {
                // Jumps are permitted to occur; the Deviation Detector has
                // already judged this same raw input.
                self.current_section = section;
            }
        }

        if let Some(subsection) = classification.subsection.as_deref() {
            if is_subsection_id(subsection)
                && self.script.contains_subsection(subsection)
                && classification.confidence >= self.subsection_threshold
            {
                self.current_subsection = Some(subsection.to_string());

                if classification.confidence >= self.completion_threshold {
                    self.latch_subsection(subsection);
                }
            }
        }
    }

    /// Manually mark a subsection complete, bypassing confidence gating.
    /// One-way latch semantics are preserved: marking an already-complete
    /// subsection is a no-op.
    pub fn mark_subsection_complete(&mut self, subsection: &str) -> Result<()> {
        if !self.script.contains_subsection(subsection) {
            return Err(Error::NotFound(format!(
                "Subsection {} is not in the interview script",
                subsection
            )));
        }
        self.latch_subsection(subsection);
        Ok(())
    }

    fn latch_subsection(&mut self, subsection: &str) {
        let flag = self
            .completed_subsections
            .entry(subsection.to_string())
            .or_insert(false);
        if !*flag {
            *flag = true;
            debug!(subsection = %subsection, "Subsection completed");
        }
        self.recompute_section_flags();
    }

    /// A section is complete exactly when all its subsections are.
    /// Latched flags are never cleared here: completion is derived from
    /// the subsection latches, which only ever go false -> true.
    fn recompute_section_flags(&mut self) {
        for section in &self.script.sections {
            let all_done = !section.subsections.is_empty()
                && section.subsections.iter().all(|sub| {
                    self.completed_subsections
                        .get(&sub.id)
                        .copied()
                        .unwrap_or(false)
                });
            if all_done {
                self.completed_sections.insert(section.number, true);
            }
        }
    }

    /// Progress 0-100, weighted 50/50 across sections and subsections
    pub fn progress(&self) -> u32 {
        let total_sections = self.script.total_sections() as f64;
        let total_subsections = self.script.total_subsections() as f64;
        if total_sections == 0.0 || total_subsections == 0.0 {
            return 0;
        }

        let done_sections = self.completed_sections.values().filter(|&&v| v).count() as f64;
        let done_subsections = self
            .completed_subsections
            .values()
            .filter(|&&v| v)
            .count() as f64;

        let progress =
            50.0 * done_sections / total_sections + 50.0 * done_subsections / total_subsections;
        progress.round() as u32
    }

    pub fn state(&self) -> ScriptState {
        ScriptState {
            current_section: self.current_section,
            current_subsection: self.current_subsection.clone(),
            completed_sections: self.completed_sections.clone(),
            completed_subsections: self.completed_subsections.clone(),
            progress: self.progress(),
        }
    }

    /// Return to the initial state: section 1, no subsection, all flags
    /// false, 0% progress.
    pub fn reset(&mut self) {
        self.current_section = 1;
        self.current_subsection = None;
        self.init_flags();
    }
}
