//! Chunk Orchestrator
//!
//! One `InterviewSession` per active interview, owned exclusively by that
//! session's transport loop. Chunks are processed strictly sequentially in
//! arrival order; the merge and completion-latch logic assume a consistent
//! prior state. Within one chunk the independent classifier calls are
//! dispatched concurrently, but all results join before any state mutates.
//!
//! A failed or malformed classifier call degrades to an empty/neutral
//! contribution. The worst case for any chunk is that it contributes
//! nothing; it never crashes the session or breaks an invariant.

use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AnalysisParams;
use crate::error::{Error, Result};
use crate::models::{
    ChunkMetadata, CombinedResult, Contradiction, InterviewScript, ProfileFacts,
    ScriptTrackingOutput, SectionClassification, Speaker,
};
use crate::services::classifier::{Classifier, ProfileExtraction};
use crate::services::deviation;
use crate::services::fact_store::{FactStore, MergeOptions};
use crate::services::report::SessionReport;
use crate::services::scoring::{self, DEFAULT_SCORE};
use crate::services::script_tracker::ScriptTracker;

/// Bound on the recent-section history kept for the analytical helpers
const SECTION_HISTORY_LEN: usize = 8;

/// Per-session analysis state and driver
pub struct InterviewSession {
    id: Uuid,
    params: AnalysisParams,
    classifier: Arc<dyn Classifier>,
    script: Arc<InterviewScript>,
    started_at: chrono::DateTime<Utc>,

    chunk_counter: u64,
    running_score: i64,
    /// Short rolling context for the local contradiction scan
    recent_context: VecDeque<String>,
    /// Larger window for profile extraction
    transcript_window: VecDeque<String>,
    facts: FactStore,
    tracker: ScriptTracker,
    /// Sections observed for interviewer speech, for the trend helpers
    recent_sections: VecDeque<u32>,
    /// All contradictions seen this session, for reporting
    accumulated: Vec<Contradiction>,
}

impl InterviewSession {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        script: Arc<InterviewScript>,
        params: AnalysisParams,
    ) -> Self {
        let merge_options = MergeOptions {
            min_confidence: params.min_confidence,
            keep_conflicts: params.keep_conflicts,
        };
        let tracker = ScriptTracker::new(Arc::clone(&script), &params);
        Self {
            id: Uuid::new_v4(),
            params,
            classifier,
            script,
            started_at: Utc::now(),
            chunk_counter: 0,
            running_score: DEFAULT_SCORE,
            recent_context: VecDeque::new(),
            transcript_window: VecDeque::new(),
            facts: FactStore::new(merge_options),
            tracker,
            recent_sections: VecDeque::new(),
            accumulated: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn running_score(&self) -> i64 {
        self.running_score
    }

    pub fn chunk_count(&self) -> u64 {
        self.chunk_counter
    }

    /// Process one transcript chunk and emit the combined result.
    pub async fn process_chunk(&mut self, chunk: &str, speaker: Speaker) -> Result<CombinedResult> {
        if chunk.trim().is_empty() {
            return Err(Error::InvalidInput("Empty transcript chunk".to_string()));
        }

        self.chunk_counter += 1;
        let chunk_number = self.chunk_counter;
        let run_extraction =
            chunk_number == 1 || chunk_number % self.params.extraction_cadence == 0;
        let run_classification = speaker.is_interviewer();

        debug!(
            session_id = %self.id,
            chunk_number,
            speaker = speaker.as_str(),
            run_extraction,
            "Processing chunk"
        );

        let context: Vec<String> = self.recent_context.iter().cloned().collect();
        // The chunk that triggers an extraction is part of its input; it
        // only enters the rolling windows after the classifier calls return.
        let window: Vec<String> = self
            .transcript_window
            .iter()
            .cloned()
            .chain(std::iter::once(chunk.to_string()))
            .collect();

        // Independent classifier calls dispatched concurrently; results
        // join before any state mutation below.
        let (scan, extraction, classification) = tokio::join!(
            self.classifier
                .scan_contradictions(chunk, &context, self.running_score),
            async {
                if run_extraction {
                    Some(
                        self.classifier
                            .extract_profile(&window, self.facts.current())
                            .await,
                    )
                } else {
                    None
                }
            },
            async {
                if run_classification {
                    Some(
                        self.classifier
                            .classify_section(chunk, &self.script, self.tracker.current_section())
                            .await,
                    )
                } else {
                    None
                }
            },
        );

        let mut all_contradictions = degrade(scan, &self.id, "contradiction scan");

        if let Some(extraction) = extraction {
            let extraction =
                degrade_with(extraction, &self.id, "profile extraction", ProfileExtraction::default);
            all_contradictions.extend(extraction.contradictions);

            if let Some(new_facts) = extraction.facts {
                let prior: Option<ProfileFacts> = self.facts.current().cloned();

                // Consistency check depends on the extraction result, so it
                // runs after the join, against the pre-merge facts.
                if let Some(prior) = prior.as_ref() {
                    let consistency = self.classifier.check_consistency(prior, &new_facts).await;
                    all_contradictions.extend(degrade(consistency, &self.id, "consistency check"));
                }

                let outcome = self.facts.merge(new_facts);
                all_contradictions.extend(outcome.conflicts);
            }
        }

        let contradiction_output = scoring::apply(self.running_score, all_contradictions)?;
        self.running_score = contradiction_output.contradiction_score;
        self.accumulated
            .extend(contradiction_output.contradictions.iter().cloned());

        let script_tracking = classification.map(|outcome| {
            let classification = degrade_with(outcome, &self.id, "section classification", || None);
            self.apply_script_classification(classification)
        });

        self.push_chunk_text(chunk);

        Ok(CombinedResult {
            contradiction: contradiction_output,
            script_tracking,
            metadata: ChunkMetadata {
                chunk_number,
                speaker,
                timestamp: Utc::now(),
            },
        })
    }

    /// Deviation detection on the raw classification, then the tracker
    /// update with the same classification.
    fn apply_script_classification(
        &mut self,
        classification: Option<SectionClassification>,
    ) -> ScriptTrackingOutput {
        let classification = classification.unwrap_or_default();

        let deviation_result = deviation::detect(
            self.tracker.current_section(),
            classification.section,
            classification.is_off_script,
            self.script.total_sections(),
        );
        if deviation_result.deviation {
            info!(
                session_id = %self.id,
                kind = ?deviation_result.kind,
                "Script deviation detected"
            );
        }

        self.tracker.apply(&classification);

        self.recent_sections.push_back(self.tracker.current_section());
        while self.recent_sections.len() > SECTION_HISTORY_LEN {
            self.recent_sections.pop_front();
        }

        let state = self.tracker.state();
        ScriptTrackingOutput {
            current_section: state.current_section,
            current_subsection: state.current_subsection,
            completed_sections: state.completed_sections,
            completed_subsections: state.completed_subsections,
            progress: state.progress,
            deviation: deviation_result,
        }
    }

    fn push_chunk_text(&mut self, chunk: &str) {
        self.recent_context.push_back(chunk.to_string());
        while self.recent_context.len() > self.params.rolling_window_size {
            self.recent_context.pop_front();
        }
        self.transcript_window.push_back(chunk.to_string());
        while self.transcript_window.len() > self.params.extraction_window_size {
            self.transcript_window.pop_front();
        }
    }

    /// Manually mark a subsection complete (UI-driven, bypasses gating)
    pub fn mark_subsection_complete(&mut self, subsection: &str) -> Result<()> {
        self.tracker.mark_subsection_complete(subsection)
    }

    /// Clear all session state back to defaults. Serialized with chunk
    /// processing by the session's owner; just another sequential event.
    pub fn reset(&mut self) {
        info!(session_id = %self.id, "Resetting session state");
        self.chunk_counter = 0;
        self.running_score = DEFAULT_SCORE;
        self.recent_context.clear();
        self.transcript_window.clear();
        self.facts.clear();
        self.tracker.reset();
        self.recent_sections.clear();
        self.accumulated.clear();
    }

    /// Current facts, if any extraction has landed
    pub fn facts(&self) -> Option<&ProfileFacts> {
        self.facts.current()
    }

    /// Point-in-time summary of the session
    pub fn report(&self) -> SessionReport {
        let sections: Vec<u32> = self.recent_sections.iter().copied().collect();
        let state = self.tracker.state();
        SessionReport::new(
            self.id,
            self.started_at,
            self.chunk_counter,
            self.running_score,
            self.accumulated.clone(),
            self.facts.current().cloned(),
            state,
            deviation::mixed_topics(&sections),
            deviation::out_of_order(&sections),
        )
    }
}

/// Degrade a classifier failure to an empty contribution, logging it.
fn degrade<T: Default>(result: Result<T>, session_id: &Uuid, call: &str) -> T {
    degrade_with(result, session_id, call, T::default)
}

fn degrade_with<T>(result: Result<T>, session_id: &Uuid, call: &str, fallback: impl FnOnce() -> T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(
                session_id = %session_id,
                call,
                error = %e,
                "Classifier call failed, degrading to neutral contribution"
            );
            fallback()
        }
    }
}
