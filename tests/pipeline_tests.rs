//! End-to-end pipeline tests with a scripted classifier
//!
//! Exercises the full per-chunk path (scan, cadence-gated extraction,
//! merge, consistency check, scoring, script tracking) without any
//! network dependency.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use candor::config::AnalysisParams;
use candor::error::Result;
use candor::models::{
    Contradiction, DeviationType, InterviewScript, ProfileFacts, SectionClassification, Severity,
    Speaker,
};
use candor::services::classifier::{Classifier, ProfileExtraction};
use candor::services::InterviewSession;

/// Deterministic classifier: profile extractions come from a fixed
/// series, section classifications from a scripted queue, and the
/// consistency check flags years-of-experience deltas of 2+.
struct ScriptedClassifier {
    extraction_calls: AtomicUsize,
    extractions: Vec<ProfileFacts>,
    extraction_windows: std::sync::Mutex<Vec<Vec<String>>>,
    classifications: Mutex<VecDeque<Option<SectionClassification>>>,
}

impl ScriptedClassifier {
    fn new(extractions: Vec<ProfileFacts>) -> Self {
        Self {
            extraction_calls: AtomicUsize::new(0),
            extractions,
            extraction_windows: std::sync::Mutex::new(Vec::new()),
            classifications: Mutex::new(VecDeque::new()),
        }
    }

    async fn queue_classification(&self, classification: Option<SectionClassification>) {
        self.classifications.lock().await.push_back(classification);
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn scan_contradictions(
        &self,
        _chunk: &str,
        _context: &[String],
        _running_score: i64,
    ) -> Result<Vec<Contradiction>> {
        Ok(Vec::new())
    }

    async fn extract_profile(
        &self,
        window: &[String],
        _current: Option<&ProfileFacts>,
    ) -> Result<ProfileExtraction> {
        self.extraction_windows
            .lock()
            .unwrap()
            .push(window.to_vec());
        let call = self.extraction_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ProfileExtraction {
            facts: self.extractions.get(call).cloned(),
            contradictions: Vec::new(),
        })
    }

    async fn check_consistency(
        &self,
        old: &ProfileFacts,
        new: &ProfileFacts,
    ) -> Result<Vec<Contradiction>> {
        let mut contradictions = Vec::new();
        if let (Some(old_years), Some(new_years)) = (old.years_experience, new.years_experience) {
            if (old_years - new_years).abs() >= 2.0 {
                contradictions.push(Contradiction::new(
                    format!(
                        "Years of experience changed from {} to {}",
                        old_years, new_years
                    ),
                    Severity::Major,
                    Some("years_experience".to_string()),
                ));
            }
        }
        Ok(contradictions)
    }

    async fn classify_section(
        &self,
        _chunk: &str,
        _script: &InterviewScript,
        _current_section: u32,
    ) -> Result<Option<SectionClassification>> {
        Ok(self
            .classifications
            .lock()
            .await
            .pop_front()
            .unwrap_or(None))
    }
}

fn facts(years: f64, confidence: f64) -> ProfileFacts {
    ProfileFacts {
        years_experience: Some(years),
        confidence,
        ..Default::default()
    }
}

fn classification(
    section: Option<u32>,
    subsection: Option<&str>,
    confidence: f64,
    is_off_script: bool,
) -> SectionClassification {
    SectionClassification {
        section,
        subsection: subsection.map(String::from),
        confidence,
        is_off_script,
        reason: None,
    }
}

fn session_with(classifier: Arc<ScriptedClassifier>) -> InterviewSession {
    InterviewSession::new(
        classifier,
        Arc::new(InterviewScript::default()),
        AnalysisParams::default(),
    )
}

#[tokio::test]
async fn contradictory_experience_claim_lowers_score_on_chunk_six() {
    // Chunk 1 states "5 years", chunk 6 states "2 years". Extraction runs
    // on chunks 1 and 6 (cadence 6); the consistency check and the merge
    // must both flag the delta, and the running score must drop.
    let classifier = Arc::new(ScriptedClassifier::new(vec![
        facts(5.0, 0.8),
        facts(2.0, 0.7),
    ]));
    let mut session = session_with(Arc::clone(&classifier));

    let first = session
        .process_chunk("I have 5 years of experience with Rust", Speaker::Candidate)
        .await
        .unwrap();
    let score_after_first = first.contradiction.contradiction_score;
    assert_eq!(score_after_first, 100);
    assert!(first.contradiction.contradictions.is_empty());
    assert!(first.script_tracking.is_none());

    for i in 2..=5 {
        let result = session
            .process_chunk(&format!("filler chunk {}", i), Speaker::Candidate)
            .await
            .unwrap();
        // No extraction off-cadence: nothing to contradict
        assert!(result.contradiction.contradictions.is_empty());
    }

    let sixth = session
        .process_chunk("Well, really about 2 years of experience", Speaker::Candidate)
        .await
        .unwrap();

    assert_eq!(sixth.metadata.chunk_number, 6);
    let majors: Vec<&Contradiction> = sixth
        .contradiction
        .contradictions
        .iter()
        .filter(|c| {
            c.severity == Severity::Major && c.field.as_deref() == Some("years_experience")
        })
        .collect();
    assert!(
        !majors.is_empty(),
        "chunk 6 must carry a major years_experience contradiction"
    );
    assert!(
        sixth.contradiction.contradiction_score < score_after_first,
        "running score must decrease versus chunk 1"
    );
    assert!(sixth.contradiction.trend.starts_with('-'));

    // Extraction ran exactly twice: chunk 1 and chunk 6
    assert_eq!(classifier.extraction_calls.load(Ordering::SeqCst), 2);
    // The earlier claim stays on record: higher-confidence old value wins,
    // the disputed one is retained
    let merged = session.facts().unwrap();
    assert_eq!(merged.years_experience, Some(5.0));
    assert!(merged.other_facts.contains_key("disputed_years_experience"));
}

#[tokio::test]
async fn extraction_input_includes_the_triggering_chunk() {
    // The claim that lands on an extraction chunk must be visible to that
    // extraction, not deferred to the next cadence point.
    let classifier = Arc::new(ScriptedClassifier::new(vec![
        facts(5.0, 0.8),
        facts(2.0, 0.7),
    ]));
    let mut session = session_with(Arc::clone(&classifier));

    session
        .process_chunk("I have 5 years of experience with Rust", Speaker::Candidate)
        .await
        .unwrap();
    for i in 2..=5 {
        session
            .process_chunk(&format!("filler chunk {}", i), Speaker::Candidate)
            .await
            .unwrap();
    }
    session
        .process_chunk("Well, really about 2 years of experience", Speaker::Candidate)
        .await
        .unwrap();

    let windows = classifier.extraction_windows.lock().unwrap();
    assert_eq!(windows.len(), 2);
    let first = windows[0].join(" ");
    assert!(
        first.contains("5 years"),
        "chunk-1 extraction must see the '5 years' claim, saw: {:?}",
        windows[0]
    );
    let sixth = windows[1].join(" ");
    assert!(sixth.contains("5 years"));
    assert!(
        sixth.contains("2 years"),
        "chunk-6 extraction must see the '2 years' claim, saw: {:?}",
        windows[1]
    );
}

#[tokio::test]
async fn interviewer_speech_drives_tracker_and_deviation() {
    let classifier = Arc::new(ScriptedClassifier::new(vec![]));
    let mut session = session_with(Arc::clone(&classifier));

    // Normal advance 1 -> 2, completing subsection 2.1
    classifier
        .queue_classification(Some(classification(Some(2), Some("2.1"), 0.8, false)))
        .await;
    let result = session
        .process_chunk("Let's talk about your background", Speaker::Recruiter)
        .await
        .unwrap();
    let tracking = result.script_tracking.unwrap();
    assert_eq!(tracking.current_section, 2);
    assert!(!tracking.deviation.deviation);
    assert!(tracking.completed_subsections["2.1"]);
    assert!(tracking.progress > 0);

    // Jump 2 -> 5: deviation reported, and the jump is still committed
    classifier
        .queue_classification(Some(classification(Some(5), None, 0.9, false)))
        .await;
    let result = session
        .process_chunk("Before we wrap up, any questions?", Speaker::Recruiter)
        .await
        .unwrap();
    let tracking = result.script_tracking.unwrap();
    assert_eq!(tracking.deviation.kind, Some(DeviationType::JumpAhead));
    let message = tracking.deviation.message.clone().unwrap();
    assert!(message.contains("3, 4"), "skipped sections named: {}", message);
    assert_eq!(tracking.current_section, 5);

    // Off-script speech: reported, but position and completions untouched
    classifier
        .queue_classification(Some(classification(None, None, 0.9, true)))
        .await;
    let result = session
        .process_chunk("Did you catch the game last night?", Speaker::Recruiter)
        .await
        .unwrap();
    let tracking = result.script_tracking.unwrap();
    assert_eq!(tracking.deviation.kind, Some(DeviationType::OffScript));
    assert_eq!(tracking.current_section, 5);
    assert!(tracking.completed_subsections["2.1"]);

    // Going backward 5 -> 2
    classifier
        .queue_classification(Some(classification(Some(2), None, 0.8, false)))
        .await;
    let result = session
        .process_chunk("Actually, back to your previous role", Speaker::Recruiter)
        .await
        .unwrap();
    let tracking = result.script_tracking.unwrap();
    assert_eq!(tracking.deviation.kind, Some(DeviationType::GoingBackward));
    assert_eq!(tracking.current_section, 2);
}

#[tokio::test]
async fn low_confidence_jump_is_reported_but_not_committed() {
    let classifier = Arc::new(ScriptedClassifier::new(vec![]));
    let mut session = session_with(Arc::clone(&classifier));

    // Confidence below the section threshold: deviation detection sees the
    // raw classification, the tracker refuses to adopt it.
    classifier
        .queue_classification(Some(classification(Some(4), None, 0.2, false)))
        .await;
    let result = session
        .process_chunk("Moving on to salary", Speaker::Recruiter)
        .await
        .unwrap();
    let tracking = result.script_tracking.unwrap();
    assert_eq!(tracking.deviation.kind, Some(DeviationType::JumpAhead));
    assert_eq!(tracking.current_section, 1);
}

#[tokio::test]
async fn candidate_speech_never_produces_script_tracking() {
    let classifier = Arc::new(ScriptedClassifier::new(vec![]));
    let mut session = session_with(classifier);

    for i in 0..3 {
        let result = session
            .process_chunk(&format!("candidate answer {}", i), Speaker::Candidate)
            .await
            .unwrap();
        assert!(result.script_tracking.is_none());
    }
}

#[tokio::test]
async fn reset_returns_session_to_defaults() {
    let classifier = Arc::new(ScriptedClassifier::new(vec![
        facts(5.0, 0.8),
        facts(2.0, 0.9),
    ]));
    let mut session = session_with(Arc::clone(&classifier));

    classifier
        .queue_classification(Some(classification(Some(2), Some("2.1"), 0.9, false)))
        .await;
    session
        .process_chunk("I have 5 years of experience", Speaker::Candidate)
        .await
        .unwrap();
    session
        .process_chunk("Tell me more about that", Speaker::Recruiter)
        .await
        .unwrap();

    assert!(session.facts().is_some());
    assert!(session.chunk_count() > 0);

    session.reset();

    assert_eq!(session.chunk_count(), 0);
    assert_eq!(session.running_score(), 100);
    assert!(session.facts().is_none());
    let report = session.report();
    assert_eq!(report.script.current_section, 1);
    assert_eq!(report.script.progress, 0);
    assert!(report.contradictions.is_empty());
}

#[tokio::test]
async fn report_reflects_session_state() {
    let classifier = Arc::new(ScriptedClassifier::new(vec![facts(5.0, 0.8)]));
    let mut session = session_with(Arc::clone(&classifier));

    classifier
        .queue_classification(Some(classification(Some(1), Some("1.1"), 0.9, false)))
        .await;
    session
        .process_chunk("I have 5 years of experience", Speaker::Candidate)
        .await
        .unwrap();
    session
        .process_chunk("Welcome, let's get started", Speaker::Recruiter)
        .await
        .unwrap();

    let report = session.report();
    assert_eq!(report.chunks_processed, 2);
    assert_eq!(report.consistency_score, 100);
    assert_eq!(report.consistency_label, "consistent");
    assert_eq!(report.facts.as_ref().unwrap().years_experience, Some(5.0));
    assert_eq!(report.script.completed_subsections, 1);
    assert_eq!(report.script.total_subsections, 18);

    let markdown = report.to_markdown();
    assert!(markdown.contains("Score **100** / 100"));
}
