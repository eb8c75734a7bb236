//! Analysis services for candor

pub mod classifier;
pub mod deviation;
pub mod fact_store;
pub mod orchestrator;
pub mod report;
pub mod scoring;
pub mod script_tracker;

pub use classifier::{Classifier, OpenAiClassifier, ProfileExtraction};
pub use fact_store::{FactStore, MergeOptions, MergeOutcome};
pub use orchestrator::InterviewSession;
pub use report::SessionReport;
pub use script_tracker::ScriptTracker;
