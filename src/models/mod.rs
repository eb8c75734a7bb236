//! Data model types for candor

pub mod messages;
pub mod profile;
pub mod script;

pub use messages::{
    ChunkMetadata, ChunkPayload, CombinedResult, ContradictionOutput, DeviationResult,
    DeviationType, InboundMessage, OutboundMessage, ScriptTrackingOutput, Speaker,
};
pub use profile::{Contradiction, ProfileFacts, Severity};
pub use script::{InterviewScript, ScriptSection, ScriptSubsection, SectionClassification};
