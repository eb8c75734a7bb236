//! Session transport messages and per-chunk result types
//!
//! The WebSocket envelope is a tagged enum, one variant per message type.
//! Outbound result payloads use camelCase field names; that is the schema
//! the browser extension consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::profile::Contradiction;

/// Who produced a transcript chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Candidate,
    Recruiter,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::Candidate => "candidate",
            Speaker::Recruiter => "recruiter",
        }
    }

    /// The recruiter drives the script; only their speech moves the tracker
    pub fn is_interviewer(&self) -> bool {
        matches!(self, Speaker::Recruiter)
    }
}

/// One transcript chunk as delivered by the capture layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub chunk: String,
    pub speaker: Speaker,
}

/// Inbound session messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    TranscriptChunk { payload: ChunkPayload },
    Reset,
}

/// Outbound session messages
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Connection {
        status: String,
        #[serde(rename = "sessionId")]
        session_id: uuid::Uuid,
    },
    AnalysisResult {
        payload: CombinedResult,
        timestamp: DateTime<Utc>,
    },
    Reset {
        status: String,
    },
    Error {
        message: String,
    },
}

/// Smoothed consistency output, recomputed every chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContradictionOutput {
    /// Running consistency score, 0-100. Higher = more consistent.
    pub contradiction_score: i64,
    /// Signed delta versus the previous chunk, as a string ("0", "-12")
    pub trend: String,
    /// Score band label ("consistent" .. "highly_inconsistent")
    pub label: String,
    /// All contradictions found this chunk, possibly empty
    pub contradictions: Vec<Contradiction>,
}

/// Deviation classification for one interviewer chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationResult {
    pub deviation: bool,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<DeviationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DeviationResult {
    pub fn none() -> Self {
        Self {
            deviation: false,
            kind: None,
            message: None,
        }
    }
}

/// How interviewer speech deviated from linear script progression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationType {
    JumpAhead,
    GoingBackward,
    OffScript,
}

/// Script-tracking portion of a combined result. Absent for candidate
/// speech, which never moves the tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptTrackingOutput {
    pub current_section: u32,
    pub current_subsection: Option<String>,
    pub completed_sections: BTreeMap<u32, bool>,
    pub completed_subsections: BTreeMap<String, bool>,
    /// 0-100, 50/50 weighted across sections and subsections
    pub progress: u32,
    pub deviation: DeviationResult,
}

/// Per-chunk bookkeeping echoed back with every result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    pub chunk_number: u64,
    pub speaker: Speaker,
    pub timestamp: DateTime<Utc>,
}

/// The one combined result emitted per processed chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedResult {
    pub contradiction: ContradictionOutput,
    #[serde(rename = "scriptTracking")]
    pub script_tracking: Option<ScriptTrackingOutput>,
    pub metadata: ChunkMetadata,
}
