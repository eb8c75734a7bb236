//! Classifier adapter boundary
//!
//! Three instantiations of one external LLM classifier contract:
//! contradiction scan, profile extraction, and script classification. The
//! core's contract with this module is "validated value or explicit
//! failure", never raw model text: transport failures surface as
//! `Error::Classifier` (the orchestrator degrades them to neutral
//! contributions), while malformed output is exhausted through the JSON
//! recovery chain and becomes "no information".

pub mod json_extract;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::TomlConfig;
use crate::error::{Error, Result};
use crate::models::{Contradiction, InterviewScript, ProfileFacts, SectionClassification};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Result of one profile extraction call
#[derive(Debug, Clone, Default)]
pub struct ProfileExtraction {
    /// Partial facts extracted from the window, if any
    pub facts: Option<ProfileFacts>,
    /// Contradictions the extractor noticed directly
    pub contradictions: Vec<Contradiction>,
}

/// External classifier seam. Implemented by the OpenAI-backed client in
/// production and by scripted classifiers in tests.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Compare the latest chunk against the rolling context; report only
    /// inconsistencies newly introduced by this chunk.
    async fn scan_contradictions(
        &self,
        chunk: &str,
        context: &[String],
        running_score: i64,
    ) -> Result<Vec<Contradiction>>;

    /// Extract a partial candidate profile from the transcript window.
    async fn extract_profile(
        &self,
        window: &[String],
        current: Option<&ProfileFacts>,
    ) -> Result<ProfileExtraction>;

    /// Compare old vs. new structured facts for material deltas, tolerant
    /// of ordinary career progression.
    async fn check_consistency(
        &self,
        old: &ProfileFacts,
        new: &ProfileFacts,
    ) -> Result<Vec<Contradiction>>;

    /// Map one chunk of interviewer speech onto the script outline.
    async fn classify_section(
        &self,
        chunk: &str,
        script: &InterviewScript,
        current_section: u32,
    ) -> Result<Option<SectionClassification>>;
}

/// OpenAI-compatible chat-completion classifier
pub struct OpenAiClassifier {
    http_client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    /// Truncation bound for chunk text embedded in instructions
    excerpt_len: usize,
}

impl OpenAiClassifier {
    pub fn new(api_key: Option<String>, config: &TomlConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Classifier(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http_client,
            api_key,
            model: config.openai_model().to_string(),
            base_url: config.openai_base_url().to_string(),
            excerpt_len: config.analysis.chunk_excerpt_len,
        })
    }

    /// One chat completion round-trip, returning the raw assistant text
    async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(Error::Classifier("API key not configured".to_string()));
        };

        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "temperature": 0.0,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Classifier(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Classifier(format!(
                "API error {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMessage,
        }
        #[derive(Deserialize)]
        struct ChoiceMessage {
            content: String,
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Classifier(format!("Response parse error: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Classifier("Empty completion response".to_string()))
    }

    fn excerpt<'a>(&self, text: &'a str) -> &'a str {
        truncate_chars(text, self.excerpt_len)
    }
}

/// Char-boundary-safe prefix truncation
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Deserialize a contradictions array leniently: entries that do not match
/// the schema are dropped rather than failing the whole list.
fn contradictions_from(value: &Value) -> Vec<Contradiction> {
    value
        .get("contradictions")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn scan_contradictions(
        &self,
        chunk: &str,
        context: &[String],
        running_score: i64,
    ) -> Result<Vec<Contradiction>> {
        let system = "You monitor a live job interview for factual inconsistencies in the \
                      candidate's statements. Compare the LATEST chunk against the recent \
                      context. Report ONLY inconsistencies newly introduced by the latest \
                      chunk; do not repeat previously known ones. Respond with one JSON \
                      object: {\"contradictions\": [{\"msg\": string, \"severity\": \
                      \"minor\"|\"medium\"|\"major\"|\"red_flag\", \"field\": string|null}]}";
        let user = format!(
            "Current consistency score: {}\n\nRecent context:\n{}\n\nLatest chunk:\n{}",
            running_score,
            context.join("\n"),
            self.excerpt(chunk)
        );

        let text = self.chat(system, &user).await?;
        let Some(value) = json_extract::extract_json_object(&text, "contradictions") else {
            debug!("Contradiction scan returned no parseable JSON, treating as clean");
            return Ok(Vec::new());
        };
        Ok(contradictions_from(&value))
    }

    async fn extract_profile(
        &self,
        window: &[String],
        current: Option<&ProfileFacts>,
    ) -> Result<ProfileExtraction> {
        let system = "You extract structured facts about a job candidate from interview \
                      transcript excerpts. Only include facts actually stated; omit fields \
                      with no information. Respond with one JSON object: {\"facts\": \
                      {\"years_experience\": number|null, \"job_titles\": [string], \
                      \"companies\": [string], \"degrees\": [string], \
                      \"leadership_experience\": [string], \"languages\": [string], \
                      \"tech_stack\": [string], \"salary_expectations\": number|null, \
                      \"other_facts\": object, \"confidence\": number}, \
                      \"contradictions\": [{\"msg\": string, \"severity\": string, \
                      \"field\": string|null}]}";
        let current_json = current
            .map(|f| serde_json::to_string(f).unwrap_or_default())
            .unwrap_or_else(|| "none".to_string());
        let user = format!(
            "Known facts so far: {}\n\nTranscript window:\n{}",
            current_json,
            window.join("\n")
        );

        let text = self.chat(system, &user).await?;
        let Some(value) = json_extract::extract_json_object(&text, "facts") else {
            debug!("Profile extraction returned no parseable JSON, treating as empty");
            return Ok(ProfileExtraction::default());
        };

        let facts = value
            .get("facts")
            .and_then(|v| serde_json::from_value::<ProfileFacts>(v.clone()).ok())
            .filter(|f| !f.is_empty());

        Ok(ProfileExtraction {
            facts,
            contradictions: contradictions_from(&value),
        })
    }

    async fn check_consistency(
        &self,
        old: &ProfileFacts,
        new: &ProfileFacts,
    ) -> Result<Vec<Contradiction>> {
        let system = "You compare two structured profiles of the same job candidate, \
                      extracted at different points of one interview. Normal career \
                      progression (a title change reflecting growth, an added skill) is \
                      NOT a contradiction. Flag only material deltas: years-of-experience \
                      differing by 2 or more, unrelated job titles, simultaneous \
                      conflicting roles, material leadership downgrades, salary deltas \
                      over 30%. Respond with one JSON object: {\"contradictions\": \
                      [{\"msg\": string, \"severity\": \"minor\"|\"medium\"|\"major\"|\
                      \"red_flag\", \"field\": string|null}]}";
        let user = format!(
            "Earlier profile:\n{}\n\nLatest profile:\n{}",
            serde_json::to_string(old).unwrap_or_default(),
            serde_json::to_string(new).unwrap_or_default()
        );

        let text = self.chat(system, &user).await?;
        let Some(value) = json_extract::extract_json_object(&text, "contradictions") else {
            return Ok(Vec::new());
        };
        Ok(contradictions_from(&value))
    }

    async fn classify_section(
        &self,
        chunk: &str,
        script: &InterviewScript,
        current_section: u32,
    ) -> Result<Option<SectionClassification>> {
        let system = format!(
            "You track an interviewer's position in a fixed interview script. Given the \
             outline and the interviewer's latest words, identify the section and \
             subsection being covered. Respond with one JSON object: {{\"section\": \
             number|null, \"subsection\": \"N.M\"|null, \"confidence\": number, \
             \"deviation\": boolean, \"isOffScript\": boolean, \"reason\": string}}\n\n\
             Script outline:\n{}",
            script.outline()
        );
        let user = format!(
            "Current section: {}\n\nInterviewer said:\n{}",
            current_section,
            self.excerpt(chunk)
        );

        let text = self.chat(&system, &user).await?;
        let Some(value) = json_extract::extract_json_object(&text, "section") else {
            debug!("Section classification returned no parseable JSON");
            return Ok(None);
        };
        Ok(serde_json::from_value(value).ok())
    }
}
