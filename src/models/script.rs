//! Interview script outline and section classification types
//!
//! The script is a fixed, ordered outline of numbered sections, each with
//! `"N.M"`-numbered subsections. The Script Tracker walks it; the section
//! classifier maps interviewer speech onto it.

use serde::{Deserialize, Serialize};

/// One subsection of the interview script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptSubsection {
    /// Subsection id in `"N.M"` form (e.g. "2.3")
    pub id: String,
    /// Short title shown to the classifier and in reports
    pub title: String,
}

/// One numbered section of the interview script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptSection {
    /// 1-based section number
    pub number: u32,
    pub title: String,
    pub subsections: Vec<ScriptSubsection>,
}

/// The full fixed interview outline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewScript {
    pub sections: Vec<ScriptSection>,
}

impl InterviewScript {
    pub fn total_sections(&self) -> u32 {
        self.sections.len() as u32
    }

    pub fn total_subsections(&self) -> usize {
        self.sections.iter().map(|s| s.subsections.len()).sum()
    }

    /// Look up a section by 1-based number
    pub fn section(&self, number: u32) -> Option<&ScriptSection> {
        self.sections.iter().find(|s| s.number == number)
    }

    pub fn contains_subsection(&self, id: &str) -> bool {
        self.sections
            .iter()
            .any(|s| s.subsections.iter().any(|sub| sub.id == id))
    }

    /// All subsection ids in script order
    pub fn subsection_ids(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .flat_map(|s| s.subsections.iter().map(|sub| sub.id.as_str()))
    }

    /// Compact outline for embedding in classifier instructions
    pub fn outline(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            out.push_str(&format!("{}. {}\n", section.number, section.title));
            for sub in &section.subsections {
                out.push_str(&format!("  {} {}\n", sub.id, sub.title));
            }
        }
        out
    }
}

impl Default for InterviewScript {
    /// Default recruiter screening outline: 5 sections, 18 subsections
    fn default() -> Self {
        fn sub(id: &str, title: &str) -> ScriptSubsection {
            ScriptSubsection {
                id: id.to_string(),
                title: title.to_string(),
            }
        }

        Self {
            sections: vec![
                ScriptSection {
                    number: 1,
                    title: "Introduction".to_string(),
                    subsections: vec![
                        sub("1.1", "Greeting and small talk"),
                        sub("1.2", "Interview agenda overview"),
                        sub("1.3", "Company and role summary"),
                    ],
                },
                ScriptSection {
                    number: 2,
                    title: "Background and experience".to_string(),
                    subsections: vec![
                        sub("2.1", "Current role and responsibilities"),
                        sub("2.2", "Career history walkthrough"),
                        sub("2.3", "Education and certifications"),
                        sub("2.4", "Leadership and team experience"),
                    ],
                },
                ScriptSection {
                    number: 3,
                    title: "Technical deep dive".to_string(),
                    subsections: vec![
                        sub("3.1", "Primary tech stack"),
                        sub("3.2", "Recent project walkthrough"),
                        sub("3.3", "Problem-solving scenario"),
                        sub("3.4", "Tooling and workflow"),
                        sub("3.5", "Languages and frameworks breadth"),
                    ],
                },
                ScriptSection {
                    number: 4,
                    title: "Role fit".to_string(),
                    subsections: vec![
                        sub("4.1", "Motivation for the role"),
                        sub("4.2", "Salary expectations"),
                        sub("4.3", "Availability and notice period"),
                    ],
                },
                ScriptSection {
                    number: 5,
                    title: "Closing".to_string(),
                    subsections: vec![
                        sub("5.1", "Candidate questions"),
                        sub("5.2", "Next steps"),
                        sub("5.3", "Wrap-up"),
                    ],
                },
            ],
        }
    }
}

/// Raw section classification produced by the script classifier for one
/// chunk of interviewer speech. Consumed twice: by the Deviation Detector
/// (ungated) and by the Script Tracker (confidence-gated).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionClassification {
    /// Section the speech most likely belongs to, if determinable
    pub section: Option<u32>,
    /// Subsection id in `"N.M"` form, if determinable
    pub subsection: Option<String>,
    /// Classifier confidence (0.0-1.0)
    pub confidence: f64,
    /// Whether the speech is off the script entirely
    #[serde(alias = "isOffScript")]
    pub is_off_script: bool,
    /// Classifier's free-text rationale
    pub reason: Option<String>,
}

/// Validate a subsection id against the `"N.M"` shape
pub fn is_subsection_id(id: &str) -> bool {
    let mut parts = id.splitn(2, '.');
    match (parts.next(), parts.next()) {
        (Some(n), Some(m)) => {
            !n.is_empty()
                && !m.is_empty()
                && n.chars().all(|c| c.is_ascii_digit())
                && m.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}
