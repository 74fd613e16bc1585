//! Chimera Judge - Moderation of agent-produced content
//!
//! Agent output is untrusted. Before it may influence routing or ledger
//! state it is evaluated here and receives exactly one verdict.
//!
//! # Decision policy
//!
//! First match wins:
//!
//! 1. **Safety gate** - content contains an injection marker → `REJECTED`,
//!    score 0.0. Never downgraded to remediation.
//! 2. **Tone fast path** - enthusiastic persona, no risk flags, at least one
//!    enthusiasm marker → `APPROVED`.
//! 3. **Tone remediation** - enthusiastic persona, no enthusiasm marker →
//!    `REMEDIATION` with feedback naming the tone.
//! 4. **Default** → `REVIEW`.
//!
//! The judge holds only its marker sets and scores. Evaluation is a pure function of
//! the post, so any verdict can be reproduced and audited later.

pub mod verdict;

pub use verdict::{ModerationVerdict, RemediationDelta, Score, VerdictStatus};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default score for an auto-approved post
pub const APPROVAL_SCORE: f64 = 0.95;
/// Default score for a post sent back for tone remediation
pub const REMEDIATION_SCORE: f64 = 0.5;
/// Default score for a post escalated to review
pub const REVIEW_SCORE: f64 = 0.5;
/// An approval must score strictly above this
pub const APPROVAL_FLOOR: f64 = 0.9;

/// Marker sets and scores driving the decision policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeConfig {
    /// Substrings that indicate an instruction override attempt
    #[serde(default = "default_injection_markers")]
    pub injection_markers: Vec<String>,
    /// Substrings that show an enthusiastic tone
    #[serde(default = "default_enthusiasm_markers")]
    pub enthusiasm_markers: Vec<String>,
    /// Persona that must exhibit enthusiasm
    #[serde(default = "default_enthusiastic_persona")]
    pub enthusiastic_persona: String,
    /// Must stay above `APPROVAL_FLOOR`
    #[serde(default = "default_approval_score")]
    pub approval_score: f64,
    #[serde(default = "default_remediation_score")]
    pub remediation_score: f64,
    #[serde(default = "default_review_score")]
    pub review_score: f64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            injection_markers: default_injection_markers(),
            enthusiasm_markers: default_enthusiasm_markers(),
            enthusiastic_persona: default_enthusiastic_persona(),
            approval_score: default_approval_score(),
            remediation_score: default_remediation_score(),
            review_score: default_review_score(),
        }
    }
}

fn default_approval_score() -> f64 {
    APPROVAL_SCORE
}

fn default_remediation_score() -> f64 {
    REMEDIATION_SCORE
}

fn default_review_score() -> f64 {
    REVIEW_SCORE
}

fn default_injection_markers() -> Vec<String> {
    vec![
        "[system".to_string(),
        "prompt injection".to_string(),
        "ignore all previous instructions".to_string(),
        "<|im_start|>system".to_string(),
    ]
}

fn default_enthusiasm_markers() -> Vec<String> {
    vec![
        "excited".to_string(),
        "🚀".to_string(),
        "thrilled".to_string(),
        "so happy".to_string(),
    ]
}

fn default_enthusiastic_persona() -> String {
    "enthusiastic".to_string()
}

/// A piece of agent-produced content awaiting judgment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub persona: String,
    #[serde(default)]
    pub risk_flags: Vec<String>,
}

impl Post {
    pub fn new(content: impl Into<String>, persona: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            persona: persona.into(),
            risk_flags: Vec::new(),
        }
    }

    pub fn with_risk_flag(mut self, flag: impl Into<String>) -> Self {
        self.risk_flags.push(flag.into());
        self
    }
}

/// The moderation judge
#[derive(Debug, Clone)]
pub struct Judge {
    injection_markers: Vec<String>,
    enthusiasm_markers: Vec<String>,
    enthusiastic_persona: String,
    approval_score: Score,
    remediation_score: Score,
    review_score: Score,
}

impl Judge {
    /// Create a judge with the default marker sets
    pub fn new() -> Self {
        Self::with_config(JudgeConfig::default())
    }

    /// Create a judge with custom marker sets and scores.
    ///
    /// Markers are lowercased once here; blank markers are dropped since they
    /// would match every post. Scores are clamped into `[0.0, 1.0]`, and an
    /// approval score at or below `APPROVAL_FLOOR` falls back to the default.
    pub fn with_config(config: JudgeConfig) -> Self {
        let mut approval_score = Score::new(config.approval_score);
        if approval_score.value() <= APPROVAL_FLOOR {
            warn!(
                configured = config.approval_score,
                fallback = APPROVAL_SCORE,
                "approval score too low, using default"
            );
            approval_score = Score::new(APPROVAL_SCORE);
        }

        Self {
            injection_markers: normalize(config.injection_markers),
            enthusiasm_markers: normalize(config.enthusiasm_markers),
            enthusiastic_persona: config.enthusiastic_persona,
            approval_score,
            remediation_score: Score::new(config.remediation_score),
            review_score: Score::new(config.review_score),
        }
    }

    /// Evaluate a post
    pub fn evaluate_post(&self, post: &Post) -> ModerationVerdict {
        let verdict = self.decide(post);
        debug!(
            status = %verdict.status(),
            score = verdict.score().value(),
            persona = %post.persona,
            risk_flags = post.risk_flags.len(),
            "post evaluated"
        );
        verdict
    }

    fn decide(&self, post: &Post) -> ModerationVerdict {
        let content = post.content.to_lowercase();

        if let Some(marker) = self.detect_injection(&content) {
            return ModerationVerdict::rejected(format!("prompt injection detected: '{marker}'"));
        }

        let persona_needs_enthusiasm = post.persona == self.enthusiastic_persona;
        let is_enthusiastic = self
            .enthusiasm_markers
            .iter()
            .any(|m| content.contains(m.as_str()));

        if persona_needs_enthusiasm && post.risk_flags.is_empty() && is_enthusiastic {
            return ModerationVerdict::Approved {
                score: self.approval_score,
            };
        }

        if persona_needs_enthusiasm && !is_enthusiastic {
            return ModerationVerdict::Remediation {
                score: self.remediation_score,
                remediation_delta: RemediationDelta {
                    feedback: format!("tone should be {}", self.enthusiastic_persona),
                    suggested_markers: self.enthusiasm_markers.clone(),
                },
            };
        }

        ModerationVerdict::Review {
            score: self.review_score,
        }
    }

    fn detect_injection(&self, normalized: &str) -> Option<&str> {
        self.injection_markers
            .iter()
            .find(|m| normalized.contains(m.as_str()))
            .map(String::as_str)
    }
}

impl Default for Judge {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(markers: Vec<String>) -> Vec<String> {
    markers
        .into_iter()
        .map(|m| m.to_lowercase())
        .filter(|m| !m.trim().is_empty())
        .collect()
}
