//! Moderation verdicts
//!
//! A closed set of four outcomes. Callers match on it exhaustively, so a new
//! outcome can never be silently ignored.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence attached to a verdict, always within `[0.0, 1.0]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Score(f64);

impl Score {
    pub const ZERO: Score = Score(0.0);

    /// Clamp `value` into range. NaN becomes zero.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for Score {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Score> for f64 {
    fn from(score: Score) -> Self {
        score.0
    }
}

/// Structured feedback for a revise-and-resubmit loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationDelta {
    pub feedback: String,
    /// Tokens whose presence would satisfy the persona
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggested_markers: Vec<String>,
}

/// Status tag of a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictStatus {
    Rejected,
    Approved,
    Remediation,
    Review,
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Rejected => "REJECTED",
            Self::Approved => "APPROVED",
            Self::Remediation => "REMEDIATION",
            Self::Review => "REVIEW",
        };
        f.write_str(s)
    }
}

/// Outcome of evaluating one post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "status",
    rename_all = "SCREAMING_SNAKE_CASE",
    from = "VerdictRecord"
)]
pub enum ModerationVerdict {
    /// Terminal. Content must not proceed.
    Rejected { reason: String, score: Score },
    /// Terminal. Content proceeds unmodified.
    Approved { score: Score },
    /// Caller should revise and resubmit.
    Remediation {
        score: Score,
        remediation_delta: RemediationDelta,
    },
    /// Needs a human or higher-privilege reviewer.
    Review { score: Score },
}

/// Wire form of a verdict. A rejection's score is not read back.
#[derive(Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
enum VerdictRecord {
    Rejected {
        reason: String,
    },
    Approved {
        score: Score,
    },
    Remediation {
        score: Score,
        remediation_delta: RemediationDelta,
    },
    Review {
        score: Score,
    },
}

impl From<VerdictRecord> for ModerationVerdict {
    fn from(record: VerdictRecord) -> Self {
        match record {
            VerdictRecord::Rejected { reason } => Self::rejected(reason),
            VerdictRecord::Approved { score } => Self::Approved { score },
            VerdictRecord::Remediation {
                score,
                remediation_delta,
            } => Self::Remediation {
                score,
                remediation_delta,
            },
            VerdictRecord::Review { score } => Self::Review { score },
        }
    }
}

impl ModerationVerdict {
    /// A rejection always carries a zero score
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
            score: Score::ZERO,
        }
    }

    pub fn status(&self) -> VerdictStatus {
        match self {
            Self::Rejected { .. } => VerdictStatus::Rejected,
            Self::Approved { .. } => VerdictStatus::Approved,
            Self::Remediation { .. } => VerdictStatus::Remediation,
            Self::Review { .. } => VerdictStatus::Review,
        }
    }

    pub fn score(&self) -> Score {
        match self {
            Self::Rejected { score, .. }
            | Self::Approved { score }
            | Self::Remediation { score, .. }
            | Self::Review { score } => *score,
        }
    }

    /// Rejected and Approved end the moderation loop
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::Approved { .. })
    }

    /// Only an approval lets content affect routing or ledger state
    pub fn may_proceed(&self) -> bool {
        matches!(self, Self::Approved { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Rejected { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn remediation(&self) -> Option<&RemediationDelta> {
        match self {
            Self::Remediation {
                remediation_delta, ..
            } => Some(remediation_delta),
            _ => None,
        }
    }
}
