//! Per-submission record of what each gate decided
//!
//! A trace holds the typed results of the flow rather than log text, so two
//! runs of the same submission can be compared value for value. Timestamps
//! are carried for audit and ignored by comparison.

use chimera_judge::{ModerationVerdict, VerdictStatus};
use chimera_ledger::BalanceUpdate;
use chimera_types::{AccountId, QueueId, RouteDecision, SkillId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Gate a step belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStage {
    Route,
    Moderation,
    Ledger,
    Decision,
}

/// Result of one gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum FlowStep {
    Routed {
        skill: SkillId,
        route: RouteDecision,
        timeout_ms: u64,
    },
    Moderated {
        verdict: ModerationVerdict,
    },
    Committed {
        account: AccountId,
        amount: i64,
        update: BalanceUpdate,
    },
    Held {
        status: VerdictStatus,
    },
    Dispatched {
        queue: QueueId,
    },
}

impl FlowStep {
    pub fn stage(&self) -> FlowStage {
        match self {
            Self::Routed { .. } => FlowStage::Route,
            Self::Moderated { .. } => FlowStage::Moderation,
            Self::Committed { .. } => FlowStage::Ledger,
            Self::Held { .. } | Self::Dispatched { .. } => FlowStage::Decision,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub step: FlowStep,
}

/// Steps taken by one submission, keyed by its idempotency key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationTrace {
    pub correlation_id: String,
    pub started_at: DateTime<Utc>,
    pub events: Vec<TraceEvent>,
}

impl OrchestrationTrace {
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            started_at: Utc::now(),
            events: Vec::new(),
        }
    }

    pub fn record(&mut self, step: FlowStep) {
        self.events.push(TraceEvent {
            at: Utc::now(),
            step,
        });
    }

    pub fn steps(&self) -> impl Iterator<Item = &FlowStep> {
        self.events.iter().map(|e| &e.step)
    }

    pub fn stages(&self) -> Vec<FlowStage> {
        self.steps().map(FlowStep::stage).collect()
    }

    pub fn route(&self) -> Option<&RouteDecision> {
        self.steps().find_map(|step| match step {
            FlowStep::Routed { route, .. } => Some(route),
            _ => None,
        })
    }

    pub fn verdict(&self) -> Option<&ModerationVerdict> {
        self.steps().find_map(|step| match step {
            FlowStep::Moderated { verdict } => Some(verdict),
            _ => None,
        })
    }

    pub fn committed(&self) -> Option<&BalanceUpdate> {
        self.steps().find_map(|step| match step {
            FlowStep::Committed { update, .. } => Some(update),
            _ => None,
        })
    }

    /// Index of the first step where the two runs disagree, or `None` if
    /// they took identical steps
    pub fn divergence_from(&self, other: &OrchestrationTrace) -> Option<usize> {
        let mut ours = self.steps();
        let mut theirs = other.steps();
        let mut index = 0;
        loop {
            match (ours.next(), theirs.next()) {
                (None, None) => return None,
                (Some(a), Some(b)) if a == b => index += 1,
                _ => return Some(index),
            }
        }
    }

    /// Same submission, same steps with the same values
    pub fn is_replayable_with(&self, other: &OrchestrationTrace) -> bool {
        self.correlation_id == other.correlation_id && self.divergence_from(other).is_none()
    }
}
