//! Chimera Orchestrator - One submission, end to end
//!
//! A submission passes three gates in a fixed order:
//!
//! 1. **Route** - the gateway validates the manifest and resolves its queue.
//!    Any error stops the flow and is returned unchanged.
//! 2. **Moderate** - if the submission carries a post, the judge evaluates
//!    it. Anything short of `APPROVED` holds the submission; the verdict is
//!    returned to the caller and nothing is written.
//! 3. **Commit** - if the submission carries a ledger intent, it is applied
//!    with its expected version. The idempotency key is recorded as the
//!    correlation id. Conflicts come back as `ConsistencyError`.
//!
//! Held verdicts are never retried here. Whether a `REMEDIATION` is revised
//! and resubmitted, or a `REVIEW` escalated, is the caller's decision.

pub mod retry;
pub mod trace;

pub use retry::update_with_retry;
pub use trace::{FlowStage, FlowStep, OrchestrationTrace, TraceEvent};

use std::sync::Arc;

use chimera_gateway::{Gateway, GatewayConfig};
use chimera_judge::{Judge, JudgeConfig, ModerationVerdict, Post};
use chimera_ledger::{BalanceUpdate, LedgerMutation, LedgerStore};
use chimera_registry::{RegistryConfig, SnapshotRegistry};
use chimera_types::{AccountId, DispatchEnvelope, Result, TaskManifest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

/// A balance change requested alongside a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerIntent {
    pub account: AccountId,
    pub amount: i64,
    pub expected_version: u64,
}

impl LedgerIntent {
    pub fn new(account: impl Into<AccountId>, amount: i64, expected_version: u64) -> Self {
        Self {
            account: account.into(),
            amount,
            expected_version,
        }
    }
}

/// Everything a caller hands in for one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSubmission {
    pub manifest: TaskManifest,
    #[serde(default)]
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Post>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger: Option<LedgerIntent>,
}

impl TaskSubmission {
    pub fn new(manifest: TaskManifest, input: Value) -> Self {
        Self {
            manifest,
            input,
            post: None,
            ledger: None,
        }
    }

    pub fn with_post(mut self, post: Post) -> Self {
        self.post = Some(post);
        self
    }

    pub fn with_ledger_intent(mut self, intent: LedgerIntent) -> Self {
        self.ledger = Some(intent);
        self
    }
}

/// How a routed submission ended
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// Moderation did not approve the post; nothing was written
    Held {
        envelope: DispatchEnvelope,
        verdict: ModerationVerdict,
        trace: OrchestrationTrace,
    },
    /// Ready for its queue, with any ledger change applied
    Dispatched {
        envelope: DispatchEnvelope,
        verdict: Option<ModerationVerdict>,
        ledger: Option<BalanceUpdate>,
        trace: OrchestrationTrace,
    },
}

impl SubmissionOutcome {
    pub fn envelope(&self) -> &DispatchEnvelope {
        match self {
            Self::Held { envelope, .. } | Self::Dispatched { envelope, .. } => envelope,
        }
    }

    pub fn verdict(&self) -> Option<&ModerationVerdict> {
        match self {
            Self::Held { verdict, .. } => Some(verdict),
            Self::Dispatched { verdict, .. } => verdict.as_ref(),
        }
    }

    pub fn trace(&self) -> &OrchestrationTrace {
        match self {
            Self::Held { trace, .. } | Self::Dispatched { trace, .. } => trace,
        }
    }

    pub fn is_dispatched(&self) -> bool {
        matches!(self, Self::Dispatched { .. })
    }
}

/// Configuration for the whole submission flow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub judge: JudgeConfig,
}

/// Routes, moderates and commits submissions
pub struct Orchestrator {
    gateway: Gateway,
    judge: Judge,
    ledger: Arc<dyn LedgerStore>,
}

impl Orchestrator {
    pub fn new(gateway: Gateway, judge: Judge, ledger: Arc<dyn LedgerStore>) -> Self {
        Self {
            gateway,
            judge,
            ledger,
        }
    }

    /// Build the flow from configuration. Fails if the configured skill
    /// directory is invalid.
    pub fn from_config(config: &OrchestratorConfig, ledger: Arc<dyn LedgerStore>) -> Result<Self> {
        let registry = SnapshotRegistry::from_config(&config.registry)?;
        let gateway = Gateway::with_config(Arc::new(registry), config.gateway.clone());
        let judge = Judge::with_config(config.judge.clone());
        Ok(Self::new(gateway, judge, ledger))
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn judge(&self) -> &Judge {
        &self.judge
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerStore> {
        &self.ledger
    }

    /// Run one submission through route, moderation and commit
    pub fn submit(&self, submission: TaskSubmission) -> Result<SubmissionOutcome> {
        let TaskSubmission {
            manifest,
            input,
            post,
            ledger: intent,
        } = submission;

        let envelope = self.gateway.dispatch(&manifest, input).map_err(|err| {
            warn!(code = err.error_code(), error = %err, "submission refused at routing");
            err
        })?;

        let mut trace = OrchestrationTrace::new(&envelope.idempotency_key);
        trace.record(FlowStep::Routed {
            skill: envelope.skill.clone(),
            route: envelope.route.clone(),
            timeout_ms: envelope.timeout_ms,
        });

        let verdict = match post {
            Some(post) => {
                let verdict = self.judge.evaluate_post(&post);
                trace.record(FlowStep::Moderated {
                    verdict: verdict.clone(),
                });
                if !verdict.may_proceed() {
                    trace.record(FlowStep::Held {
                        status: verdict.status(),
                    });
                    info!(
                        idempotency_key = %envelope.idempotency_key,
                        status = %verdict.status(),
                        "submission held by moderation"
                    );
                    return Ok(SubmissionOutcome::Held {
                        envelope,
                        verdict,
                        trace,
                    });
                }
                Some(verdict)
            }
            None => None,
        };

        let ledger = match intent {
            Some(intent) => {
                let mutation = LedgerMutation::new(intent.amount, intent.expected_version)
                    .with_correlation_id(envelope.idempotency_key.clone());
                let update = self.ledger.apply(intent.account.as_str(), mutation)?;
                trace.record(FlowStep::Committed {
                    account: intent.account,
                    amount: intent.amount,
                    update,
                });
                Some(update)
            }
            None => None,
        };

        trace.record(FlowStep::Dispatched {
            queue: envelope.route.queue.clone(),
        });
        info!(
            idempotency_key = %envelope.idempotency_key,
            queue = %envelope.route.queue,
            "submission dispatched"
        );

        Ok(SubmissionOutcome::Dispatched {
            envelope,
            verdict,
            ledger,
            trace,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chimera_ledger::InMemoryLedger;
    use chimera_types::ErrorKind;
    use serde_json::json;

    fn orchestrator() -> (Orchestrator, Arc<InMemoryLedger>) {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.provision("user_1".into(), 100, 1).unwrap();
        let orchestrator =
            Orchestrator::from_config(&OrchestratorConfig::default(), ledger.clone()).unwrap();
        (orchestrator, ledger)
    }

    #[test]
    fn test_route_only_submission() {
        let (orchestrator, _) = orchestrator();
        let manifest = TaskManifest::new("trend_hunter", "trend-1", 1000);
        let outcome = orchestrator
            .submit(TaskSubmission::new(manifest, json!({"query": "BTC"})))
            .unwrap();

        assert!(outcome.is_dispatched());
        assert!(outcome.verdict().is_none());
        assert_eq!(outcome.envelope().route.queue.as_str(), "trend_hunter");
        assert_eq!(
            outcome.trace().stages(),
            vec![FlowStage::Route, FlowStage::Decision]
        );
    }

    #[test]
    fn test_routing_errors_propagate_unchanged() {
        let (orchestrator, ledger) = orchestrator();
        let manifest = TaskManifest::new("ghost_skill", "k", 1000);
        let submission = TaskSubmission::new(manifest, Value::Null)
            .with_ledger_intent(LedgerIntent::new("user_1", -10, 1));

        let err = orchestrator.submit(submission).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DispatchError);
        assert_eq!(ledger.snapshot("user_1").unwrap().version, 1);
    }

    #[test]
    fn test_config_defaults() {
        let config: OrchestratorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, OrchestratorConfig::default());
        assert_eq!(config.registry.skills.len(), 3);
    }
}
