//! Chimera Gateway - Contract-first routing
//!
//! Every task manifest passes through the gateway before it can be
//! dispatched. Validation is ordered and short-circuits on the first failure
//! so that error reporting is predictable:
//!
//! 1. `idempotency_key` present and non-empty → else `SchemaViolation`
//! 2. `timeout_ms` present, integral, at least the configured minimum →
//!    else `SchemaViolation`
//! 3. `skill_required` present and registered → else `DispatchError`
//!
//! The gateway holds no mutable state. It can be shared across threads and
//! called concurrently without synchronization.

use std::sync::Arc;

use chimera_registry::{CapabilityRegistry, StaticRegistry};
use chimera_types::{
    ChimeraError, DispatchEnvelope, DispatchReason, Result, RouteDecision, SkillId, TaskManifest,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Minimum accepted `timeout_ms` unless configured otherwise
pub const DEFAULT_MIN_TIMEOUT_MS: u64 = 100;

/// Configuration for the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Smallest deadline a manifest may request, in milliseconds
    #[serde(default = "default_min_timeout_ms")]
    pub min_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            min_timeout_ms: default_min_timeout_ms(),
        }
    }
}

fn default_min_timeout_ms() -> u64 {
    DEFAULT_MIN_TIMEOUT_MS
}

/// Fields of a manifest that survived validation
struct Validated<'a> {
    skill: SkillId,
    idempotency_key: &'a str,
    timeout_ms: u64,
    route: RouteDecision,
}

/// The routing gateway
#[derive(Clone)]
pub struct Gateway {
    registry: Arc<dyn CapabilityRegistry>,
    config: GatewayConfig,
}

impl Gateway {
    /// Create a gateway with the default minimum timeout
    pub fn new(registry: Arc<dyn CapabilityRegistry>) -> Self {
        Self::with_config(registry, GatewayConfig::default())
    }

    /// Create a gateway with custom configuration
    pub fn with_config(registry: Arc<dyn CapabilityRegistry>, config: GatewayConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<dyn CapabilityRegistry> {
        &self.registry
    }

    pub fn min_timeout_ms(&self) -> u64 {
        self.config.min_timeout_ms
    }

    /// Validate `manifest` and resolve the queue it routes to.
    ///
    /// `input` is not inspected; it is reserved for per-skill schema checks.
    pub fn resolve_route(&self, manifest: &TaskManifest, _input: &Value) -> Result<RouteDecision> {
        self.validate(manifest).map(|validated| validated.route)
    }

    /// Validate `manifest` and wrap it, with its untouched input, for dispatch
    pub fn dispatch(&self, manifest: &TaskManifest, input: Value) -> Result<DispatchEnvelope> {
        let validated = self.validate(manifest)?;
        Ok(DispatchEnvelope {
            route: validated.route,
            skill: validated.skill,
            idempotency_key: validated.idempotency_key.to_string(),
            timeout_ms: validated.timeout_ms,
            metadata: manifest.metadata.clone(),
            input,
        })
    }

    fn validate<'a>(&self, manifest: &'a TaskManifest) -> Result<Validated<'a>> {
        let idempotency_key = match manifest.idempotency_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => {
                return Err(reject(ChimeraError::schema_violation(
                    "idempotency_key",
                    "idempotency_key is required",
                )))
            }
        };

        let min = self.config.min_timeout_ms;
        let timeout_ms = match manifest.timeout_ms {
            None => {
                return Err(reject(ChimeraError::schema_violation(
                    "timeout_ms",
                    "timeout_ms is required and must be an integer",
                )))
            }
            Some(t) => match u64::try_from(t) {
                Ok(t) if t >= min => t,
                _ => {
                    return Err(reject(ChimeraError::schema_violation(
                        "timeout_ms",
                        format!("timeout_ms {t} is below the minimum of {min}ms"),
                    )))
                }
            },
        };

        let skill = match manifest.skill_required.as_deref() {
            Some(skill) if !skill.is_empty() => skill,
            _ => {
                return Err(reject(ChimeraError::dispatch(
                    "",
                    DispatchReason::MissingSkill,
                )))
            }
        };

        // One lookup, so membership and resolution come from the same view.
        let queue = self
            .registry
            .get_queue(skill)
            .map_err(|e| reject(e.into_dispatch_error()))?;

        debug!(skill, queue = %queue, idempotency_key, "manifest routed");

        Ok(Validated {
            skill: SkillId::new(skill),
            idempotency_key,
            timeout_ms,
            route: RouteDecision::new(queue),
        })
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new(Arc::new(StaticRegistry::reference()))
    }
}

fn reject(err: ChimeraError) -> ChimeraError {
    debug!(code = err.error_code(), error = %err, "manifest rejected");
    err
}
