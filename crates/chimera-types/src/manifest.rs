//! Task manifests and routing results
//!
//! A manifest is produced by an upstream planner and describes one unit of
//! work. The core validates it once and never mutates it.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{ChimeraError, Result};
use crate::identity::{QueueId, SkillId};

/// Structured description of a task submitted for routing
///
/// Required fields are optional at the type level so that a malformed
/// manifest can still be represented and reported through the gateway's
/// ordered validation instead of failing at decode time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_required: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    /// Deadline in milliseconds. Integers past `i64::MAX` saturate.
    #[serde(
        default,
        deserialize_with = "lenient_timeout",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout_ms: Option<i64>,
    /// Priority, trace id, policy version and anything else. Opaque to the core.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl TaskManifest {
    /// Create a manifest with all required fields present
    pub fn new(
        skill_required: impl Into<String>,
        idempotency_key: impl Into<String>,
        timeout_ms: i64,
    ) -> Self {
        Self {
            skill_required: Some(skill_required.into()),
            idempotency_key: Some(idempotency_key.into()),
            timeout_ms: Some(timeout_ms),
            metadata: Map::new(),
        }
    }

    /// Attach a pass-through metadata field
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Build a manifest from an already-deserialized record.
    ///
    /// Field types are never rejected here: a required field holding the
    /// wrong JSON type is treated as absent, leaving the verdict to the
    /// gateway. Only a record that is not an object fails.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut record) = value else {
            return Err(ChimeraError::schema_violation(
                "manifest",
                "expected a structured record",
            ));
        };

        let skill_required = take_string(&mut record, "skill_required");
        let idempotency_key = take_string(&mut record, "idempotency_key");
        let timeout_ms = match record.remove("timeout_ms") {
            Some(Value::Number(n)) => integral_timeout(&n),
            _ => None,
        };

        Ok(Self {
            skill_required,
            idempotency_key,
            timeout_ms,
            metadata: record,
        })
    }

    pub fn priority(&self) -> Option<&str> {
        self.metadata_str("priority")
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.metadata_str("trace_id")
    }

    pub fn policy_version(&self) -> Option<&str> {
        self.metadata_str("policy_version")
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

fn take_string(record: &mut Map<String, Value>, key: &str) -> Option<String> {
    match record.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

fn integral_timeout(n: &Number) -> Option<i64> {
    n.as_i64().or_else(|| n.as_u64().map(|_| i64::MAX))
}

fn lenient_timeout<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => integral_timeout(&n),
        _ => None,
    })
}

/// Output of the gateway: the queue a task resolves to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteDecision {
    pub queue: QueueId,
}

impl RouteDecision {
    pub fn new(queue: QueueId) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &QueueId {
        &self.queue
    }
}

/// A validated task ready to be pushed onto its queue
///
/// Carries the input payload exactly as it was submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchEnvelope {
    pub route: RouteDecision,
    pub skill: SkillId,
    pub idempotency_key: String,
    pub timeout_ms: u64,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    pub input: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn demo_record() -> Value {
        json!({
            "skill_required": "wallet_manager",
            "priority": "HIGH",
            "timeout_ms": 15000,
            "idempotency_key": "pay-20260205-abc123",
            "trace_id": "trace-xyz",
            "policy_version": "finance.v1"
        })
    }

    #[test]
    fn test_from_value_keeps_metadata() {
        let manifest = TaskManifest::from_value(demo_record()).unwrap();
        assert_eq!(manifest.skill_required.as_deref(), Some("wallet_manager"));
        assert_eq!(manifest.timeout_ms, Some(15000));
        assert_eq!(manifest.priority(), Some("HIGH"));
        assert_eq!(manifest.trace_id(), Some("trace-xyz"));
        assert_eq!(manifest.policy_version(), Some("finance.v1"));
        assert!(!manifest.metadata.contains_key("timeout_ms"));
    }

    #[test]
    fn test_wrongly_typed_fields_become_absent() {
        let manifest = TaskManifest::from_value(json!({
            "skill_required": 7,
            "idempotency_key": ["not", "a", "string"],
            "timeout_ms": 150.5,
        }))
        .unwrap();
        assert_eq!(manifest.skill_required, None);
        assert_eq!(manifest.idempotency_key, None);
        assert_eq!(manifest.timeout_ms, None);

        let stringly = TaskManifest::from_value(json!({ "timeout_ms": "200" })).unwrap();
        assert_eq!(stringly.timeout_ms, None);
    }

    #[test]
    fn test_oversized_timeout_saturates() {
        let manifest = TaskManifest::from_value(json!({ "timeout_ms": u64::MAX })).unwrap();
        assert_eq!(manifest.timeout_ms, Some(i64::MAX));

        let decoded: TaskManifest =
            serde_json::from_value(json!({ "timeout_ms": u64::MAX, "priority": "LOW" })).unwrap();
        assert_eq!(decoded.timeout_ms, Some(i64::MAX));
        assert_eq!(decoded.priority(), Some("LOW"));
    }

    #[test]
    fn test_non_object_record_is_schema_violation() {
        let err = TaskManifest::from_value(json!(["wallet_manager"])).unwrap_err();
        assert_eq!(err.error_code(), "SCHEMA_VIOLATION");
    }

    #[test]
    fn test_serde_flattens_metadata() {
        let manifest = TaskManifest::new("trend_hunter", "idem-1", 500)
            .with_metadata("trace_id", "trace-abc");
        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(value["trace_id"], "trace-abc");

        let back: TaskManifest = serde_json::from_value(value).unwrap();
        assert_eq!(back, manifest);
    }

    #[test]
    fn test_route_decision_wire_shape() {
        let route = RouteDecision::new(QueueId::from("wallet_manager"));
        assert_eq!(serde_json::to_value(&route).unwrap(), json!({"queue": "wallet_manager"}));
    }
}
