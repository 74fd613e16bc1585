//! Chimera Registry - Capability directory
//!
//! Maps skill identifiers to the queue that serves them. Routing is decided
//! by declared capability, never by guessing from task content.
//!
//! # Contract
//!
//! - `is_known` is a pure membership test.
//! - `get_queue` fails with `UnknownSkill` exactly when `is_known` is false
//!   for the same snapshot.
//!
//! Two backings share that contract: [`StaticRegistry`], an immutable map,
//! and [`SnapshotRegistry`], which publishes whole directories atomically so
//! readers never see a half-applied update.

pub mod directory;
pub mod snapshot;

pub use directory::StaticRegistry;
pub use snapshot::SnapshotRegistry;

use chimera_types::{QueueId, Result, SkillId};
use serde::{Deserialize, Serialize};

/// A directory of capabilities the gateway can route to
pub trait CapabilityRegistry: Send + Sync {
    /// Membership test. No side effects.
    fn is_known(&self, skill: &str) -> bool;

    /// Queue serving `skill`, or `UnknownSkill`.
    fn get_queue(&self, skill: &str) -> Result<QueueId>;

    /// All registered skills, sorted
    fn skills(&self) -> Vec<SkillId>;
}

/// One registry entry as it appears in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillEntry {
    pub skill: SkillId,
    /// Defaults to a queue named after the skill
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<QueueId>,
}

impl SkillEntry {
    pub fn identity(skill: impl Into<SkillId>) -> Self {
        Self {
            skill: skill.into(),
            queue: None,
        }
    }

    pub fn routed(skill: impl Into<SkillId>, queue: impl Into<QueueId>) -> Self {
        Self {
            skill: skill.into(),
            queue: Some(queue.into()),
        }
    }

    /// Queue this entry resolves to
    pub fn resolved_queue(&self) -> QueueId {
        self.queue
            .clone()
            .unwrap_or_else(|| QueueId::new(self.skill.as_str()))
    }
}

/// Registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_skills")]
    pub skills: Vec<SkillEntry>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            skills: default_skills(),
        }
    }
}

/// Skills every deployment starts with
pub const REFERENCE_SKILLS: [&str; 3] = ["wallet_manager", "trend_hunter", "image_generator"];

fn default_skills() -> Vec<SkillEntry> {
    REFERENCE_SKILLS.iter().copied().map(SkillEntry::identity).collect()
}
