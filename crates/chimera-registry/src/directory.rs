//! Immutable in-memory capability directory

use std::collections::HashMap;

use chimera_types::{ChimeraError, QueueId, Result, SkillId};

use crate::{CapabilityRegistry, RegistryConfig, SkillEntry, REFERENCE_SKILLS};

/// A fixed skill → queue map
///
/// Once built it never changes, so every lookup is a pure function of the
/// skill name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticRegistry {
    entries: HashMap<SkillId, QueueId>,
}

impl StaticRegistry {
    /// Build from explicit `(skill, queue)` pairs.
    ///
    /// Rejects blank identifiers and duplicate skills.
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (SkillId, QueueId)>,
    {
        let mut map = HashMap::new();
        for (skill, queue) in entries {
            if skill.is_blank() {
                return Err(ChimeraError::schema_violation("skill", "must not be empty"));
            }
            if queue.is_blank() {
                return Err(ChimeraError::schema_violation(
                    "queue",
                    format!("queue for skill {skill} must not be empty"),
                ));
            }
            if map.contains_key(&skill) {
                return Err(ChimeraError::DuplicateSkill { skill: skill.0 });
            }
            map.insert(skill, queue);
        }
        Ok(Self { entries: map })
    }

    /// Build a registry where every skill is served by a queue of the same name
    pub fn with_identity<I, S>(skills: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<SkillId>,
    {
        Self::from_entries(skills.into_iter().map(|skill| {
            let skill = skill.into();
            let queue = QueueId::new(skill.as_str());
            (skill, queue)
        }))
    }

    /// Build from configuration
    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        Self::from_entries(
            config
                .skills
                .iter()
                .map(|entry: &SkillEntry| (entry.skill.clone(), entry.resolved_queue())),
        )
    }

    /// The reference directory: wallet_manager, trend_hunter, image_generator
    pub fn reference() -> Self {
        let entries = REFERENCE_SKILLS
            .iter()
            .map(|s| (SkillId::from(*s), QueueId::from(*s)))
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CapabilityRegistry for StaticRegistry {
    fn is_known(&self, skill: &str) -> bool {
        self.entries.contains_key(skill)
    }

    fn get_queue(&self, skill: &str) -> Result<QueueId> {
        self.entries
            .get(skill)
            .cloned()
            .ok_or_else(|| ChimeraError::unknown_skill(skill))
    }

    fn skills(&self) -> Vec<SkillId> {
        let mut skills: Vec<SkillId> = self.entries.keys().cloned().collect();
        skills.sort();
        skills
    }
}
