//! Dynamically updatable registry with lock-free reads
//!
//! The live directory is an `Arc<StaticRegistry>` behind an `ArcSwap`.
//! Updates replace the whole directory in one atomic store, so a reader
//! either sees the old directory or the new one, never a mix.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chimera_types::{QueueId, Result, SkillId};
use tracing::info;

use crate::{CapabilityRegistry, RegistryConfig, StaticRegistry};

/// Registry whose contents can be republished at runtime
pub struct SnapshotRegistry {
    current: ArcSwap<StaticRegistry>,
}

impl SnapshotRegistry {
    pub fn new(initial: StaticRegistry) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        Ok(Self::new(StaticRegistry::from_config(config)?))
    }

    /// Pin the current directory.
    ///
    /// The returned snapshot is immutable; use it when several lookups must
    /// agree with each other.
    pub fn snapshot(&self) -> Arc<StaticRegistry> {
        self.current.load_full()
    }

    /// Atomically replace the directory, returning the one it supersedes
    pub fn publish(&self, next: StaticRegistry) -> Arc<StaticRegistry> {
        let skill_count = next.len();
        let previous = self.current.swap(Arc::new(next));
        info!(
            skill_count,
            previous_skill_count = previous.len(),
            "capability registry snapshot published"
        );
        previous
    }
}

impl Default for SnapshotRegistry {
    fn default() -> Self {
        Self::new(StaticRegistry::reference())
    }
}

impl CapabilityRegistry for SnapshotRegistry {
    fn is_known(&self, skill: &str) -> bool {
        self.current.load().is_known(skill)
    }

    fn get_queue(&self, skill: &str) -> Result<QueueId> {
        self.current.load().get_queue(skill)
    }

    fn skills(&self) -> Vec<SkillId> {
        self.current.load().skills()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_replaces_directory() {
        let registry = SnapshotRegistry::default();
        assert!(registry.is_known("wallet_manager"));
        assert!(!registry.is_known("scraper"));

        let previous = registry.publish(StaticRegistry::with_identity(["scraper"]).unwrap());
        assert_eq!(previous.len(), 3);
        assert!(registry.is_known("scraper"));
        assert!(!registry.is_known("wallet_manager"));
    }

    #[test]
    fn test_pinned_snapshot_survives_publication() {
        let registry = SnapshotRegistry::default();
        let pinned = registry.snapshot();

        registry.publish(StaticRegistry::default());

        assert!(pinned.is_known("trend_hunter"));
        assert!(pinned.get_queue("trend_hunter").is_ok());
        assert!(!registry.is_known("trend_hunter"));
    }
}
