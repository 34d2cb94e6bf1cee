use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use data_model::{ChangelogEntry, StepId, INITIAL_VERSION};
use tokio::sync::RwLock;

use crate::{ChangelogStore, StoreConnector, StoreError};

/// Changelog kept in process memory. Used by tests and by callers embedding
/// the engine next to a store of their own.
#[derive(Default)]
pub struct InMemoryChangelog {
    entries: RwLock<BTreeMap<StepId, ChangelogEntry>>,
}

impl InMemoryChangelog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a changelog that already records the given ids as applied.
    pub fn with_applied(ids: impl IntoIterator<Item = StepId>) -> Self {
        let entries = ids
            .into_iter()
            .map(|id| (id, ChangelogEntry::new(id)))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Applied ids in ascending order.
    pub async fn applied_ids(&self) -> Vec<StepId> {
        self.entries.read().await.keys().copied().collect()
    }
}

#[async_trait]
impl ChangelogStore for InMemoryChangelog {
    async fn current_version(&self) -> Result<StepId, StoreError> {
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .next_back()
            .copied()
            .unwrap_or(INITIAL_VERSION))
    }

    async fn record_applied(&self, id: StepId) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(id, ChangelogEntry::new(id));
        Ok(())
    }

    async fn remove_applied(&self, id: StepId) -> Result<(), StoreError> {
        self.entries.write().await.remove(&id);
        Ok(())
    }
}

/// Hands out one [`InMemoryChangelog`] per `(location, changelog_name)` pair,
/// so repeated connections observe the same changelog.
#[derive(Default)]
pub struct InMemoryConnector {
    changelogs: Mutex<HashMap<(String, String), Arc<InMemoryChangelog>>>,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the changelog for the pair, creating an empty one if needed.
    pub fn changelog(&self, location: &str, changelog_name: &str) -> Arc<InMemoryChangelog> {
        let mut changelogs = self
            .changelogs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        changelogs
            .entry((location.to_string(), changelog_name.to_string()))
            .or_default()
            .clone()
    }

    /// Replace the changelog for the pair with one holding `ids`.
    pub fn seed(
        &self,
        location: &str,
        changelog_name: &str,
        ids: impl IntoIterator<Item = StepId>,
    ) -> Arc<InMemoryChangelog> {
        let changelog = Arc::new(InMemoryChangelog::with_applied(ids));
        let mut changelogs = self
            .changelogs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        changelogs.insert(
            (location.to_string(), changelog_name.to_string()),
            changelog.clone(),
        );
        changelog
    }
}

#[async_trait]
impl StoreConnector for InMemoryConnector {
    async fn connect(
        &self,
        location: &str,
        changelog_name: &str,
    ) -> Result<Arc<dyn ChangelogStore>, StoreError> {
        Ok(self.changelog(location, changelog_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_changelog_is_version_zero() -> Result<(), StoreError> {
        let changelog = InMemoryChangelog::new();
        assert_eq!(changelog.current_version().await?, 0);
        assert!(changelog.applied_ids().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_current_version_is_highest_id() -> Result<(), StoreError> {
        let changelog = InMemoryChangelog::with_applied([3, 1, 2]);
        assert_eq!(changelog.current_version().await?, 3);

        changelog.record_applied(10).await?;
        assert_eq!(changelog.current_version().await?, 10);

        changelog.remove_applied(10).await?;
        changelog.remove_applied(3).await?;
        assert_eq!(changelog.current_version().await?, 2);
        assert_eq!(changelog.applied_ids().await, vec![1, 2]);
        Ok(())
    }

    #[tokio::test]
    async fn test_connector_shares_changelogs() -> Result<(), StoreError> {
        let connector = InMemoryConnector::new();
        connector.seed("mem://a", "_migrations", [1, 2]);

        let store = connector.connect("mem://a", "_migrations").await?;
        assert_eq!(store.current_version().await?, 2);
        store.record_applied(3).await?;

        assert_eq!(
            connector.changelog("mem://a", "_migrations").applied_ids().await,
            vec![1, 2, 3]
        );

        // A different changelog name is an independent changelog.
        let other = connector.connect("mem://a", "custom").await?;
        assert_eq!(other.current_version().await?, 0);
        Ok(())
    }
}
