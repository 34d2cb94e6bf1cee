//! The changelog store keeps the durable record of which migration steps
//! have been applied.
//!
//! Every backend implements [`ChangelogStore`]. A backend is opened through a
//! [`StoreConnector`], which turns the `store_location` and `changelog_name`
//! options into a live store. The highest id present in the changelog is the
//! current version; an empty changelog is at version 0.

use std::sync::Arc;

use async_trait::async_trait;
use data_model::StepId;

pub mod in_memory;
pub mod rocksdb_changelog;
pub mod serializer;

pub use in_memory::{InMemoryChangelog, InMemoryConnector};
pub use rocksdb_changelog::{RocksDBChangelog, RocksDBConnector};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("Failed to open the changelog store at {}. error: {}", location, source)]
    OpenFailed {
        location: String,
        source: anyhow::Error,
    },

    #[error("Changelog {} is not present in the store", name)]
    MissingChangelog { name: String },

    #[error("Changelog key is not a valid step id: {:?}", key)]
    InvalidKey { key: Vec<u8> },

    #[error("Failed to decode a changelog record. error: {}", source)]
    JsonDecoderFailed { source: anyhow::Error },

    #[error("Failed to encode a changelog record. error: {}", source)]
    JsonEncoderFailed { source: anyhow::Error },

    #[error(transparent)]
    RocksDBFailure {
        #[from]
        source: rocksdb::Error,
    },

    #[error("Changelog store is unavailable: {}", reason)]
    Unavailable { reason: String },
}

/// Read and write operations the migration engine needs from the changelog.
///
/// Access is strictly sequential: one read of the current version at the
/// start of a run, then one write or removal per completed step.
#[async_trait]
pub trait ChangelogStore: Send + Sync {
    /// Highest applied step id, or 0 when the changelog is empty.
    async fn current_version(&self) -> Result<StepId, StoreError>;

    /// Durably record that the apply operation of `id` completed.
    async fn record_applied(&self, id: StepId) -> Result<(), StoreError>;

    /// Durably remove the record of `id` after its revert completed.
    async fn remove_applied(&self, id: StepId) -> Result<(), StoreError>;
}

/// Opens a changelog store from a connection descriptor.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(
        &self,
        location: &str,
        changelog_name: &str,
    ) -> Result<Arc<dyn ChangelogStore>, StoreError>;
}

/// Encodes a step id as a changelog key. Big endian keeps the byte order of
/// keys identical to the numeric order of ids.
pub(crate) fn id_to_key(id: StepId) -> [u8; 8] {
    id.to_be_bytes()
}

pub(crate) fn key_to_id(key: &[u8]) -> Result<StepId, StoreError> {
    let bytes: [u8; 8] = key.try_into().map_err(|_| StoreError::InvalidKey {
        key: key.to_vec(),
    })?;
    Ok(StepId::from_be_bytes(bytes))
}
