use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use data_model::{ChangelogEntry, StepId, INITIAL_VERSION};
use rocksdb::{
    ColumnFamily,
    IteratorMode,
    Options,
    TransactionDB,
    TransactionDBOptions,
    TransactionOptions,
    WriteOptions,
    DB,
    DEFAULT_COLUMN_FAMILY_NAME,
};
use tracing::{debug, info};

use crate::{
    id_to_key,
    key_to_id,
    serializer::{JsonEncode, JsonEncoder},
    ChangelogStore,
    StoreConnector,
    StoreError,
};

/// Changelog persisted in a RocksDB database. The changelog lives in its own
/// column family, one record per applied step.
pub struct RocksDBChangelog {
    db: TransactionDB,
    changelog: String,
}

impl RocksDBChangelog {
    /// Open the database at `path`, creating it and the changelog column
    /// family when missing. Existing column families are preserved.
    pub fn open(path: &Path, changelog: &str) -> Result<Self, StoreError> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let mut cfs = match DB::list_cf(&db_opts, path) {
            Ok(cfs) => cfs,
            // New database
            Err(_) => vec![DEFAULT_COLUMN_FAMILY_NAME.to_string()],
        };
        if !cfs.iter().any(|cf| cf == changelog) {
            info!(
                "creating changelog {} in {}",
                changelog,
                path.to_string_lossy()
            );
            cfs.push(changelog.to_string());
        }

        let db = TransactionDB::open_cf(&db_opts, &TransactionDBOptions::default(), path, &cfs)
            .map_err(|e| StoreError::OpenFailed {
                location: path.to_string_lossy().to_string(),
                source: e.into(),
            })?;

        Ok(Self {
            db,
            changelog: changelog.to_string(),
        })
    }

    fn column_family(&self) -> Result<&ColumnFamily, StoreError> {
        self.db
            .cf_handle(&self.changelog)
            .ok_or_else(|| StoreError::MissingChangelog {
                name: self.changelog.clone(),
            })
    }

    // Every changelog mutation is its own synced transaction.
    fn write_options() -> WriteOptions {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(true);
        write_opts
    }
}

#[async_trait]
impl ChangelogStore for RocksDBChangelog {
    async fn current_version(&self) -> Result<StepId, StoreError> {
        let cf = self.column_family()?;
        match self.db.iterator_cf(cf, IteratorMode::End).next() {
            Some(kv) => {
                let (key, value) = kv?;
                let id = key_to_id(&key)?;
                let entry: ChangelogEntry = JsonEncoder::decode(&value)
                    .map_err(|source| StoreError::JsonDecoderFailed { source })?;
                if entry.id != id {
                    return Err(StoreError::InvalidKey { key: key.to_vec() });
                }
                Ok(id)
            }
            None => Ok(INITIAL_VERSION),
        }
    }

    async fn record_applied(&self, id: StepId) -> Result<(), StoreError> {
        let cf = self.column_family()?;
        let entry = ChangelogEntry::new(id);
        let value = JsonEncoder::encode(&entry)
            .map_err(|source| StoreError::JsonEncoderFailed { source })?;

        let txn = self
            .db
            .transaction_opt(&Self::write_options(), &TransactionOptions::default());
        txn.put_cf(cf, id_to_key(id), value)?;
        txn.commit()?;

        debug!(id, changelog = %self.changelog, "recorded applied step");
        Ok(())
    }

    async fn remove_applied(&self, id: StepId) -> Result<(), StoreError> {
        let cf = self.column_family()?;

        let txn = self
            .db
            .transaction_opt(&Self::write_options(), &TransactionOptions::default());
        txn.delete_cf(cf, id_to_key(id))?;
        txn.commit()?;

        debug!(id, changelog = %self.changelog, "removed reverted step");
        Ok(())
    }
}

/// Connects to RocksDB changelogs. The store location is the database path.
#[derive(Default, Clone)]
pub struct RocksDBConnector;

#[async_trait]
impl StoreConnector for RocksDBConnector {
    async fn connect(
        &self,
        location: &str,
        changelog_name: &str,
    ) -> Result<Arc<dyn ChangelogStore>, StoreError> {
        let changelog = RocksDBChangelog::open(Path::new(location), changelog_name)?;
        Ok(Arc::new(changelog))
    }
}
