use std::sync::Arc;

use changelog_store::{ChangelogStore, RocksDBConnector, StoreConnector};
use tracing::{info, warn};

use crate::{
    migrations::{DirectoryStepSource, StepRegistry, StepSource},
    options::{self, MigrateOptions, ValidatedOptions},
    outcome::{Failure, RunResult},
    planner::{select_plan, ExecutionPlan},
    runner,
};

/// Entry point of a migration run.
///
/// A `Migrator` pairs a [`StoreConnector`], which opens the changelog named by
/// the options, with a [`StepSource`], which discovers the steps. Neither is
/// cached between runs.
pub struct Migrator {
    connector: Arc<dyn StoreConnector>,
    source: Arc<dyn StepSource>,
}

impl Default for Migrator {
    fn default() -> Self {
        Self::new(
            Arc::new(RocksDBConnector),
            Arc::new(DirectoryStepSource::default()),
        )
    }
}

struct PreparedRun {
    options: ValidatedOptions,
    store: Arc<dyn ChangelogStore>,
    plan: ExecutionPlan,
}

impl Migrator {
    pub fn new(connector: Arc<dyn StoreConnector>, source: Arc<dyn StepSource>) -> Self {
        Self { connector, source }
    }

    /// Move the changelog to `options.target_version`.
    ///
    /// Every failure is reported through the returned [`RunResult`], which
    /// resolves exactly once per call.
    pub async fn run(&self, options: Option<&MigrateOptions>) -> RunResult {
        let prepared = match self.prepare(options).await {
            Ok(prepared) => prepared,
            Err(failure) => {
                warn!("migration run rejected: {}", failure);
                return Err(failure);
            }
        };

        runner::execute(
            &prepared.plan,
            prepared.store.as_ref(),
            &prepared.options.store_location,
        )
        .await
    }

    /// Validate the options and select the plan a run would execute, without
    /// executing it.
    pub async fn plan(&self, options: Option<&MigrateOptions>) -> Result<ExecutionPlan, Failure> {
        self.prepare(options).await.map(|prepared| prepared.plan)
    }

    async fn prepare(&self, options: Option<&MigrateOptions>) -> Result<PreparedRun, Failure> {
        let options = options::validate(options)?;

        let loaded = self.source.load(&options.step_source)?;
        if loaded.steps.is_empty() {
            return Err(Failure::NoScripts {
                location: loaded.location,
            });
        }
        let registry = StepRegistry::new(loaded.steps)?;
        info!(
            "found {} migration steps at {}, latest is {}",
            registry.len(),
            loaded.location,
            registry.latest_version()
        );

        let store = self
            .connector
            .connect(&options.store_location, &options.changelog_name)
            .await
            .map_err(|source| Failure::StoreUnavailable {
                location: options.store_location.clone(),
                source,
            })?;
        let current = store
            .current_version()
            .await
            .map_err(|source| Failure::StoreUnavailable {
                location: options.store_location.clone(),
                source,
            })?;

        let plan = select_plan(current, options.target_version, &registry)?;
        info!(
            current_version = current,
            target_version = options.target_version,
            direction = %plan.direction,
            steps = ?plan.ids(),
            "selected migration plan"
        );

        Ok(PreparedRun {
            options,
            store,
            plan,
        })
    }
}
