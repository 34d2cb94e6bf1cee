use changelog_store::ChangelogStore;
use data_model::Direction;
use tracing::{error, info};

use crate::{
    migrations::{MigrationStep, StepContext},
    outcome::{Failure, RunResult, Success},
    planner::ExecutionPlan,
};

/// Execute a plan one step at a time.
///
/// After each step completes, its changelog entry is written (apply) or
/// removed (revert) before the next step starts. The first failure stops the
/// run: the failing step keeps its changelog state and everything committed
/// before it stays committed.
#[tracing::instrument(
    skip_all,
    fields(
        direction = %plan.direction,
        from = plan.current_version,
        to = plan.target_version
    )
)]
pub async fn execute(
    plan: &ExecutionPlan,
    store: &dyn ChangelogStore,
    store_location: &str,
) -> RunResult {
    if plan.direction == Direction::Noop {
        info!(
            "Already at version {}. No migrations needed.",
            plan.current_version
        );
        return Ok(Success::no_migration_required(plan.current_version));
    }

    info!(
        "Starting migrations from v{} to v{}",
        plan.current_version, plan.target_version
    );

    let ctx = StepContext {
        store_location: store_location.to_string(),
        target_version: plan.target_version,
        direction: plan.direction,
    };

    let mut executed = Vec::with_capacity(plan.steps.len());
    for step in &plan.steps {
        run_step(step.as_ref(), &ctx, store).await?;
        executed.push(step.id());
    }

    // A revert target needs no step of its own, so the changelog may stop
    // below it.
    let version = store
        .current_version()
        .await
        .map_err(|source| Failure::StoreUnavailable {
            location: store_location.to_string(),
            source,
        })?;

    info!("Completed all migrations. Now at version {}", version);
    Ok(Success::migrated(
        plan.direction,
        plan.target_version,
        version,
        executed,
    ))
}

async fn run_step(
    step: &dyn MigrationStep,
    ctx: &StepContext,
    store: &dyn ChangelogStore,
) -> Result<(), Failure> {
    let id = step.id();
    match ctx.direction {
        Direction::Apply => {
            info!("Applying migration {} ({})", id, step.name());
            if let Err(source) = step.apply(ctx).await {
                error!("Migration {} failed to apply: {:#}", id, source);
                return Err(Failure::MigrationFailed { id, source });
            }
            store.record_applied(id).await.map_err(|source| {
                error!("Migration {} applied but was not recorded: {}", id, source);
                Failure::ChangelogWriteFailed {
                    id,
                    direction: Direction::Apply,
                    source,
                }
            })?;
        }
        Direction::Revert => {
            info!("Reverting migration {} ({})", id, step.name());
            if let Err(source) = step.revert(ctx).await {
                error!("Migration {} failed to revert: {:#}", id, source);
                return Err(Failure::RollbackFailed { id, source });
            }
            store.remove_applied(id).await.map_err(|source| {
                error!("Migration {} reverted but is still recorded: {}", id, source);
                Failure::ChangelogWriteFailed {
                    id,
                    direction: Direction::Revert,
                    source,
                }
            })?;
        }
        Direction::Noop => {}
    }
    Ok(())
}
