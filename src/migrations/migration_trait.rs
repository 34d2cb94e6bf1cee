use anyhow::Result;
use async_trait::async_trait;
use data_model::{Direction, StepId};

/// Run-scoped information handed to every step operation.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub store_location: String,
    pub target_version: StepId,
    pub direction: Direction,
}

/// Trait defining a single migration step
#[async_trait]
pub trait MigrationStep: Send + Sync {
    /// Positive id of the step, unique within a registry
    fn id(&self) -> StepId;

    /// Name for logging purposes
    fn name(&self) -> &str;

    /// Move the system forward to this step's version
    async fn apply(&self, ctx: &StepContext) -> Result<()>;

    /// Undo the effect of `apply`
    async fn revert(&self, ctx: &StepContext) -> Result<()>;
}
