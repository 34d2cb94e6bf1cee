use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use changelog_store::{ChangelogStore, InMemoryChangelog, StoreError};
use data_model::{Direction, StepId};

use super::migration_trait::{MigrationStep, StepContext};

/// Shared record of which step operations were invoked, in invocation order.
#[derive(Clone, Default)]
pub struct ScriptLog {
    runs: Arc<Mutex<Vec<(StepId, Direction)>>>,
}

impl ScriptLog {
    pub fn record(&self, id: StepId, direction: Direction) {
        self.runs.lock().unwrap().push((id, direction));
    }

    pub fn was_run(&self, id: StepId, direction: Direction) -> bool {
        self.runs.lock().unwrap().contains(&(id, direction))
    }

    pub fn none_ran(&self) -> bool {
        self.runs.lock().unwrap().is_empty()
    }

    pub fn runs(&self) -> Vec<(StepId, Direction)> {
        self.runs.lock().unwrap().clone()
    }

    pub fn reset(&self) {
        self.runs.lock().unwrap().clear();
    }
}

/// Step that records every invocation and can be told to fail either
/// operation.
pub struct RecordingStep {
    id: StepId,
    name: String,
    log: ScriptLog,
    fail_apply: bool,
    fail_revert: bool,
}

impl RecordingStep {
    pub fn new(id: StepId, log: &ScriptLog) -> Self {
        Self {
            id,
            name: format!("script-{id}"),
            log: log.clone(),
            fail_apply: false,
            fail_revert: false,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn failing_apply(mut self) -> Self {
        self.fail_apply = true;
        self
    }

    pub fn failing_revert(mut self) -> Self {
        self.fail_revert = true;
        self
    }

    pub fn into_arc(self) -> Arc<dyn MigrationStep> {
        Arc::new(self)
    }
}

#[async_trait]
impl MigrationStep for RecordingStep {
    fn id(&self) -> StepId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, _ctx: &StepContext) -> Result<()> {
        self.log.record(self.id, Direction::Apply);
        if self.fail_apply {
            return Err(anyhow!("Intentional FAIL for testing reasons."));
        }
        Ok(())
    }

    async fn revert(&self, _ctx: &StepContext) -> Result<()> {
        self.log.record(self.id, Direction::Revert);
        if self.fail_revert {
            return Err(anyhow!("Intentional FAIL for testing reasons."));
        }
        Ok(())
    }
}

/// The step set most tests run against: steps 1 to 5 where the apply of 5
/// and the revert of 4 fail.
pub fn standard_steps(log: &ScriptLog) -> Vec<Arc<dyn MigrationStep>> {
    vec![
        RecordingStep::new(1, log).into_arc(),
        RecordingStep::new(2, log).into_arc(),
        RecordingStep::new(3, log).into_arc(),
        RecordingStep::new(4, log).failing_revert().into_arc(),
        RecordingStep::new(5, log).failing_apply().into_arc(),
    ]
}

/// Changelog whose write or removal for step `fail_on` fails.
pub struct FailingChangelog {
    pub inner: InMemoryChangelog,
    fail_on: StepId,
}

impl FailingChangelog {
    pub fn new(inner: InMemoryChangelog, fail_on: StepId) -> Self {
        Self { inner, fail_on }
    }

    fn check(&self, id: StepId) -> Result<(), StoreError> {
        if id == self.fail_on {
            return Err(StoreError::Unavailable {
                reason: format!("write for {id} rejected"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChangelogStore for FailingChangelog {
    async fn current_version(&self) -> Result<StepId, StoreError> {
        self.inner.current_version().await
    }

    async fn record_applied(&self, id: StepId) -> Result<(), StoreError> {
        self.check(id)?;
        self.inner.record_applied(id).await
    }

    async fn remove_applied(&self, id: StepId) -> Result<(), StoreError> {
        self.check(id)?;
        self.inner.remove_applied(id).await
    }
}
