use std::sync::Arc;

use data_model::{StepId, INITIAL_VERSION};

use super::migration_trait::MigrationStep;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Duplicate migration id {id} found: {first} and {second}")]
    DuplicateId {
        id: StepId,
        first: String,
        second: String,
    },

    #[error("Migration {name} has id 0, ids must be positive")]
    ZeroId { name: String },
}

/// Registry of every known migration step for a run, sorted by id.
#[derive(Default)]
pub struct StepRegistry {
    steps: Vec<Arc<dyn MigrationStep>>,
}

impl StepRegistry {
    /// Build a registry from an unordered collection of steps
    pub fn new(
        steps: impl IntoIterator<Item = Arc<dyn MigrationStep>>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self { steps: Vec::new() };
        for step in steps {
            registry.register(step);
        }
        registry.sort_and_validate()?;
        Ok(registry)
    }

    fn register(&mut self, step: Arc<dyn MigrationStep>) {
        self.steps.push(step);
    }

    /// Sort steps by id and validate ids are positive and unique
    fn sort_and_validate(&mut self) -> Result<(), RegistryError> {
        // Stable sort keeps registration order between duplicates, so the
        // error names them in the order they were loaded.
        self.steps.sort_by_key(|s| s.id());

        if let Some(step) = self.steps.first() {
            if step.id() == INITIAL_VERSION {
                return Err(RegistryError::ZeroId {
                    name: step.name().to_string(),
                });
            }
        }

        for pair in self.steps.windows(2) {
            if pair[0].id() == pair[1].id() {
                return Err(RegistryError::DuplicateId {
                    id: pair[1].id(),
                    first: pair[0].name().to_string(),
                    second: pair[1].name().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Steps with `lower < id <= upper`, ascending
    pub fn range(
        &self,
        lower: StepId,
        upper: StepId,
    ) -> impl DoubleEndedIterator<Item = &Arc<dyn MigrationStep>> {
        self.steps
            .iter()
            .filter(move |s| s.id() > lower && s.id() <= upper)
    }

    pub fn ids(&self) -> Vec<StepId> {
        self.steps.iter().map(|s| s.id()).collect()
    }

    /// Get the latest step id
    pub fn latest_version(&self) -> StepId {
        self.steps
            .last()
            .map(|s| s.id())
            .unwrap_or(INITIAL_VERSION)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::testing::{RecordingStep, ScriptLog};

    fn steps(log: &ScriptLog, ids: &[StepId]) -> Vec<Arc<dyn MigrationStep>> {
        ids.iter()
            .map(|id| RecordingStep::new(*id, log).into_arc())
            .collect()
    }

    #[test]
    fn test_registry_sorts_steps() -> Result<(), RegistryError> {
        let log = ScriptLog::default();
        let registry = StepRegistry::new(steps(&log, &[3, 1, 2]))?;

        assert_eq!(registry.ids(), vec![1, 2, 3]);
        assert_eq!(registry.latest_version(), 3);
        assert_eq!(registry.len(), 3);
        Ok(())
    }

    #[test]
    fn test_registry_detects_duplicates() {
        let log = ScriptLog::default();
        let result = StepRegistry::new(vec![
            RecordingStep::new(1, &log).named("Migration A").into_arc(),
            RecordingStep::new(2, &log).into_arc(),
            RecordingStep::new(1, &log).named("Migration B").into_arc(),
        ]);

        let Err(err) = result else {
            panic!("duplicate ids must be rejected");
        };
        assert_eq!(
            err.to_string(),
            "Duplicate migration id 1 found: Migration A and Migration B"
        );
    }

    #[test]
    fn test_registry_rejects_zero_id() {
        let log = ScriptLog::default();
        let result = StepRegistry::new(steps(&log, &[0, 1]));
        assert!(matches!(result, Err(RegistryError::ZeroId { .. })));
    }

    #[test]
    fn test_range() -> Result<(), RegistryError> {
        let log = ScriptLog::default();
        let registry = StepRegistry::new(steps(&log, &[10, 2, 7, 4]))?;

        let ids: Vec<StepId> = registry.range(2, 7).map(|s| s.id()).collect();
        assert_eq!(ids, vec![4, 7]);

        let empty = StepRegistry::default();
        assert!(empty.is_empty());
        assert_eq!(empty.latest_version(), 0);
        Ok(())
    }
}
