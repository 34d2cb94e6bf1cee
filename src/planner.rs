use std::{fmt, sync::Arc};

use data_model::{Direction, StepId};
use serde::Serialize;

use crate::{
    migrations::{MigrationStep, StepRegistry},
    outcome::Failure,
};

/// Ordered, directioned list of steps moving the changelog from
/// `current_version` to `target_version`.
///
/// Steps are strictly ascending by id for [`Direction::Apply`] and strictly
/// descending for [`Direction::Revert`]. A [`Direction::Noop`] plan is empty.
pub struct ExecutionPlan {
    pub direction: Direction,
    pub current_version: StepId,
    pub target_version: StepId,
    pub steps: Vec<Arc<dyn MigrationStep>>,
}

impl ExecutionPlan {
    pub fn ids(&self) -> Vec<StepId> {
        self.steps.iter().map(|s| s.id()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            direction: self.direction,
            current_version: self.current_version,
            target_version: self.target_version,
            steps: self
                .steps
                .iter()
                .map(|s| PlannedStep {
                    id: s.id(),
                    name: s.name().to_string(),
                })
                .collect(),
        }
    }
}

impl fmt::Debug for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionPlan")
            .field("direction", &self.direction)
            .field("current_version", &self.current_version)
            .field("target_version", &self.target_version)
            .field("steps", &self.ids())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStep {
    pub id: StepId,
    pub name: String,
}

/// Serializable view of a plan, printed by dry runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub direction: Direction,
    pub current_version: StepId,
    pub target_version: StepId,
    pub steps: Vec<PlannedStep>,
}

/// Select the steps needed to move from `current` to `target`.
///
/// Applying includes every step with `current < id <= target`, ascending, and
/// requires the step whose id is `target`. Reverting includes every step with
/// `target < id <= current`, descending, and requires the step whose id is
/// `current`, the one on top of the changelog. Either requirement failing is
/// reported as [`Failure::MissingTargetScript`].
pub fn select_plan(
    current: StepId,
    target: StepId,
    registry: &StepRegistry,
) -> Result<ExecutionPlan, Failure> {
    let direction = Direction::between(current, target);
    let steps: Vec<Arc<dyn MigrationStep>> = match direction {
        Direction::Noop => Vec::new(),
        Direction::Apply => registry.range(current, target).cloned().collect(),
        Direction::Revert => registry.range(target, current).rev().cloned().collect(),
    };

    let boundary = match direction {
        Direction::Noop => None,
        Direction::Apply => Some((steps.last(), target)),
        Direction::Revert => Some((steps.first(), current)),
    };
    if let Some((edge, required)) = boundary {
        if edge.map(|s| s.id()) != Some(required) {
            return Err(Failure::MissingTargetScript { current, target });
        }
    }

    Ok(ExecutionPlan {
        direction,
        current_version: current,
        target_version: target,
        steps,
    })
}
