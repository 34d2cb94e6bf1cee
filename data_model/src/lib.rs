use std::{
    fmt::{self, Display},
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use strum::AsRefStr;

/// Identifier of a migration step. Ids are positive, unique across a
/// registry and define the total order of steps.
pub type StepId = u64;

/// Version recorded by an empty changelog.
pub const INITIAL_VERSION: StepId = 0;

/// Direction a plan moves the changelog in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Apply,
    Revert,
    #[serde(rename = "none")]
    #[strum(serialize = "none")]
    Noop,
}

impl Direction {
    /// Direction required to move from `current` to `target`.
    pub fn between(current: StepId, target: StepId) -> Self {
        match target.cmp(&current) {
            std::cmp::Ordering::Greater => Direction::Apply,
            std::cmp::Ordering::Less => Direction::Revert,
            std::cmp::Ordering::Equal => Direction::Noop,
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// A durable record that the apply operation of step `id` completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub id: StepId,
    #[serde(default)]
    pub applied_at_ms: u64,
}

impl ChangelogEntry {
    pub fn new(id: StepId) -> Self {
        Self {
            id,
            applied_at_ms: get_epoch_time_in_ms(),
        }
    }
}

pub fn get_epoch_time_in_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
