//! Outcome of a migration run.
//!
//! A run never panics or returns an untyped error for expected failure
//! modes. It resolves to a [`RunResult`]: a [`Success`] carrying a
//! [`SuccessCode`], or a [`Failure`] whose [`ErrorKind`] tells the caller
//! whether to fix its input, pick another target, retry, or repair the store.

use changelog_store::StoreError;
use data_model::{Direction, StepId};
use serde::Serialize;
use strum::AsRefStr;

use crate::migrations::{registry::RegistryError, source::SourceError};

pub type RunResult = Result<Success, Failure>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SuccessCode {
    NoMigrationRequired,
    Migrate,
    Rollback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Success {
    pub code: SuccessCode,
    pub message: String,
    /// Version recorded by the changelog once the run finished
    pub version: StepId,
    /// Step ids executed, in execution order
    pub executed: Vec<StepId>,
}

impl Success {
    pub fn no_migration_required(version: StepId) -> Self {
        Self {
            code: SuccessCode::NoMigrationRequired,
            message: "The current version is the same as the target version.".to_string(),
            version,
            executed: Vec::new(),
        }
    }

    /// `version` is the version the changelog ended at, which for a revert
    /// may be below `target` when no step sits exactly at the target.
    pub fn migrated(
        direction: Direction,
        target: StepId,
        version: StepId,
        executed: Vec<StepId>,
    ) -> Self {
        let code = match direction {
            Direction::Revert => SuccessCode::Rollback,
            _ => SuccessCode::Migrate,
        };
        Self {
            code,
            message: format!("successfully migrated to {target}"),
            version,
            executed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NoOptions,
    NoStoreLocation,
    NoTargetVersion,
    NoScripts,
    InvalidScript,
    DuplicateScript,
    MissingTargetScript,
    MigrationFailed,
    RollbackFailed,
    StoreUnavailable,
    ChangelogWriteFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ErrorClass {
    /// Invalid input, nothing was touched
    Configuration,
    /// The requested target can not be reached, nothing was touched
    Planning,
    /// A step failed, the changelog holds every step completed before it
    Execution,
    /// The changelog itself could not be read or written
    Storage,
}

impl ErrorKind {
    pub fn class(&self) -> ErrorClass {
        match self {
            ErrorKind::NoOptions |
            ErrorKind::NoStoreLocation |
            ErrorKind::NoTargetVersion |
            ErrorKind::NoScripts |
            ErrorKind::InvalidScript |
            ErrorKind::DuplicateScript => ErrorClass::Configuration,
            ErrorKind::MissingTargetScript => ErrorClass::Planning,
            ErrorKind::MigrationFailed | ErrorKind::RollbackFailed => ErrorClass::Execution,
            ErrorKind::StoreUnavailable | ErrorKind::ChangelogWriteFailed => ErrorClass::Storage,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Failure {
    #[error("No options argument given.")]
    NoOptions,

    #[error("Options argument is missing the changelog store location property \"store_location\"")]
    NoStoreLocation,

    #[error("No target_version given. Don't know where to migrate to")]
    NoTargetVersion,

    #[error("No migration scripts found at: '{location}'")]
    NoScripts { location: String },

    #[error("Invalid migration script: {source}")]
    InvalidScript { source: anyhow::Error },

    #[error("{source}")]
    DuplicateScript { source: RegistryError },

    #[error(
        "The target migration script could not be found. current version: {current}, target version: {target}"
    )]
    MissingTargetScript { current: StepId, target: StepId },

    #[error("Migration {id} failed to apply: {source:#}")]
    MigrationFailed { id: StepId, source: anyhow::Error },

    #[error("Migration {id} failed to revert: {source:#}")]
    RollbackFailed { id: StepId, source: anyhow::Error },

    #[error("Changelog store at '{location}' is unavailable: {source}")]
    StoreUnavailable { location: String, source: StoreError },

    #[error("Migration {id} completed its {direction} but the changelog could not be updated: {source}")]
    ChangelogWriteFailed {
        id: StepId,
        direction: Direction,
        source: StoreError,
    },
}

impl Failure {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Failure::NoOptions => ErrorKind::NoOptions,
            Failure::NoStoreLocation => ErrorKind::NoStoreLocation,
            Failure::NoTargetVersion => ErrorKind::NoTargetVersion,
            Failure::NoScripts { .. } => ErrorKind::NoScripts,
            Failure::InvalidScript { .. } => ErrorKind::InvalidScript,
            Failure::DuplicateScript { .. } => ErrorKind::DuplicateScript,
            Failure::MissingTargetScript { .. } => ErrorKind::MissingTargetScript,
            Failure::MigrationFailed { .. } => ErrorKind::MigrationFailed,
            Failure::RollbackFailed { .. } => ErrorKind::RollbackFailed,
            Failure::StoreUnavailable { .. } => ErrorKind::StoreUnavailable,
            Failure::ChangelogWriteFailed { .. } => ErrorKind::ChangelogWriteFailed,
        }
    }

    /// Id of the step whose operation or bookkeeping failed
    pub fn failed_step(&self) -> Option<StepId> {
        match self {
            Failure::MigrationFailed { id, .. } |
            Failure::RollbackFailed { id, .. } |
            Failure::ChangelogWriteFailed { id, .. } => Some(*id),
            _ => None,
        }
    }
}

impl From<SourceError> for Failure {
    fn from(err: SourceError) -> Self {
        Failure::InvalidScript { source: err.into() }
    }
}

impl From<RegistryError> for Failure {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::ZeroId { .. } => Failure::InvalidScript { source: err.into() },
            RegistryError::DuplicateId { .. } => Failure::DuplicateScript { source: err },
        }
    }
}

/// Serializable, discriminated form of a [`RunResult`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RunReport {
    Success {
        ok: bool,
        code: SuccessCode,
        message: String,
        version: StepId,
        executed: Vec<StepId>,
    },
    Failure {
        ok: bool,
        error: ErrorKind,
        class: ErrorClass,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        failed_step: Option<StepId>,
    },
}

impl RunReport {
    pub fn is_ok(&self) -> bool {
        matches!(self, RunReport::Success { .. })
    }
}

impl From<&RunResult> for RunReport {
    fn from(result: &RunResult) -> Self {
        match result {
            Ok(success) => RunReport::Success {
                ok: true,
                code: success.code,
                message: success.message.clone(),
                version: success.version,
                executed: success.executed.clone(),
            },
            Err(failure) => RunReport::Failure {
                ok: false,
                error: failure.kind(),
                class: failure.kind().class(),
                message: failure.to_string(),
                failed_step: failure.failed_step(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn test_codes_render_as_screaming_snake_case() {
        assert_eq!(SuccessCode::NoMigrationRequired.to_string(), "NO_MIGRATION_REQUIRED");
        assert_eq!(ErrorKind::MissingTargetScript.to_string(), "MISSING_TARGET_SCRIPT");
        assert_eq!(ErrorKind::NoStoreLocation.as_ref(), "NO_STORE_LOCATION");
    }

    #[test]
    fn test_error_classes() {
        assert_eq!(ErrorKind::NoOptions.class(), ErrorClass::Configuration);
        assert_eq!(ErrorKind::DuplicateScript.class(), ErrorClass::Configuration);
        assert_eq!(ErrorKind::MissingTargetScript.class(), ErrorClass::Planning);
        assert_eq!(ErrorKind::RollbackFailed.class(), ErrorClass::Execution);
        assert_eq!(ErrorKind::StoreUnavailable.class(), ErrorClass::Storage);
        assert_eq!(ErrorKind::ChangelogWriteFailed.class(), ErrorClass::Storage);
    }

    #[test]
    fn test_failure_report() -> anyhow::Result<()> {
        let result: RunResult = Err(Failure::MigrationFailed {
            id: 5,
            source: anyhow!("Intentional FAIL for testing reasons."),
        });
        let report = RunReport::from(&result);
        assert!(!report.is_ok());

        let json = serde_json::to_value(&report)?;
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"], "MIGRATION_FAILED");
        assert_eq!(json["class"], "execution");
        assert_eq!(json["failed_step"], 5);
        assert!(json["message"]
            .as_str()
            .unwrap()
            .contains("Intentional FAIL"));
        Ok(())
    }

    #[test]
    fn test_success_report() -> anyhow::Result<()> {
        let result: RunResult = Ok(Success::migrated(Direction::Revert, 1, 1, vec![3, 2]));
        let json = serde_json::to_value(RunReport::from(&result))?;
        assert_eq!(json["ok"], true);
        assert_eq!(json["code"], "ROLLBACK");
        assert_eq!(json["message"], "successfully migrated to 1");
        assert_eq!(json["executed"], serde_json::json!([3, 2]));
        assert!(json.get("failed_step").is_none());
        Ok(())
    }
}
