use data_model::StepId;
use serde::{Deserialize, Serialize};

use crate::outcome::Failure;

/// Directory steps are loaded from when no step source is given.
pub const DEFAULT_STEP_SOURCE: &str = "./migrations";
/// Changelog used when no changelog name is given.
pub const DEFAULT_CHANGELOG_NAME: &str = "_migrations";

/// Options of a migration run, as provided by the caller. Every field is
/// optional here so that missing required values can be reported precisely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrateOptions {
    /// Connection descriptor of the changelog store
    #[serde(default)]
    pub store_location: Option<String>,
    /// Version to migrate to, 0 reverts everything
    #[serde(default)]
    pub target_version: Option<StepId>,
    /// Where steps are discovered
    #[serde(default)]
    pub step_source: Option<String>,
    /// Name of the changelog inside the store
    #[serde(default)]
    pub changelog_name: Option<String>,
}

impl MigrateOptions {
    pub fn new(store_location: impl Into<String>, target_version: StepId) -> Self {
        Self {
            store_location: Some(store_location.into()),
            target_version: Some(target_version),
            ..Default::default()
        }
    }

    pub fn with_step_source(mut self, step_source: impl Into<String>) -> Self {
        self.step_source = Some(step_source.into());
        self
    }

    pub fn with_changelog_name(mut self, changelog_name: impl Into<String>) -> Self {
        self.changelog_name = Some(changelog_name.into());
        self
    }

    /// Fill unset fields from `defaults`
    pub fn merge(self, defaults: MigrateOptions) -> Self {
        Self {
            store_location: self.store_location.or(defaults.store_location),
            target_version: self.target_version.or(defaults.target_version),
            step_source: self.step_source.or(defaults.step_source),
            changelog_name: self.changelog_name.or(defaults.changelog_name),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == MigrateOptions::default()
    }
}

/// Options after validation, with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOptions {
    pub store_location: String,
    pub target_version: StepId,
    pub step_source: String,
    pub changelog_name: String,
}

/// Check the options in order: presence of the options themselves, the store
/// location, then the target version. A target version of 0 is valid.
pub fn validate(options: Option<&MigrateOptions>) -> Result<ValidatedOptions, Failure> {
    let options = options.ok_or(Failure::NoOptions)?;

    let store_location = options
        .store_location
        .as_deref()
        .map(str::trim)
        .filter(|location| !location.is_empty())
        .ok_or(Failure::NoStoreLocation)?;

    let target_version = options.target_version.ok_or(Failure::NoTargetVersion)?;

    Ok(ValidatedOptions {
        store_location: store_location.to_string(),
        target_version,
        step_source: options
            .step_source
            .clone()
            .unwrap_or_else(|| DEFAULT_STEP_SOURCE.to_string()),
        changelog_name: options
            .changelog_name
            .clone()
            .unwrap_or_else(|| DEFAULT_CHANGELOG_NAME.to_string()),
    })
}
