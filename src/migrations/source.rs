use std::{
    collections::HashMap,
    env,
    fs,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, info};

use super::{command_step::CommandStep, migration_trait::MigrationStep};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to list migrations directory {}: {}", path.display(), source)]
    ReadDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read migration manifest {}: {}", path.display(), source)]
    ReadManifest {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse migration manifest {}: {}", path.display(), source)]
    ParseManifest {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Steps handed out by a [`StepSource`], in no particular order.
pub struct LoadedSteps {
    /// Resolved location the steps were loaded from, used in messages
    pub location: String,
    pub steps: Vec<Arc<dyn MigrationStep>>,
}

/// Discovers the migration steps known under a source name.
pub trait StepSource: Send + Sync {
    fn load(&self, source: &str) -> Result<LoadedSteps, SourceError>;
}

/// Step sets registered in process, keyed by source name.
#[derive(Default)]
pub struct StaticStepSource {
    sets: HashMap<String, Vec<Arc<dyn MigrationStep>>>,
}

impl StaticStepSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_steps(
        mut self,
        source: &str,
        steps: impl IntoIterator<Item = Arc<dyn MigrationStep>>,
    ) -> Self {
        self.sets
            .entry(source.to_string())
            .or_default()
            .extend(steps);
        self
    }
}

impl StepSource for StaticStepSource {
    fn load(&self, source: &str) -> Result<LoadedSteps, SourceError> {
        Ok(LoadedSteps {
            location: source.to_string(),
            steps: self.sets.get(source).cloned().unwrap_or_default(),
        })
    }
}

/// Loads [`CommandStep`] manifests (`*.yaml`, `*.yml`) from a directory.
/// Relative source paths resolve against `base_dir`.
pub struct DirectoryStepSource {
    base_dir: PathBuf,
}

impl Default for DirectoryStepSource {
    fn default() -> Self {
        Self::new(env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

impl DirectoryStepSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn resolve(&self, source: &str) -> PathBuf {
        let path = Path::new(source);
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        };
        joined
            .components()
            .filter(|component| !matches!(component, Component::CurDir))
            .collect()
    }
}

fn has_manifest_extension(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}

impl StepSource for DirectoryStepSource {
    fn load(&self, source: &str) -> Result<LoadedSteps, SourceError> {
        let dir = self.resolve(source);
        let location = dir.to_string_lossy().to_string();

        // An unreadable directory holds no steps
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("unable to read migrations directory {}: {}", location, e);
                return Ok(LoadedSteps {
                    location,
                    steps: Vec::new(),
                });
            }
        };

        let mut manifests: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| SourceError::ReadDirectory {
                    path: dir.clone(),
                    source,
                })?
                .path();
            if !has_manifest_extension(&path) {
                continue;
            }
            // Follows symlinks, a dangling one is an error.
            let metadata = fs::metadata(&path).map_err(|source| SourceError::ReadManifest {
                path: path.clone(),
                source,
            })?;
            if metadata.is_file() {
                manifests.push(path);
            }
        }
        manifests.sort();

        let mut steps: Vec<Arc<dyn MigrationStep>> = Vec::with_capacity(manifests.len());
        for manifest in manifests {
            steps.push(Arc::new(CommandStep::from_manifest(&manifest)?));
        }

        info!("loaded {} migration steps from {}", steps.len(), location);
        Ok(LoadedSteps { location, steps })
    }
}
