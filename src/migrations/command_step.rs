use std::{
    fs,
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use data_model::StepId;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use super::{
    migration_trait::{MigrationStep, StepContext},
    source::SourceError,
};

// Lines of stderr kept in the error of a failed command.
const STDERR_TAIL_LINES: usize = 20;

/// On-disk definition of a step:
///
/// ```yaml
/// id: 3
/// name: add status column
/// apply: ./bin/apply-3.sh
/// revert: ./bin/revert-3.sh
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct StepManifest {
    pub id: StepId,
    #[serde(default)]
    pub name: Option<String>,
    pub apply: String,
    pub revert: String,
}

/// Step whose operations are shell commands, run from the directory holding
/// the manifest.
#[derive(Debug, Clone)]
pub struct CommandStep {
    id: StepId,
    name: String,
    apply: String,
    revert: String,
    working_dir: PathBuf,
}

impl CommandStep {
    pub fn from_manifest(path: &Path) -> Result<Self, SourceError> {
        let contents = fs::read_to_string(path).map_err(|source| SourceError::ReadManifest {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: StepManifest =
            serde_yaml::from_str(&contents).map_err(|source| SourceError::ParseManifest {
                path: path.to_path_buf(),
                source,
            })?;

        let name = manifest.name.unwrap_or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| manifest.id.to_string())
        });
        let working_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            id: manifest.id,
            name,
            apply: manifest.apply,
            revert: manifest.revert,
            working_dir,
        })
    }

    async fn run_command(&self, command: &str, ctx: &StepContext) -> Result<()> {
        let operation = ctx.direction;
        debug!(id = self.id, %operation, command, "running migration command");

        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.working_dir)
            .env("MIGRATION_ID", self.id.to_string())
            .env("MIGRATION_DIRECTION", operation.to_string())
            .env("MIGRATION_TARGET_VERSION", ctx.target_version.to_string())
            .env("MIGRATION_STORE_LOCATION", &ctx.store_location)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("spawning {operation} command for migration {}", self.id))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
            bail!(
                "{operation} command `{command}` exited with {}: {}",
                output.status,
                tail.trim()
            );
        }
        Ok(())
    }
}

#[async_trait]
impl MigrationStep for CommandStep {
    fn id(&self) -> StepId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, ctx: &StepContext) -> Result<()> {
        self.run_command(&self.apply, ctx).await
    }

    async fn revert(&self, ctx: &StepContext) -> Result<()> {
        self.run_command(&self.revert, ctx).await
    }
}
