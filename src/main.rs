use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Context;
use changelog_store::RocksDBConnector;
use clap::Parser;
use indexify_migrator::{
    config::MigratorConfig,
    migrations::DirectoryStepSource,
    tracing::setup_tracing,
    MigrateOptions,
    Migrator,
    RunReport,
    RunResult,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "config file", help = "Path to config file")]
    config: Option<PathBuf>,

    /// Path of the changelog store
    #[arg(long)]
    store_location: Option<String>,

    /// Version to migrate to, 0 reverts every step
    #[arg(long)]
    target_version: Option<u64>,

    /// Directory holding the step manifests
    #[arg(long)]
    step_source: Option<String>,

    /// Name of the changelog inside the store
    #[arg(long)]
    changelog_name: Option<String>,

    /// Print the plan without executing it
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn options(&self) -> MigrateOptions {
        MigrateOptions {
            store_location: self.store_location.clone(),
            target_version: self.target_version,
            step_source: self.step_source.clone(),
            changelog_name: self.changelog_name.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let (config, from_file) = match &cli.config {
        Some(path) => {
            let path = path.to_str().context("config path is not valid UTF-8")?;
            let config = MigratorConfig::from_path(path)
                .with_context(|| format!("failed to load config from {path}"))?;
            (config, true)
        }
        None => (MigratorConfig::default(), false),
    };

    setup_tracing(&config)?;

    let flags = cli.options();
    let options = if from_file || !flags.is_empty() {
        Some(flags.merge(config.migration.clone()))
    } else {
        None
    };

    let migrator = Migrator::new(
        Arc::new(RocksDBConnector),
        Arc::new(DirectoryStepSource::default()),
    );
    run(&migrator, options.as_ref(), cli.dry_run, &config).await
}

#[::tracing::instrument(skip_all, fields(env = %config.env, dry_run = dry_run))]
async fn run(
    migrator: &Migrator,
    options: Option<&MigrateOptions>,
    dry_run: bool,
    config: &MigratorConfig,
) -> anyhow::Result<ExitCode> {
    if dry_run {
        return match migrator.plan(options).await {
            Ok(plan) => {
                println!("{}", serde_json::to_string_pretty(&plan.summary())?);
                Ok(ExitCode::SUCCESS)
            }
            Err(failure) => {
                let result: RunResult = Err(failure);
                let report = RunReport::from(&result);
                println!("{}", serde_json::to_string_pretty(&report)?);
                Ok(ExitCode::FAILURE)
            }
        };
    }

    let result = migrator.run(options).await;
    let report = RunReport::from(&result);
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.is_ok() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
