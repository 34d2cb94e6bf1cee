//! Versioned migration engine.
//!
//! Given the current version recorded in a changelog and a target version,
//! the [`migrator::Migrator`] selects the steps to apply or revert, runs them
//! one at a time and records each completed step in the changelog before
//! moving on.

pub mod config;
pub mod migrations;
pub mod migrator;
pub mod options;
pub mod outcome;
pub mod planner;
pub mod runner;
pub mod tracing;


pub use migrator::Migrator;
pub use options::MigrateOptions;
pub use outcome::{ErrorClass, ErrorKind, Failure, RunReport, RunResult, Success, SuccessCode};
