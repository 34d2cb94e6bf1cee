pub mod command_step;
pub mod migration_trait;
pub mod registry;
pub mod source;
#[cfg(test)]
pub(crate) mod testing;

pub use migration_trait::{MigrationStep, StepContext};
pub use registry::StepRegistry;
pub use source::{DirectoryStepSource, LoadedSteps, StaticStepSource, StepSource};
