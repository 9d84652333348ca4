//! Application error types.

use orbis_config::ConfigError;
use orbis_jobs::JobError;
use orbis_lod::LodError;

/// Errors that stop the application.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The OS did not provide a configuration directory and none was given.
    #[error("could not determine a configuration directory; pass --config")]
    NoConfigDir,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Lod(#[from] LodError),

    #[error(transparent)]
    Job(#[from] JobError),
}
