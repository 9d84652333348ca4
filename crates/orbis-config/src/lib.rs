//! Configuration for the Orbis planet viewer.
//!
//! Settings persist to disk as a RON file, every section falls back to its
//! defaults when missing, and selected fields can be overridden from the
//! command line.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CONFIG_FILE, Config, DebugConfig, FrameModeSetting, JobsConfig, LodConfig, TerrainConfig,
    TriggerShape, ViewerConfig, default_config_dir,
};
pub use error::ConfigError;
