//! The `orbis` binary: fly a viewer over a procedural voxel planet without a
//! window, exercising the full LOD, meshing and job pipeline.

use clap::Parser;
use orbis_app::{AppError, Session, load_config};
use orbis_config::CliArgs;

fn main() -> Result<(), AppError> {
    let args = CliArgs::parse();
    let (config, config_dir) = load_config(&args)?;

    let log_dir = config_dir.join("logs");
    let file_logging = config.debug.log_to_file || cfg!(debug_assertions);
    orbis_log::init_logging(Some(&log_dir), file_logging, Some(&config));
    tracing::info!("using config from {}", config_dir.display());

    let mut session = Session::new(config)?;
    session.run()?;
    Ok(())
}
