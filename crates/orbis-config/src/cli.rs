//! Command-line argument parsing for the Orbis viewer.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;
use crate::config::FrameModeSetting;

/// Flags of the `orbis` binary. Any flag given wins over `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "orbis", about = "Octree LOD voxel planet, headless flight")]
pub struct CliArgs {
    /// Maximum octree division depth.
    #[arg(long)]
    pub max_divisions: Option<u32>,

    /// Voxels per node edge.
    #[arg(long)]
    pub resolution: Option<u32>,

    /// Node creations allowed per frame.
    #[arg(long)]
    pub creations_per_frame: Option<usize>,

    /// Terrain noise seed.
    #[arg(long)]
    pub seed: Option<u32>,

    /// Worker threads (0 = automatic).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Wait for each meshing batch inside the frame that scheduled it.
    #[arg(long)]
    pub blocking: bool,

    /// Number of frames to fly.
    #[arg(long)]
    pub frames: Option<u32>,

    /// Tracing filter directive, e.g. `debug` or `info,orbis_lod=trace`.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Directory holding `config.ron` instead of the platform default.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Overwrite every field for which `args` carries a value.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(d) = args.max_divisions {
            self.lod.max_divisions = d;
        }
        if let Some(r) = args.resolution {
            self.lod.resolution = r;
        }
        if let Some(c) = args.creations_per_frame {
            self.lod.max_creations_per_frame = c;
        }
        if let Some(seed) = args.seed {
            self.terrain.seed = seed;
        }
        if let Some(w) = args.workers {
            self.jobs.worker_threads = w;
        }
        if args.blocking {
            self.jobs.frame_mode = FrameModeSetting::Blocking;
        }
        if let Some(f) = args.frames {
            self.viewer.frames = f;
        }
        if let Some(level) = &args.log_level {
            self.debug.log_level.clone_from(level);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_loaded_values() {
        let mut config = Config::default();
        let args = CliArgs {
            max_divisions: Some(6),
            seed: Some(7),
            blocking: true,
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.lod.max_divisions, 6);
        assert_eq!(config.terrain.seed, 7);
        assert_eq!(config.jobs.frame_mode, FrameModeSetting::Blocking);
        // Untouched sections keep their values.
        assert_eq!(config.lod.resolution, 16);
        assert_eq!(config.viewer.frames, 240);
    }

    #[test]
    fn test_no_flags_change_nothing() {
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::parse_from([
            "orbis",
            "--resolution",
            "8",
            "--frames",
            "10",
            "--blocking",
            "--log-level",
            "debug",
        ]);
        assert_eq!(args.resolution, Some(8));
        assert_eq!(args.frames, Some(10));
        assert!(args.blocking);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.config.is_none());
    }
}
