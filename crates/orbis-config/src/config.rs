//! Configuration structs with defaults, validation and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Octree level-of-detail settings.
    pub lod: LodConfig,
    /// Planet density field settings.
    pub terrain: TerrainConfig,
    /// Meshing job settings.
    pub jobs: JobsConfig,
    /// Scripted viewer flight for the headless run.
    pub viewer: ViewerConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Shape of the region around a node that makes it subdivide.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum TriggerShape {
    #[default]
    Box,
    Sphere,
}

/// Octree settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodConfig {
    /// Levels below the root; leaves are level 1.
    pub max_divisions: u32,
    /// Voxels per node edge.
    pub resolution: u32,
    /// Edge length of a finest-level voxel in world units.
    pub voxel_size: f64,
    /// Subdivision half-extent per unit of node edge length.
    pub radius_multiplier: f64,
    /// Extra subdivision half-extent in world units.
    pub inner_padding: f64,
    /// Parents allowed to gain children per frame.
    pub max_creations_per_frame: usize,
    /// Root node centre.
    pub root_center: [f64; 3],
    pub trigger: TriggerShape,
}

/// Density field settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    pub seed: u32,
    pub planet_center: [f64; 3],
    pub planet_radius: f64,
    pub base_frequency: f64,
    pub warp_min_frequency: f64,
    pub warp_max_frequency: f64,
    pub warp_offset: [f64; 3],
    pub primary_amplitude: f64,
    pub secondary_amplitude: f64,
}

/// When mesh results are consumed relative to the frame that scheduled them.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum FrameModeSetting {
    /// Wait for each batch inside the frame.
    Blocking,
    /// Apply batches in a later frame once they are complete.
    #[default]
    Pipelined,
}

/// Meshing job settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JobsConfig {
    /// Worker threads; 0 picks a count from the CPU.
    pub worker_threads: usize,
    pub frame_mode: FrameModeSetting,
    /// Hold new batches back until the previous one has been applied.
    pub wait_for_drain: bool,
    /// Stop starting batches once this much of a frame has passed.
    pub frame_budget_ms: Option<u64>,
}

/// Straight-line viewer flight used by the headless run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    pub start: [f64; 3],
    pub end: [f64; 3],
    /// Frames taken to fly from `start` to `end`.
    pub frames: u32,
    pub fov_y_degrees: f64,
    pub aspect_ratio: f64,
    pub near: f64,
    pub far: f64,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Write a JSON log file next to the config.
    pub log_to_file: bool,
    /// Frames between progress summaries; 0 disables them.
    pub report_interval: u32,
}

// --- Default implementations ---

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            max_divisions: 10,
            resolution: 16,
            voxel_size: 1.0,
            radius_multiplier: 1.0,
            inner_padding: 0.0,
            max_creations_per_frame: 8,
            root_center: [0.0; 3],
            trigger: TriggerShape::Box,
        }
    }
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: 2376,
            planet_center: [0.0; 3],
            planet_radius: 2000.0,
            base_frequency: 0.005,
            warp_min_frequency: 0.00025,
            warp_max_frequency: 0.0025,
            warp_offset: [10.0, 0.0, 0.0],
            primary_amplitude: 100.0,
            secondary_amplitude: 1.0,
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            frame_mode: FrameModeSetting::Pipelined,
            wait_for_drain: true,
            frame_budget_ms: Some(30),
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            start: [0.0, 4000.0, 0.0],
            end: [0.0, 2060.0, 0.0],
            frames: 240,
            fov_y_degrees: 70.0,
            aspect_ratio: 16.0 / 9.0,
            near: 0.1,
            far: 20_000.0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_to_file: false,
            report_interval: 60,
        }
    }
}

/// Platform config directory for Orbis, if the platform has one.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("orbis"))
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn check_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be finite and positive, got {value}")))
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(
            field,
            format!("must be finite and non-negative, got {value}"),
        ))
    }
}

fn check_finite_vec(field: &'static str, value: [f64; 3]) -> Result<(), ConfigError> {
    if value.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(invalid(field, "components must be finite"))
    }
}

// --- Validation ---

/// Deepest octree the LOD tree accepts.
const MAX_DIVISIONS: u32 = 30;
/// Largest voxels-per-edge the mesher accepts.
const MAX_RESOLUTION: u32 = 64;

impl Config {
    /// Check every numeric setting, reporting the first one out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lod = &self.lod;
        if lod.max_divisions == 0 || lod.max_divisions > MAX_DIVISIONS {
            return Err(invalid(
                "lod.max_divisions",
                format!("must be in 1..={MAX_DIVISIONS}, got {}", lod.max_divisions),
            ));
        }
        if lod.resolution == 0 || lod.resolution > MAX_RESOLUTION {
            return Err(invalid(
                "lod.resolution",
                format!("must be in 1..={MAX_RESOLUTION}, got {}", lod.resolution),
            ));
        }
        check_positive("lod.voxel_size", lod.voxel_size)?;
        check_non_negative("lod.radius_multiplier", lod.radius_multiplier)?;
        check_non_negative("lod.inner_padding", lod.inner_padding)?;
        if lod.max_creations_per_frame == 0 {
            return Err(invalid("lod.max_creations_per_frame", "must be at least 1"));
        }
        check_finite_vec("lod.root_center", lod.root_center)?;

        let terrain = &self.terrain;
        check_finite_vec("terrain.planet_center", terrain.planet_center)?;
        check_positive("terrain.planet_radius", terrain.planet_radius)?;
        check_positive("terrain.base_frequency", terrain.base_frequency)?;
        check_positive("terrain.warp_min_frequency", terrain.warp_min_frequency)?;
        check_positive("terrain.warp_max_frequency", terrain.warp_max_frequency)?;
        check_finite_vec("terrain.warp_offset", terrain.warp_offset)?;
        check_non_negative("terrain.primary_amplitude", terrain.primary_amplitude)?;
        check_non_negative("terrain.secondary_amplitude", terrain.secondary_amplitude)?;

        let viewer = &self.viewer;
        check_finite_vec("viewer.start", viewer.start)?;
        check_finite_vec("viewer.end", viewer.end)?;
        if viewer.frames == 0 {
            return Err(invalid("viewer.frames", "must be at least 1"));
        }
        if !(viewer.fov_y_degrees > 0.0 && viewer.fov_y_degrees < 180.0) {
            return Err(invalid(
                "viewer.fov_y_degrees",
                format!("must be in (0, 180), got {}", viewer.fov_y_degrees),
            ));
        }
        check_positive("viewer.aspect_ratio", viewer.aspect_ratio)?;
        check_positive("viewer.near", viewer.near)?;
        if !(viewer.far.is_finite() && viewer.far > viewer.near) {
            return Err(invalid(
                "viewer.far",
                format!("must be finite and beyond near ({}), got {}", viewer.near, viewer.far),
            ));
        }
        Ok(())
    }
}

// --- Persistence ---

/// File name of the persisted config inside the config directory.
pub const CONFIG_FILE: &str = "config.ron";

impl Config {
    fn read_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        ron::from_str(&text).map_err(ConfigError::ParseError)
    }

    /// Read `config.ron` from `config_dir`, writing the defaults there first
    /// when the file does not exist yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        if !path.exists() {
            let defaults = Config::default();
            defaults.save(config_dir)?;
            log::info!("wrote default settings to {}", path.display());
            return Ok(defaults);
        }
        let config = Self::read_from(&path)?;
        log::info!("read settings from {}", path.display());
        Ok(config)
    }

    /// Write `config.ron` into `config_dir`, creating the directory if needed.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(2)
            .separate_tuple_members(false)
            .enumerate_arrays(false);
        let text = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;
        std::fs::write(config_dir.join(CONFIG_FILE), text).map_err(ConfigError::WriteError)
    }

    /// Read `config.ron` again. Returns the new settings only when they
    /// differ from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = Self::read_from(&config_dir.join(CONFIG_FILE))?;
        if fresh == *self {
            return Ok(None);
        }
        log::info!("settings changed on disk");
        Ok(Some(fresh))
    }
}
