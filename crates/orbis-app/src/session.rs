//! Builds the planet pipeline from a [`Config`] and runs the flight.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use glam::DVec3;
use orbis_config::{CliArgs, Config, FrameModeSetting, JobsConfig, TriggerShape, default_config_dir};
use orbis_jobs::{BatchGate, OrchestratorConfig, WorkerPool};
use orbis_lod::{FrameMode, LodParams, PlanetLod, SubdivisionTrigger};
use orbis_render::{Frustum, MeshStore};
use orbis_terrain::{DensityField, DensityParams, SimplexNoise};
use tracing::{debug, info};

use crate::AppError;
use crate::flight::FlightPath;

/// Totals over a finished run.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunSummary {
    pub frames: u32,
    pub octets_created: usize,
    pub nodes_pruned: usize,
    pub meshes_attached: usize,
    pub results_discarded: usize,
    pub gated_frames: u32,
    /// Largest visible set seen in any frame.
    pub peak_visible: usize,
    pub peak_bytes: usize,
    /// Geometry released at teardown.
    pub released_at_exit: usize,
    pub elapsed: Duration,
}

/// Resolve the config directory, load or create `config.ron` there, apply
/// CLI overrides and validate the result.
pub fn load_config(args: &CliArgs) -> Result<(Config, PathBuf), AppError> {
    let config_dir = match &args.config {
        Some(dir) => dir.clone(),
        None => default_config_dir().ok_or(AppError::NoConfigDir)?,
    };
    let mut config = Config::load_or_create(&config_dir)?;
    config.apply_cli_overrides(args);
    config.validate()?;
    Ok((config, config_dir))
}

/// LOD parameters from the `lod` section.
pub fn lod_params(config: &Config) -> LodParams {
    let lod = &config.lod;
    LodParams {
        max_divisions: lod.max_divisions,
        resolution: lod.resolution,
        voxel_size: lod.voxel_size,
        radius_multiplier: lod.radius_multiplier,
        inner_padding: lod.inner_padding,
        max_creations_per_frame: lod.max_creations_per_frame,
        root_center: DVec3::from_array(lod.root_center),
        trigger: match lod.trigger {
            TriggerShape::Box => SubdivisionTrigger::Box,
            TriggerShape::Sphere => SubdivisionTrigger::Sphere,
        },
    }
}

/// Density field from the `terrain` section.
pub fn density_field(config: &Config) -> DensityField<SimplexNoise> {
    let t = &config.terrain;
    let params = DensityParams {
        planet_center: DVec3::from_array(t.planet_center),
        planet_radius: t.planet_radius,
        base_frequency: t.base_frequency,
        warp_min_frequency: t.warp_min_frequency,
        warp_max_frequency: t.warp_max_frequency,
        warp_offset: DVec3::from_array(t.warp_offset),
        primary_amplitude: t.primary_amplitude,
        secondary_amplitude: t.secondary_amplitude,
    };
    DensityField::new(params, SimplexNoise::new(t.seed))
}

/// Orchestrator gating from the `jobs` section.
pub fn orchestrator_config(jobs: &JobsConfig) -> OrchestratorConfig {
    OrchestratorConfig {
        gate: if jobs.wait_for_drain {
            BatchGate::WaitForDrain
        } else {
            BatchGate::Immediate
        },
        frame_budget: jobs.frame_budget_ms.map(Duration::from_millis),
    }
}

fn frame_mode(setting: FrameModeSetting) -> FrameMode {
    match setting {
        FrameModeSetting::Blocking => FrameMode::Blocking,
        FrameModeSetting::Pipelined => FrameMode::Pipelined,
    }
}

/// A planet, its worker pool and geometry store, and the viewer flight.
pub struct Session {
    planet: PlanetLod<SimplexNoise, WorkerPool>,
    store: MeshStore,
    flight: FlightPath,
    config: Config,
}

impl Session {
    /// Validate `config` and build every component it describes.
    pub fn new(config: Config) -> Result<Self, AppError> {
        config.validate()?;

        let pool = if config.jobs.worker_threads == 0 {
            WorkerPool::with_defaults()?
        } else {
            WorkerPool::new(config.jobs.worker_threads)?
        };
        info!("meshing on {} worker thread(s)", pool.thread_count());

        let params = lod_params(&config);
        info!(
            "planet radius {}, {} LOD levels, root edge {}, {} voxels per node edge",
            config.terrain.planet_radius,
            params.max_divisions,
            params.root_scale(),
            params.resolution
        );

        let planet = PlanetLod::new(
            params,
            density_field(&config),
            pool,
            orchestrator_config(&config.jobs),
            frame_mode(config.jobs.frame_mode),
        )?;

        let viewer = &config.viewer;
        let flight = FlightPath::new(
            DVec3::from_array(viewer.start),
            DVec3::from_array(viewer.end),
            viewer.frames,
        );

        Ok(Self {
            planet,
            store: MeshStore::new(),
            flight,
            config,
        })
    }

    pub fn planet(&self) -> &PlanetLod<SimplexNoise, WorkerPool> {
        &self.planet
    }

    pub fn store(&self) -> &MeshStore {
        &self.store
    }

    fn frustum_at(&self, eye: DVec3) -> Frustum {
        let viewer = &self.config.viewer;
        let target = DVec3::from_array(self.config.terrain.planet_center);
        Frustum::looking_at(
            eye,
            target,
            FlightPath::camera_up(eye, target),
            viewer.fov_y_degrees.to_radians(),
            viewer.aspect_ratio,
            viewer.near,
            viewer.far,
        )
    }

    /// Fly the whole path, then drain outstanding work and tear down.
    pub fn run(&mut self) -> Result<RunSummary, AppError> {
        let started = Instant::now();
        let mut summary = RunSummary::default();
        let interval = self.config.debug.report_interval;

        for frame in 0..self.flight.frames {
            let eye = self.flight.position(frame);
            let report = self.planet.update(eye, &mut self.store)?;

            let frustum = self.frustum_at(eye);
            let visible = self.planet.visible_geometry(|b| frustum.is_visible(b));
            let triangles = self.store.triangle_count(&visible);

            summary.frames += 1;
            summary.octets_created += report.traverse.created;
            summary.nodes_pruned += report.traverse.pruned;
            summary.meshes_attached += report.attached;
            summary.results_discarded += report.discarded;
            summary.gated_frames += u32::from(report.gated);
            summary.peak_visible = summary.peak_visible.max(visible.len());

            debug!(
                "frame {frame}: viewer {:.1} from centre, {} visible mesh(es), {triangles} triangle(s)",
                eye.distance(DVec3::from_array(self.config.terrain.planet_center)),
                visible.len()
            );
            if interval > 0 && (frame + 1) % interval == 0 {
                let stats = self.planet.stats();
                info!(
                    "frame {}: {} node(s), {} leaf/leaves, {} in flight, {} stored mesh(es)",
                    frame + 1,
                    stats.nodes,
                    stats.leaves,
                    stats.scheduled,
                    self.store.len()
                );
            }
        }

        summary.released_at_exit = self.shutdown()?;
        summary.peak_bytes = self.store.stats().peak_bytes;
        summary.elapsed = started.elapsed();
        info!(
            "flew {} frame(s) in {:.2}s: {} octet(s) created, {} node(s) pruned, {} mesh(es) attached, peak {} visible, peak {} KiB",
            summary.frames,
            summary.elapsed.as_secs_f64(),
            summary.octets_created,
            summary.nodes_pruned,
            summary.meshes_attached,
            summary.peak_visible,
            summary.peak_bytes / 1024
        );
        Ok(summary)
    }

    /// Drain in-flight meshing and release every stored mesh.
    pub fn shutdown(&mut self) -> Result<usize, AppError> {
        let released = self.planet.shutdown(&mut self.store)?;
        debug_assert!(self.store.is_empty());
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.lod.max_divisions = 6;
        config.lod.resolution = 8;
        config.lod.max_creations_per_frame = 4;
        config.terrain.planet_radius = 100.0;
        config.terrain.primary_amplitude = 4.0;
        config.terrain.secondary_amplitude = 2.0;
        config.jobs.worker_threads = 2;
        config.viewer.start = [0.0, 200.0, 0.0];
        config.viewer.end = [0.0, 104.0, 0.0];
        config.viewer.frames = 12;
        config.debug.report_interval = 0;
        config
    }

    #[test]
    fn test_load_config_applies_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let args = CliArgs {
            config: Some(dir.path().to_path_buf()),
            resolution: Some(12),
            ..Default::default()
        };
        let (config, config_dir) = load_config(&args).unwrap();
        assert_eq!(config_dir, dir.path());
        assert_eq!(config.lod.resolution, 12);
        assert!(dir.path().join(orbis_config::CONFIG_FILE).exists());
    }

    #[test]
    fn test_load_config_rejects_invalid_override() {
        let dir = tempfile::tempdir().unwrap();
        let args = CliArgs {
            config: Some(dir.path().to_path_buf()),
            creations_per_frame: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            load_config(&args),
            Err(AppError::Config(orbis_config::ConfigError::Invalid { .. }))
        ));
    }

    #[test]
    fn test_lod_params_follow_config() {
        let mut config = small_config();
        config.lod.trigger = TriggerShape::Sphere;
        let params = lod_params(&config);
        assert_eq!(params.max_divisions, 6);
        assert_eq!(params.resolution, 8);
        assert_eq!(params.trigger, SubdivisionTrigger::Sphere);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_orchestrator_config_follows_jobs() {
        let jobs = JobsConfig {
            wait_for_drain: false,
            frame_budget_ms: None,
            ..Default::default()
        };
        let config = orchestrator_config(&jobs);
        assert_eq!(config.gate, BatchGate::Immediate);
        assert_eq!(config.frame_budget, None);
        assert_eq!(
            orchestrator_config(&JobsConfig::default()).frame_budget,
            Some(Duration::from_millis(30))
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = small_config();
        config.lod.resolution = 0;
        assert!(matches!(Session::new(config), Err(AppError::Config(_))));
    }

    #[test]
    fn test_run_flies_and_cleans_up() {
        for mode in [FrameModeSetting::Blocking, FrameModeSetting::Pipelined] {
            let mut config = small_config();
            config.jobs.frame_mode = mode;
            let mut session = Session::new(config).unwrap();

            let summary = session.run().unwrap();
            assert_eq!(summary.frames, 12);
            assert!(summary.octets_created > 0);
            // Meshes applied during the flight or while draining at exit.
            assert!(summary.peak_bytes > 0);
            assert!(session.store().is_empty());
            assert_eq!(session.planet().stats().scheduled, 0);
        }
    }
}
