//! Solid/air classification for any world coordinate.
//!
//! The field is the signed distance to a sphere, distorted by two noise
//! octaves where the first octave picks the sampling frequency of the second
//! (domain warp). It carries no per-region state, so every region that samples
//! a given coordinate gets the same answer and neighbouring meshes line up.

use glam::DVec3;

use crate::noise_source::{NoiseSource, SimplexNoise};

/// Classification of a single voxel sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Voxel {
    /// Inside the terrain.
    Solid,
    /// Outside the terrain.
    Air,
}

impl Voxel {
    /// Returns `true` for [`Voxel::Solid`].
    #[inline]
    pub fn is_solid(self) -> bool {
        matches!(self, Self::Solid)
    }
}

/// Shape parameters of the planet density field.
#[derive(Clone, Debug, PartialEq)]
pub struct DensityParams {
    /// World-space centre of the planet.
    pub planet_center: DVec3,
    /// Radius of the undistorted sphere in world units.
    pub planet_radius: f64,
    /// Frequency of the first octave.
    pub base_frequency: f64,
    /// Second-octave frequency when the first octave reads -1.
    pub warp_min_frequency: f64,
    /// Second-octave frequency when the first octave reads +1.
    pub warp_max_frequency: f64,
    /// Offset added to the sample point before the second octave.
    pub warp_offset: DVec3,
    /// Weight of the first octave in the distortion.
    pub primary_amplitude: f64,
    /// Weight of the second octave in the distortion.
    pub secondary_amplitude: f64,
}

impl Default for DensityParams {
    fn default() -> Self {
        Self {
            planet_center: DVec3::ZERO,
            planet_radius: 2000.0,
            base_frequency: 0.005,
            warp_min_frequency: 0.000_25,
            warp_max_frequency: 0.0025,
            warp_offset: DVec3::new(10.0, 0.0, 0.0),
            primary_amplitude: 100.0,
            secondary_amplitude: 1.0,
        }
    }
}

impl DensityParams {
    /// A perfect sphere: no noise contributes to the surface.
    pub fn sphere(planet_center: DVec3, planet_radius: f64) -> Self {
        Self {
            planet_center,
            planet_radius,
            primary_amplitude: 0.0,
            secondary_amplitude: 0.0,
            ..Default::default()
        }
    }
}

/// Deterministic planet density field.
pub struct DensityField<N = SimplexNoise> {
    params: DensityParams,
    noise: N,
}

impl<N: NoiseSource> DensityField<N> {
    /// Create a field from shape parameters and a noise oracle.
    pub fn new(params: DensityParams, noise: N) -> Self {
        Self { params, noise }
    }

    /// Shape parameters.
    pub fn params(&self) -> &DensityParams {
        &self.params
    }

    /// Noise contribution at `p` (before it is added to the sphere distance).
    pub fn distortion(&self, p: DVec3) -> f64 {
        let params = &self.params;
        let n1 = self.noise.sample(params.base_frequency, p);

        // Remap the first octave to [0, 1] and use it to pick the frequency of
        // the second one.
        let t = ((n1 + 1.0) * 0.5).clamp(0.0, 1.0);
        let warp_frequency =
            params.warp_min_frequency + (params.warp_max_frequency - params.warp_min_frequency) * t;
        let n2 = self.noise.sample(warp_frequency, p + params.warp_offset);

        (n1 * params.primary_amplitude + n2 * params.secondary_amplitude) * 0.5
    }

    /// Signed density: positive above the surface, zero or negative inside.
    pub fn density(&self, p: DVec3) -> f64 {
        let base_distance = p.distance(self.params.planet_center) - self.params.planet_radius;
        base_distance + self.distortion(p)
    }

    /// Classify a world coordinate.
    #[inline]
    pub fn classify(&self, p: DVec3) -> Voxel {
        if self.density(p) > 0.0 {
            Voxel::Air
        } else {
            Voxel::Solid
        }
    }

    /// Shorthand for `classify(p) == Voxel::Air`.
    #[inline]
    pub fn is_air(&self, p: DVec3) -> bool {
        self.classify(p) == Voxel::Air
    }
}
