//! Procedural planet terrain: a deterministic solid/air density field driven by
//! domain-warped coherent noise.

mod density;
mod noise_source;

pub use density::{DensityField, DensityParams, Voxel};
pub use noise_source::{NoiseSource, SimplexNoise, ZeroNoise};
