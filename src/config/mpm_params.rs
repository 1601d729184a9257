use bevy::math::{UVec3, Vec3};
use bevy::prelude::*;

use super::constants::{DEFAULT_MAX_PARTICLES, FIXED_POINT_MULTIPLIER, SUBSTEPS_PER_FRAME};

/// Parameters for the MLS-MPM solver
///
/// Lengths are in grid cells; the grid spacing is one.
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct MpmParams {
    /// Equation of state stiffness
    pub stiffness: f32,
    pub rest_density: f32,
    pub dynamic_viscosity: f32,
    pub dt: f32,
    pub gravity: Vec3,
    pub fixed_point_multiplier: f32,
    pub substeps: u32,
    pub max_particles: u32,
    /// Largest grid the cell buffer is allocated for.
    pub max_grid_dims: UVec3,
    pub jitter_seed: u64,
}

impl Default for MpmParams {
    fn default() -> Self {
        Self {
            stiffness: 3.0,
            rest_density: 4.0,
            dynamic_viscosity: 0.1,
            dt: 0.2,
            gravity: Vec3::new(0.0, -0.3, 0.0),
            fixed_point_multiplier: FIXED_POINT_MULTIPLIER,
            substeps: SUBSTEPS_PER_FRAME,
            max_particles: DEFAULT_MAX_PARTICLES,
            max_grid_dims: UVec3::splat(64),
            jitter_seed: 0x5eed,
        }
    }
}

impl MpmParams {
    pub fn max_grid_count(&self) -> u32 {
        self.max_grid_dims.x * self.max_grid_dims.y * self.max_grid_dims.z
    }

    /// Lattice spacing that puts the initial fluid at rest density.
    pub fn rest_spacing(&self) -> f32 {
        self.rest_density.recip().cbrt()
    }

    pub fn with_max_particles(mut self, max_particles: u32) -> Self {
        self.max_particles = max_particles;
        self
    }

    pub fn with_max_grid_dims(mut self, dims: UVec3) -> Self {
        self.max_grid_dims = dims;
        self
    }

    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_stiffness(mut self, stiffness: f32) -> Self {
        self.stiffness = stiffness.max(0.0);
        self
    }

    pub fn with_jitter_seed(mut self, seed: u64) -> Self {
        self.jitter_seed = seed;
        self
    }
}
