use bevy::math::Vec3;
use bevy::prelude::*;

use super::constants::{DEFAULT_MAX_PARTICLES, SUBSTEPS_PER_FRAME};

/// Parameters for the grid-accelerated SPH solver
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct SphParams {
    /// Smoothing length `h`; also the spatial grid cell size.
    pub kernel_radius: f32,
    pub mass: f32,
    pub stiffness: f32,
    /// Stiffness of the near-pressure (double density relaxation) term.
    pub near_stiffness: f32,
    pub rest_density: f32,
    pub viscosity: f32,
    pub dt: f32,
    pub gravity: Vec3,
    /// Fraction of the normal velocity kept after hitting a wall.
    pub restitution: f32,
    pub substeps: u32,
    pub max_particles: u32,
    /// Cell count the grid buffers are allocated for.
    pub max_grid_count: u32,
    pub jitter_seed: u64,
}

impl Default for SphParams {
    fn default() -> Self {
        Self {
            kernel_radius: 0.07,
            mass: 1.0,
            stiffness: 20.0,
            near_stiffness: 1.0,
            rest_density: 15_000.0,
            viscosity: 100.0,
            dt: 0.006,
            gravity: Vec3::new(0.0, -9.8, 0.0),
            restitution: 0.5,
            substeps: SUBSTEPS_PER_FRAME,
            max_particles: DEFAULT_MAX_PARTICLES,
            max_grid_count: 1 << 18,
            jitter_seed: 0x5eed,
        }
    }
}

impl SphParams {
    pub fn with_max_particles(mut self, max_particles: u32) -> Self {
        self.max_particles = max_particles;
        self
    }

    pub fn with_max_grid_count(mut self, max_grid_count: u32) -> Self {
        self.max_grid_count = max_grid_count;
        self
    }

    pub fn with_kernel_radius(mut self, kernel_radius: f32) -> Self {
        self.kernel_radius = kernel_radius;
        self
    }

    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_dt(mut self, dt: f32) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_jitter_seed(mut self, seed: u64) -> Self {
        self.jitter_seed = seed;
        self
    }
}
