//! MLS-MPM fluid on a dense fixed-point grid.
//!
//! Lengths are in grid cells and boxes span `[0, box_size]`. The grid is
//! addressed with the dimensions of the box passed to the last reset, so
//! `change_box_size` may only shrink the walls inside that box.
//!
//! # Modules
//!
//! - [`p2g`]: mass/momentum scatter, then stress scatter
//! - [`grid_update`]: momentum to velocity, gravity and wall conditions
//! - [`g2p`]: velocity and affine matrix gather
//! - [`copy_position`]: advection and clamping

pub mod copy_position;
pub mod g2p;
pub mod grid_update;
pub mod p2g;

use bevy::log::{error, info, warn};
use bevy::math::Vec3;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::{Solver, SolverKind};
use crate::compute::ComputeBackend;
use crate::config::{MpmParams, WORKGROUP_SIZE};
use crate::core::{DamBreak, FixedPoint, MpmParticle, PosVel, PosVelBuffer};
use crate::error::SimulationError;
use crate::grid::MpmGrid;
use crate::math::Vector;

pub use copy_position::copy_position;
pub use g2p::grid_to_particle;
pub use grid_update::update_grid;
pub use p2g::{PARTICLE_MASS, particle_to_grid_mass_momentum, particle_to_grid_stress};

/// Gap between the initial fluid block and the walls, in cells.
const DAM_BREAK_MARGIN: f32 = 3.0;

pub struct MlsMpmSimulator {
    params: MpmParams,
    fixed: FixedPoint,
    backend: ComputeBackend,
    grid: MpmGrid,
    particles: Vec<MpmParticle>,
    num_particles: u32,
    init_box_size: Vec3,
    real_box_size: Vec3,
}

impl MlsMpmSimulator {
    pub fn new(params: MpmParams) -> Self {
        Self::with_backend(params, ComputeBackend::default())
    }

    pub fn with_backend(params: MpmParams, backend: ComputeBackend) -> Self {
        Self {
            fixed: FixedPoint::new(params.fixed_point_multiplier),
            grid: MpmGrid::with_capacity(params.max_grid_count()),
            particles: vec![MpmParticle::default(); params.max_particles as usize],
            num_particles: 0,
            init_box_size: Vec3::ZERO,
            real_box_size: Vec3::ZERO,
            params,
            backend,
        }
    }

    pub fn params(&self) -> &MpmParams {
        &self.params
    }

    pub fn backend(&self) -> &ComputeBackend {
        &self.backend
    }

    pub fn fixed_point(&self) -> FixedPoint {
        self.fixed
    }

    pub fn grid(&self) -> &MpmGrid {
        &self.grid
    }

    pub fn particles(&self) -> &[MpmParticle] {
        &self.particles[..self.num_particles as usize]
    }

    fn validate(&self, num_particles: u32, box_size: Vec3) -> Result<(), SimulationError> {
        if !box_size.is_finite() || box_size.cmple(Vec3::ZERO).any() {
            return Err(SimulationError::InvalidBoxSize(box_size));
        }
        if num_particles > self.params.max_particles {
            return Err(SimulationError::ParticleCapacityExceeded {
                requested: num_particles,
                capacity: self.params.max_particles,
            });
        }

        let required = box_size.ceil().as_uvec3().as_u64vec3().element_product();
        let capacity = self.grid.capacity() as u32;
        if required > capacity as u64 {
            return Err(SimulationError::GridCapacityExceeded {
                box_size,
                required,
                capacity,
            });
        }
        Ok(())
    }

    fn write_output(&self, output: &mut PosVelBuffer) {
        let particles = self.particles();
        let live = output.live_mut(particles.len());
        self.backend.dispatch_mut("mpm.write_output", live, WORKGROUP_SIZE, |i, record| {
            let particle = &particles[i as usize];
            *record = PosVel::new(particle.position, particle.velocity);
        });
    }
}

impl Solver for MlsMpmSimulator {
    fn kind(&self) -> SolverKind {
        SolverKind::MlsMpm
    }

    fn reset(&mut self, num_particles: u32, box_size: Vec3) -> Result<(), SimulationError> {
        self.validate(num_particles, box_size).inspect_err(|err| {
            error!("MLS-MPM reset refused: {err}");
        })?;

        let mut rng = StdRng::seed_from_u64(self.params.jitter_seed);
        let positions = DamBreak::new(self.params.rest_spacing())
            .with_margin(DAM_BREAK_MARGIN)
            .generate(Vector::ZERO, Vector::from(box_size), num_particles as usize, &mut rng);

        for (particle, position) in self.particles.iter_mut().zip(&positions) {
            *particle = MpmParticle::at_rest(*position);
        }
        self.num_particles = positions.len() as u32;
        self.grid.configure(box_size.ceil().as_uvec3());
        self.init_box_size = box_size;
        self.real_box_size = box_size;

        info!(
            "MLS-MPM reset: {} particles, box {}, grid {}",
            self.num_particles,
            box_size,
            self.grid.dims()
        );
        if self.num_particles < num_particles {
            warn!(
                "MLS-MPM dam break holds only {} of {} requested particles",
                self.num_particles, num_particles
            );
        }
        Ok(())
    }

    fn change_box_size(&mut self, real_box_size: Vec3) {
        if !real_box_size.is_finite() || real_box_size.cmple(Vec3::ZERO).any() {
            warn!("ignoring MLS-MPM box size {real_box_size}");
            return;
        }
        let clamped = real_box_size.min(self.init_box_size);
        if clamped != real_box_size {
            warn!("MLS-MPM box size {real_box_size} clamped to {clamped}");
        }
        self.real_box_size = clamped;
    }

    fn step(&mut self) {
        let n = self.num_particles as usize;
        if n == 0 {
            return;
        }
        let backend = &self.backend;
        let fixed = self.fixed;

        self.grid.clear(backend);
        particle_to_grid_mass_momentum(backend, fixed, &self.particles[..n], &self.grid);
        particle_to_grid_stress(backend, fixed, &self.params, &self.particles[..n], &self.grid);
        update_grid(backend, fixed, &self.params, self.real_box_size, &mut self.grid);
        grid_to_particle(
            backend,
            fixed,
            &self.params,
            self.real_box_size,
            &self.grid,
            &mut self.particles[..n],
        );
        copy_position(backend, &self.params, self.real_box_size, &mut self.particles[..n]);
    }

    fn compute(&mut self, output: &mut PosVelBuffer) {
        for _ in 0..self.params.substeps {
            self.step();
        }
        self.write_output(output);
    }

    fn num_particles(&self) -> u32 {
        self.num_particles
    }

    fn box_size(&self) -> Vec3 {
        self.init_box_size
    }

    fn real_box_size(&self) -> Vec3 {
        self.real_box_size
    }
}

#[cfg(test)]
mod tests {
    use bevy::math::UVec3;

    use super::*;

    fn simulator() -> MlsMpmSimulator {
        MlsMpmSimulator::new(MpmParams::default().with_max_particles(20_000))
    }

    #[test]
    fn reset_starts_at_rest_density() {
        let mut sim = simulator();
        sim.reset(5000, Vec3::new(40.0, 30.0, 60.0)).unwrap();

        assert_eq!(sim.num_particles(), 5000);
        assert_eq!(sim.grid().dims(), UVec3::new(40, 30, 60));
        assert!(sim.particles().iter().all(|p| p.position.cmpge(Vector::splat(3.0 - 0.1)).all()));

        let spacing = sim.params().rest_spacing();
        assert!((spacing.powi(3) * sim.params().rest_density - 1.0).abs() < 1e-4);
    }

    #[test]
    fn reset_refuses_grids_over_capacity() {
        let mut sim = MlsMpmSimulator::new(
            MpmParams::default()
                .with_max_particles(1000)
                .with_max_grid_dims(UVec3::splat(32)),
        );
        sim.reset(1000, Vec3::splat(20.0)).unwrap();
        let before = sim.particles().to_vec();

        let err = sim.reset(1000, Vec3::new(32.5, 32.0, 32.0)).unwrap_err();
        assert_eq!(
            err,
            SimulationError::GridCapacityExceeded {
                box_size: Vec3::new(32.5, 32.0, 32.0),
                required: 33 * 32 * 32,
                capacity: 32 * 32 * 32,
            }
        );
        assert!(sim.reset(1001, Vec3::splat(20.0)).is_err());

        assert_eq!(sim.particles(), &before[..]);
        assert_eq!(sim.box_size(), Vec3::splat(20.0));
        assert_eq!(sim.grid().dims(), UVec3::splat(20));
    }

    #[test]
    fn change_box_size_clamps_to_initial_box() {
        let mut sim = simulator();
        sim.reset(100, Vec3::new(40.0, 30.0, 60.0)).unwrap();
        sim.change_box_size(Vec3::new(50.0, 30.0, 20.0));
        assert_eq!(sim.real_box_size(), Vec3::new(40.0, 30.0, 20.0));
        assert_eq!(sim.box_size(), Vec3::new(40.0, 30.0, 60.0));
        sim.change_box_size(Vec3::new(-1.0, 30.0, 20.0));
        assert_eq!(sim.real_box_size(), Vec3::new(40.0, 30.0, 20.0));
    }

    #[test]
    fn particles_stay_in_box_and_fall() {
        let mut sim = simulator();
        let mut output = PosVelBuffer::with_capacity(20_000);
        sim.reset(4000, Vec3::new(32.0, 32.0, 32.0)).unwrap();
        let mean_height = |sim: &MlsMpmSimulator| {
            sim.particles().iter().map(|p| p.position.y).sum::<f32>() / sim.num_particles() as f32
        };
        let start = mean_height(&sim);

        for _ in 0..20 {
            sim.compute(&mut output);
        }

        assert_eq!(output.len(), 4000);
        assert!(mean_height(&sim) < start);
        for p in sim.particles() {
            assert!(p.position.is_finite());
            assert!(p.position.cmpge(Vector::ONE).all());
            assert!(p.position.cmple(Vector::splat(30.0)).all());
        }
    }
}
