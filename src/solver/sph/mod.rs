//! Grid-accelerated SPH with double density relaxation.
//!
//! Boxes passed to [`SphSimulator`] are half extents of a box centred on the
//! origin.

pub mod density;
pub mod force;
pub mod integrate;

use bevy::log::{error, info, warn};
use bevy::math::Vec3;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::{Solver, SolverKind};
use crate::compute::ComputeBackend;
use crate::config::{SphParams, WORKGROUP_SIZE};
use crate::core::{DamBreak, PosVel, PosVelBuffer, SphKernels, SphParticle};
use crate::error::SimulationError;
use crate::grid::{SpatialGrid, SphEnvironment};
use crate::math::Vector;

pub use density::compute_density;
pub use force::compute_force;
pub use integrate::integrate;

pub struct SphSimulator {
    params: SphParams,
    kernels: SphKernels,
    backend: ComputeBackend,
    grid: SpatialGrid,
    particles: Vec<SphParticle>,
    sorted: Vec<SphParticle>,
    num_particles: u32,
    box_size: Vec3,
    real_box_size: Vec3,
}

impl SphSimulator {
    pub fn new(params: SphParams) -> Result<Self, SimulationError> {
        Self::with_backend(params, ComputeBackend::default())
    }

    /// Allocates every buffer for `params.max_particles` particles and
    /// `params.max_grid_count` cells. The simulator starts empty.
    pub fn with_backend(params: SphParams, backend: ComputeBackend) -> Result<Self, SimulationError> {
        let h = params.kernel_radius;
        let box_size = Vec3::splat(h);
        let environment = SphEnvironment::new(box_size, h);
        let grid = SpatialGrid::new(&backend, environment, params.max_grid_count, params.max_particles)?;
        let capacity = params.max_particles as usize;

        Ok(Self {
            kernels: SphKernels::new(h),
            grid,
            particles: vec![SphParticle::default(); capacity],
            sorted: vec![SphParticle::default(); capacity],
            num_particles: 0,
            box_size,
            real_box_size: box_size,
            params,
            backend,
        })
    }

    pub fn params(&self) -> &SphParams {
        &self.params
    }

    pub fn backend(&self) -> &ComputeBackend {
        &self.backend
    }

    pub fn environment(&self) -> &SphEnvironment {
        self.grid.environment()
    }

    /// Live particles in their original order.
    pub fn particles(&self) -> &[SphParticle] {
        &self.particles[..self.num_particles as usize]
    }

    /// Spacing of the initial lattice.
    pub fn lattice_spacing(&self) -> f32 {
        0.5 * self.params.kernel_radius
    }

    fn validate(&self, num_particles: u32, box_size: Vec3) -> Result<SphEnvironment, SimulationError> {
        if !box_size.is_finite() || box_size.cmple(Vec3::ZERO).any() {
            return Err(SimulationError::InvalidBoxSize(box_size));
        }
        if num_particles > self.params.max_particles {
            return Err(SimulationError::ParticleCapacityExceeded {
                requested: num_particles,
                capacity: self.params.max_particles,
            });
        }

        let environment = SphEnvironment::new(box_size, self.params.kernel_radius);
        if environment.cell_count() > self.grid.cell_capacity() as u64 {
            return Err(SimulationError::GridCapacityExceeded {
                box_size,
                required: environment.cell_count(),
                capacity: self.grid.cell_capacity() as u32,
            });
        }
        Ok(environment)
    }

    fn write_output(&self, output: &mut PosVelBuffer) {
        let particles = self.particles();
        let live = output.live_mut(particles.len());
        self.backend.dispatch_mut("sph.copy_position", live, WORKGROUP_SIZE, |i, record| {
            let particle = &particles[i as usize];
            *record = PosVel::new(particle.position, particle.velocity);
        });
    }
}

impl Solver for SphSimulator {
    fn kind(&self) -> SolverKind {
        SolverKind::Sph
    }

    fn reset(&mut self, num_particles: u32, box_size: Vec3) -> Result<(), SimulationError> {
        let environment = self.validate(num_particles, box_size).inspect_err(|err| {
            error!("SPH reset refused: {err}");
        })?;

        let mut rng = StdRng::seed_from_u64(self.params.jitter_seed);
        let half = Vector::from(box_size);
        let positions = DamBreak::new(self.lattice_spacing()).generate(
            -half,
            half,
            num_particles as usize,
            &mut rng,
        );

        for (particle, position) in self.particles.iter_mut().zip(&positions) {
            *particle = SphParticle::at_rest(*position);
        }
        self.num_particles = positions.len() as u32;
        self.grid.configure(&self.backend, environment);
        self.box_size = box_size;
        self.real_box_size = box_size;

        info!(
            "SPH reset: {} particles, box half extents {}, grid {}",
            self.num_particles,
            box_size,
            environment.dims()
        );
        if self.num_particles < num_particles {
            warn!(
                "SPH dam break holds only {} of {} requested particles",
                self.num_particles, num_particles
            );
        }
        Ok(())
    }

    fn change_box_size(&mut self, real_box_size: Vec3) {
        if !real_box_size.is_finite() || real_box_size.cmple(Vec3::ZERO).any() {
            warn!("ignoring SPH box size {real_box_size}");
            return;
        }
        let clamped = real_box_size.min(self.box_size);
        if clamped != real_box_size {
            warn!("SPH box size {real_box_size} clamped to {clamped}");
        }
        self.real_box_size = clamped;
    }

    fn step(&mut self) {
        let n = self.num_particles as usize;
        if n == 0 {
            return;
        }
        let backend = &self.backend;

        self.grid.clear(backend);
        self.grid.build(backend, &self.particles[..n]);
        if let Err(err) = self.grid.scan(backend) {
            error!("SPH substep skipped: {err}");
            return;
        }
        self.grid.reorder(backend, &self.particles[..n], &mut self.sorted[..n]);

        compute_density(
            backend,
            &self.params,
            &self.kernels,
            &self.grid,
            &self.sorted[..n],
            &mut self.particles[..n],
        );
        // Sorted copy picks up the new densities.
        self.grid.reorder(backend, &self.particles[..n], &mut self.sorted[..n]);
        compute_force(
            backend,
            &self.params,
            &self.kernels,
            &self.grid,
            &self.sorted[..n],
            &mut self.particles[..n],
        );

        integrate(backend, &self.params, self.real_box_size, &mut self.particles[..n]);
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
        self.box_size
    }

    fn real_box_size(&self) -> Vec3 {
        self.real_box_size
    }
}
