//! Pressure, near-pressure, viscosity and gravity force densities.

use crate::compute::ComputeBackend;
use crate::config::{SphParams, WORKGROUP_SIZE};
use crate::core::{SphKernels, SphParticle};
use crate::grid::SpatialGrid;
use crate::math::{Real, Vector, zero_vector};

const MIN_SEPARATION_SQ: Real = 1e-12;

pub fn compute_force(
    backend: &ComputeBackend,
    params: &SphParams,
    kernels: &SphKernels,
    grid: &SpatialGrid,
    sorted: &[SphParticle],
    particles: &mut [SphParticle],
) {
    let mass = params.mass;
    let gravity = Vector::from(params.gravity);
    let pressure_of = |density: Real| params.stiffness * (density - params.rest_density);
    let near_pressure_of = |near_density: Real| params.near_stiffness * near_density;

    backend.dispatch_mut("sph.force", particles, WORKGROUP_SIZE, |i, particle| {
        let position = particle.position;
        let own_slot = grid.sorted_index(i as usize, position);
        let pressure = pressure_of(particle.density);
        let near_pressure = near_pressure_of(particle.near_density);

        let mut pressure_force = zero_vector();
        let mut viscosity_force = zero_vector();

        grid.for_each_neighbor_cell(position, |range| {
            for (slot, other) in range.clone().zip(&sorted[range]) {
                if slot == own_slot {
                    continue;
                }
                let r = other.position - position;
                let r_sq = r.length_squared();
                if r_sq >= kernels.h2 || r_sq < MIN_SEPARATION_SQ {
                    continue;
                }

                let distance = r_sq.sqrt();
                let direction = r / distance;
                let gradient = kernels.spiky_gradient(distance);

                if other.density > 0.0 {
                    let shared = (pressure + pressure_of(other.density)) * 0.5;
                    pressure_force -= direction * (mass * shared / other.density * gradient);
                    viscosity_force += (other.velocity - particle.velocity)
                        * (mass / other.density * kernels.poly6(r_sq));
                }
                if other.near_density > 0.0 {
                    let shared = (near_pressure + near_pressure_of(other.near_density)) * 0.5;
                    pressure_force -= direction * (mass * shared / other.near_density * gradient);
                }
            }
        });

        particle.force =
            pressure_force + params.viscosity * viscosity_force + particle.density * gravity;
    });
}
