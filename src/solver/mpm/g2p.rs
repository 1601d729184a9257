//! Grid-to-Particle (G2P) transfer with soft wall correction.

use bevy::math::Vec3;

use crate::compute::ComputeBackend;
use crate::config::{MpmParams, WORKGROUP_SIZE};
use crate::core::{BSplineStencil, FixedPoint, MpmParticle, inv_d};
use crate::grid::MpmGrid;
use crate::math::{DIM, Real, Vector, outer_product, zero_matrix, zero_vector};

/// Look-ahead, in timesteps, used to predict wall penetration.
const WALL_LOOKAHEAD: Real = 3.0;
const WALL_STIFFNESS: Real = 0.3;
const WALL_MIN: Real = 3.0;
/// Soft upper wall sits this many cells inside the real box.
const WALL_MAX_INSET: Real = 4.0;

pub fn grid_to_particle(
    backend: &ComputeBackend,
    fixed: FixedPoint,
    params: &MpmParams,
    real_box_size: Vec3,
    grid: &MpmGrid,
    particles: &mut [MpmParticle],
) {
    let dt = params.dt;
    let apic_scale = inv_d(1.0);
    let wall_min = Vector::splat(WALL_MIN);
    let wall_max = Vector::from(real_box_size) - WALL_MAX_INSET;

    backend.dispatch_mut("mpm.g2p", particles, WORKGROUP_SIZE, |_, particle| {
        let stencil = BSplineStencil::for_position(particle.position);

        let mut velocity = zero_vector();
        let mut b = zero_matrix();
        for (node, weight, distance) in stencil.iter_nodes() {
            let Some(index) = grid.index(node) else {
                continue;
            };
            let weighted_velocity = weight * grid.cell(index).momentum(fixed);
            b += outer_product(weighted_velocity, distance);
            velocity += weighted_velocity;
        }

        particle.c = b * apic_scale;

        let predicted = particle.position + velocity * (dt * WALL_LOOKAHEAD);
        for axis in 0..DIM {
            if predicted[axis] < wall_min[axis] {
                velocity[axis] += WALL_STIFFNESS * (wall_min[axis] - predicted[axis]);
            }
            if predicted[axis] > wall_max[axis] {
                velocity[axis] += WALL_STIFFNESS * (wall_max[axis] - predicted[axis]);
            }
        }
        particle.velocity = velocity;
    });
}
