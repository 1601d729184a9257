use bevy::math::Vec3;

use crate::compute::ComputeBackend;
use crate::config::{MpmParams, WORKGROUP_SIZE};
use crate::core::MpmParticle;
use crate::math::Vector;

/// Advects particles and keeps them at least one cell inside the grid and
/// two cells inside the upper walls of `real_box_size`.
pub fn copy_position(
    backend: &ComputeBackend,
    params: &MpmParams,
    real_box_size: Vec3,
    particles: &mut [MpmParticle],
) {
    let dt = params.dt;
    let lower = Vector::ONE;
    let upper = (Vector::from(real_box_size) - 2.0).max(lower);

    backend.dispatch_mut("mpm.copy_position", particles, WORKGROUP_SIZE, |_, particle| {
        particle.position += dt * particle.velocity;
        particle.position = particle.position.max(lower).min(upper);
    });
}
