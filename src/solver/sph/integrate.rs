//! Semi-implicit Euler step with box reflection.

use bevy::math::Vec3;

use crate::compute::ComputeBackend;
use crate::config::{SphParams, WORKGROUP_SIZE};
use crate::core::SphParticle;
use crate::math::{DIM, Vector};

/// Advances every particle with `a = force / density` and reflects it off the
/// walls of the box `[-half_extents, half_extents]`, keeping `restitution` of
/// the normal velocity. Particles without density are left alone.
pub fn integrate(
    backend: &ComputeBackend,
    params: &SphParams,
    half_extents: Vec3,
    particles: &mut [SphParticle],
) {
    let dt = params.dt;
    let restitution = params.restitution;
    let max = Vector::from(half_extents);
    let min = -max;

    backend.dispatch_mut("sph.integrate", particles, WORKGROUP_SIZE, |_, particle| {
        if particle.density <= 0.0 {
            return;
        }

        let acceleration = particle.force / particle.density;
        particle.velocity += dt * acceleration;
        particle.position += dt * particle.velocity;

        for axis in 0..DIM {
            if particle.position[axis] < min[axis] {
                particle.position[axis] = min[axis];
                particle.velocity[axis] *= -restitution;
            } else if particle.position[axis] > max[axis] {
                particle.position[axis] = max[axis];
                particle.velocity[axis] *= -restitution;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walls_reflect_and_damp() {
        let backend = ComputeBackend::default();
        let params = SphParams::default().with_gravity(Vec3::ZERO);
        let mut particles = vec![SphParticle {
            position: Vector::new(0.99, 0.0, -0.99),
            velocity: Vector::new(10.0, 0.0, -10.0),
            density: 1.0,
            ..Default::default()
        }];

        integrate(&backend, &params, Vec3::ONE, &mut particles);

        let p = particles[0];
        assert_eq!(p.position.x, 1.0);
        assert_eq!(p.position.z, -1.0);
        assert_eq!(p.velocity, Vector::new(-5.0, 0.0, 5.0));
    }

    #[test]
    fn empty_particles_do_not_move() {
        let backend = ComputeBackend::default();
        let params = SphParams::default();
        let resting = SphParticle::at_rest(Vector::new(0.1, 0.2, 0.3));
        let mut particles = vec![resting];
        integrate(&backend, &params, Vec3::ONE, &mut particles);
        assert_eq!(particles[0], resting);
    }
}
