//! Particle-to-Grid (P2G) transfer
//!
//! Two passes over the particles. The first scatters mass and APIC momentum.
//! The second reads the node masses back to estimate each particle's
//! density and scatters the momentum change from its stress.

use crate::compute::ComputeBackend;
use crate::config::{MpmParams, WORKGROUP_SIZE};
use crate::core::{BSplineStencil, FixedPoint, MpmParticle, inv_d};
use crate::grid::MpmGrid;
use crate::math::{Real, diagonal_from_value, symmetric_sum};

/// All particles carry unit mass.
pub const PARTICLE_MASS: Real = 1.0;

pub fn particle_to_grid_mass_momentum(
    backend: &ComputeBackend,
    fixed: FixedPoint,
    particles: &[MpmParticle],
    grid: &MpmGrid,
) {
    backend.dispatch("mpm.p2g_1", particles.len() as u32, WORKGROUP_SIZE, |i| {
        let particle = &particles[i as usize];
        let stencil = BSplineStencil::for_position(particle.position);

        for (node, weight, distance) in stencil.iter_nodes() {
            let Some(index) = grid.index(node) else {
                continue;
            };
            let q = particle.c * distance;
            let mass_contribution = weight * PARTICLE_MASS;

            let cell = grid.cell(index);
            cell.add_mass(fixed, mass_contribution);
            cell.add_momentum(fixed, mass_contribution * (particle.velocity + q));
        }
    });
}

pub fn particle_to_grid_stress(
    backend: &ComputeBackend,
    fixed: FixedPoint,
    params: &MpmParams,
    particles: &[MpmParticle],
    grid: &MpmGrid,
) {
    let scale = inv_d(1.0) * params.dt;

    backend.dispatch("mpm.p2g_2", particles.len() as u32, WORKGROUP_SIZE, |i| {
        let particle = &particles[i as usize];
        let stencil = BSplineStencil::for_position(particle.position);

        let mut density = 0.0;
        for (node, weight, _) in stencil.iter_nodes() {
            if let Some(index) = grid.index(node) {
                density += grid.cell(index).mass(fixed) * weight;
            }
        }
        if density <= 0.0 {
            return;
        }

        let volume = PARTICLE_MASS / density;
        let pressure = (params.stiffness * (density - params.rest_density)).max(0.0);
        let stress = diagonal_from_value(-pressure) + symmetric_sum(&particle.c) * params.dynamic_viscosity;
        let term = stress * (-volume * scale);

        for (node, weight, distance) in stencil.iter_nodes() {
            if let Some(index) = grid.index(node) {
                grid.cell(index).add_momentum(fixed, weight * (term * distance));
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use bevy::math::UVec3;

    use super::*;
    use crate::math::Vector;

    #[test]
    fn mass_is_conserved_up_to_truncation() {
        let backend = ComputeBackend::default();
        let fixed = FixedPoint::default();
        let mut grid = MpmGrid::with_capacity(16 * 16 * 16);
        grid.configure(UVec3::splat(16));

        let particles: Vec<MpmParticle> = (0..500)
            .map(|i| {
                let t = i as Real * 0.37;
                MpmParticle {
                    position: Vector::new(4.0 + t % 7.0, 3.0 + (t * 1.3) % 9.0, 5.0 + (t * 0.7) % 6.0),
                    velocity: Vector::new(0.1, -0.2, 0.05),
                    ..Default::default()
                }
            })
            .collect();

        particle_to_grid_mass_momentum(&backend, fixed, &particles, &grid);

        let total = grid.total_mass(fixed);
        let bound = 27.0 * particles.len() as Real * fixed.resolution();
        assert!((total - particles.len() as Real).abs() <= bound + 1e-3);
    }
}
