//! Density and near density of every particle.

use crate::compute::ComputeBackend;
use crate::config::{SphParams, WORKGROUP_SIZE};
use crate::core::{SphKernels, SphParticle};
use crate::grid::SpatialGrid;

/// Sums poly6 density and spiky near density over the neighbours found in
/// the cell-sorted copy `sorted`, writing into `particles` in original order.
/// The particle itself contributes to both sums.
pub fn compute_density(
    backend: &ComputeBackend,
    params: &SphParams,
    kernels: &SphKernels,
    grid: &SpatialGrid,
    sorted: &[SphParticle],
    particles: &mut [SphParticle],
) {
    let mass = params.mass;
    backend.dispatch_mut("sph.density", particles, WORKGROUP_SIZE, |_, particle| {
        let position = particle.position;
        let mut density = 0.0;
        let mut near_density = 0.0;

        grid.for_each_neighbor_cell(position, |range| {
            for other in &sorted[range] {
                let r_sq = position.distance_squared(other.position);
                if r_sq >= kernels.h2 {
                    continue;
                }
                density += mass * kernels.poly6(r_sq);
                near_density += mass * kernels.spiky(r_sq.sqrt());
            }
        });

        particle.density = density;
        particle.near_density = near_density;
    });
}
