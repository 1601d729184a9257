use bevy::math::Vec3;

use crate::compute::ComputeBackend;
use crate::config::{MpmParams, WORKGROUP_SIZE};
use crate::core::FixedPoint;
use crate::grid::{MpmGrid, node_of};
use crate::math::{DIM, Vector};

/// Nodes this close to a wall have their normal velocity removed.
const WALL_CELLS: i32 = 2;

/// Turns node momentum into velocity, adds gravity and sticks the normal
/// velocity of nodes next to the `real_box_size` walls. Empty nodes are
/// skipped.
pub fn update_grid(
    backend: &ComputeBackend,
    fixed: FixedPoint,
    params: &MpmParams,
    real_box_size: Vec3,
    grid: &mut MpmGrid,
) {
    let dims = grid.dims();
    let gravity = Vector::from(params.gravity) * params.dt;
    let upper = real_box_size.ceil().as_ivec3() - (WALL_CELLS + 1);

    backend.dispatch_mut("mpm.update_grid", grid.cells_mut(), WORKGROUP_SIZE, |index, cell| {
        if *cell.mass.get_mut() <= 0 {
            return;
        }

        let mass = fixed.decode(*cell.mass.get_mut());
        let mut velocity = cell.momentum(fixed) / mass + gravity;

        let node = node_of(dims, index as usize);
        for axis in 0..DIM {
            if node[axis] < WALL_CELLS || node[axis] > upper[axis] {
                velocity[axis] = 0.0;
            }
        }
        cell.store_velocity(fixed, velocity);
    });
}

#[cfg(test)]
mod tests {
    use bevy::math::{IVec3, UVec3};

    use super::*;

    #[test]
    fn velocity_solve_and_walls() {
        let backend = ComputeBackend::default();
        let fixed = FixedPoint::default();
        let params = MpmParams::default();
        let mut grid = MpmGrid::with_capacity(20 * 20 * 20);
        grid.configure(UVec3::splat(20));

        let inner = grid.index(IVec3::new(10, 10, 10)).unwrap();
        let near_floor = grid.index(IVec3::new(10, 1, 10)).unwrap();
        let near_resized_wall = grid.index(IVec3::new(10, 10, 13)).unwrap();
        for index in [inner, near_floor, near_resized_wall] {
            grid.cell(index).add_mass(fixed, 2.0);
            grid.cell(index).add_momentum(fixed, Vector::new(1.0, 1.0, 1.0));
        }

        update_grid(&backend, fixed, &params, Vec3::new(20.0, 20.0, 15.5), &mut grid);

        let g = params.gravity.y * params.dt;
        let v = grid.cell(inner).momentum(fixed);
        assert!((v - Vector::new(0.5, 0.5 + g, 0.5)).abs().max_element() < 1e-6);
        assert_eq!(grid.cell(near_floor).momentum(fixed).y, 0.0);
        // ceil(15.5) - 3 = 13 is still inside.
        assert!(grid.cell(near_resized_wall).momentum(fixed).z > 0.0);

        let empty = grid.index(IVec3::new(5, 5, 5)).unwrap();
        assert_eq!(grid.cell(empty).momentum(fixed), Vector::ZERO);
    }

    #[test]
    fn resized_wall_stops_normal_velocity() {
        let backend = ComputeBackend::default();
        let fixed = FixedPoint::default();
        let params = MpmParams::default();
        let mut grid = MpmGrid::with_capacity(20 * 20 * 20);
        grid.configure(UVec3::splat(20));

        let beyond = grid.index(IVec3::new(10, 10, 14)).unwrap();
        grid.cell(beyond).add_mass(fixed, 1.0);
        grid.cell(beyond).add_momentum(fixed, Vector::new(0.0, 0.0, 0.8));

        update_grid(&backend, fixed, &params, Vec3::new(20.0, 20.0, 15.5), &mut grid);
        assert_eq!(grid.cell(beyond).momentum(fixed).z, 0.0);
    }
}
