//! Dense MLS-MPM grid addressed directly by node coordinate.

use std::sync::atomic::Ordering;

use bevy::math::{IVec3, UVec3};

use crate::compute::ComputeBackend;
use crate::config::WORKGROUP_SIZE;
use crate::core::{FixedPoint, FixedPointCell};
use crate::math::Real;

pub struct MpmGrid {
    cells: Vec<FixedPointCell>,
    dims: UVec3,
}

impl MpmGrid {
    pub fn with_capacity(max_cells: u32) -> Self {
        Self {
            cells: (0..max_cells).map(|_| FixedPointCell::default()).collect(),
            dims: UVec3::ZERO,
        }
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Sets the addressed node block. The caller checks it fits the capacity.
    pub fn configure(&mut self, dims: UVec3) {
        debug_assert!(dims.as_u64vec3().element_product() <= self.cells.len() as u64);
        self.dims = dims;
    }

    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    pub fn cell_count(&self) -> usize {
        self.dims.as_u64vec3().element_product() as usize
    }

    /// Linear index of `node`, or `None` outside the grid.
    #[inline]
    pub fn index(&self, node: IVec3) -> Option<usize> {
        if node.cmplt(IVec3::ZERO).any() || node.as_uvec3().cmpge(self.dims).any() {
            return None;
        }
        let (y, z) = (self.dims.y as usize, self.dims.z as usize);
        Some(node.x as usize * y * z + node.y as usize * z + node.z as usize)
    }

    /// Node coordinate of a linear index.
    #[inline]
    pub fn node(&self, index: usize) -> IVec3 {
        node_of(self.dims, index)
    }

    #[inline]
    pub fn cell(&self, index: usize) -> &FixedPointCell {
        &self.cells[index]
    }

    pub fn cells(&self) -> &[FixedPointCell] {
        &self.cells[..self.cell_count()]
    }

    pub fn cells_mut(&mut self) -> &mut [FixedPointCell] {
        let count = self.cell_count();
        &mut self.cells[..count]
    }

    pub fn clear(&mut self, backend: &ComputeBackend) {
        backend.dispatch_mut("mpm.clear_grid", self.cells_mut(), WORKGROUP_SIZE, |_, cell| {
            cell.clear()
        });
    }

    /// Sum of node masses, accumulated in integers before decoding.
    pub fn total_mass(&self, fixed: FixedPoint) -> Real {
        let raw: i64 = self
            .cells()
            .iter()
            .map(|cell| cell.mass.load(Ordering::Relaxed) as i64)
            .sum();
        (raw as f64 / fixed.multiplier as f64) as Real
    }
}

/// Node coordinate of linear index `index` in a grid of `dims` nodes.
#[inline]
pub fn node_of(dims: UVec3, index: usize) -> IVec3 {
    let (y, z) = (dims.y as usize, dims.z as usize);
    IVec3::new((index / (y * z)) as i32, ((index / z) % y) as i32, (index % z) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_is_x_major_and_bounded() {
        let mut grid = MpmGrid::with_capacity(64 * 64 * 64);
        grid.configure(UVec3::new(40, 30, 60));

        assert_eq!(grid.cell_count(), 40 * 30 * 60);
        assert_eq!(grid.index(IVec3::new(0, 0, 1)), Some(1));
        assert_eq!(grid.index(IVec3::new(0, 1, 0)), Some(60));
        assert_eq!(grid.index(IVec3::new(1, 0, 0)), Some(30 * 60));
        assert_eq!(grid.index(IVec3::new(40, 0, 0)), None);
        assert_eq!(grid.index(IVec3::new(0, -1, 0)), None);

        let node = IVec3::new(17, 29, 3);
        assert_eq!(grid.node(grid.index(node).unwrap()), node);
    }

    #[test]
    fn clear_resets_live_cells() {
        let backend = ComputeBackend::default();
        let fixed = FixedPoint::default();
        let mut grid = MpmGrid::with_capacity(1000);
        grid.configure(UVec3::splat(10));
        grid.cell(123).add_mass(fixed, 1.5);
        assert!(grid.total_mass(fixed) > 1.4);

        grid.clear(&backend);
        assert_eq!(grid.total_mass(fixed), 0.0);
    }
}
