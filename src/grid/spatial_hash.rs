//! Uniform-grid counting sort for SPH neighbour search.
//!
//! Every substep runs Clear → Build → Scan → Reorder. Build records each
//! particle's rank within its cell, the scan turns per-cell counts into start
//! offsets, and Reorder scatters particle `i` to `offset[cell(i)] + rank[i]`.
//! The cell counter buffer carries one sentinel slot past the last cell so
//! that after the scan `cell_range(c)` is `offset[c]..offset[c + 1]` for
//! every cell, and the sentinel holds the particle count.

use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};

use bevy::math::{IVec3, UVec3, Vec3};
use bytemuck::{Pod, Zeroable};

use crate::compute::{ComputeBackend, PrefixSum, ScanConfig, read_buffer, storage_buffer};
use crate::config::WORKGROUP_SIZE;
use crate::core::SphParticle;
use crate::error::ScanError;
use crate::math::{Real, Vector};

/// Grid uniform: cell counts per axis, cell size, box half extents and the
/// margin added on each side of the box.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SphEnvironment {
    pub grids: [u32; 3],
    pub cell_size: f32,
    pub half_extents: [f32; 3],
    pub offset: f32,
}

impl SphEnvironment {
    pub fn new(half_extents: Vec3, cell_size: Real) -> Self {
        let offset = cell_size;
        let grids = ((2.0 * half_extents + 2.0 * offset) / cell_size).ceil().as_uvec3();
        Self {
            grids: grids.max(UVec3::ONE).to_array(),
            cell_size,
            half_extents: half_extents.to_array(),
            offset,
        }
    }

    pub fn dims(&self) -> UVec3 {
        UVec3::from_array(self.grids)
    }

    pub fn half_extents(&self) -> Vec3 {
        Vec3::from_array(self.half_extents)
    }

    pub fn cell_count(&self) -> u64 {
        let [x, y, z] = self.grids;
        x as u64 * y as u64 * z as u64
    }

    /// Cell containing `position`, clamped into the grid.
    #[inline]
    pub fn cell_coord(&self, position: Vector) -> IVec3 {
        let shifted = position + Vector::from(self.half_extents()) + Vector::splat(self.offset);
        let max = self.dims().as_ivec3() - IVec3::ONE;
        (shifted / self.cell_size).floor().as_ivec3().clamp(IVec3::ZERO, max)
    }

    #[inline]
    pub fn contains(&self, coord: IVec3) -> bool {
        coord.cmpge(IVec3::ZERO).all() && coord.cmplt(self.dims().as_ivec3()).all()
    }

    /// Linear id, x fastest.
    #[inline]
    pub fn cell_id(&self, coord: IVec3) -> u32 {
        let [x, y, _] = self.grids;
        coord.x as u32 + x * (coord.y as u32 + y * coord.z as u32)
    }

    #[inline]
    pub fn cell_of(&self, position: Vector) -> u32 {
        self.cell_id(self.cell_coord(position))
    }
}

/// Anything the grid can bucket.
pub trait GridParticle {
    fn position(&self) -> Vector;
}

impl GridParticle for SphParticle {
    #[inline(always)]
    fn position(&self) -> Vector {
        self.position
    }
}

impl GridParticle for Vector {
    #[inline(always)]
    fn position(&self) -> Vector {
        *self
    }
}

static NEIGHBOR_OFFSETS: [IVec3; 27] = {
    let mut offsets = [IVec3::ZERO; 27];
    let mut i = 0;
    while i < 27 {
        offsets[i] = IVec3::new(i as i32 / 9 - 1, (i as i32 / 3) % 3 - 1, i as i32 % 3 - 1);
        i += 1;
    }
    offsets
};

pub struct SpatialGrid {
    environment: SphEnvironment,
    /// Counts after Build, start offsets after Scan.
    cell_counts: Vec<AtomicU32>,
    ranks: Vec<u32>,
    /// Source index for every sorted slot, filled by Reorder.
    permutation: Vec<AtomicU32>,
    scan: PrefixSum,
    live_cells: usize,
}

impl SpatialGrid {
    /// Preallocates room for `max_cells` cells and `max_particles` particles.
    pub fn new(
        backend: &ComputeBackend,
        environment: SphEnvironment,
        max_cells: u32,
        max_particles: u32,
    ) -> Result<Self, ScanError> {
        let live_cells = (environment.cell_count() as usize).min(max_cells as usize);
        Ok(Self {
            environment,
            cell_counts: storage_buffer(max_cells as usize + 1),
            ranks: vec![0; max_particles as usize],
            permutation: storage_buffer(max_particles as usize),
            scan: PrefixSum::new(backend, live_cells + 1, ScanConfig::default())?,
            live_cells,
        })
    }

    /// Switches to a new grid shape. The caller checks that it fits the
    /// preallocated cell capacity.
    pub fn configure(&mut self, backend: &ComputeBackend, environment: SphEnvironment) {
        debug_assert!(environment.cell_count() < self.cell_counts.len() as u64);
        self.environment = environment;
        self.live_cells = environment.cell_count() as usize;
        self.scan.reset(backend, self.live_cells + 1);
    }

    pub fn environment(&self) -> &SphEnvironment {
        &self.environment
    }

    pub fn cell_capacity(&self) -> usize {
        self.cell_counts.len() - 1
    }

    pub fn particle_capacity(&self) -> usize {
        self.ranks.len()
    }

    pub fn clear(&mut self, backend: &ComputeBackend) {
        let counts = &mut self.cell_counts[..self.live_cells + 1];
        backend.dispatch_mut("spatial_hash.clear", counts, WORKGROUP_SIZE, |_, count| {
            *count.get_mut() = 0;
        });
    }

    pub fn build<P: GridParticle + Sync>(&mut self, backend: &ComputeBackend, particles: &[P]) {
        let environment = &self.environment;
        let counts = &self.cell_counts;
        let ranks = &mut self.ranks[..particles.len()];
        backend.dispatch_mut("spatial_hash.build", ranks, WORKGROUP_SIZE, |i, rank| {
            let cell = environment.cell_of(particles[i as usize].position());
            *rank = counts[cell as usize].fetch_add(1, Ordering::Relaxed);
        });
    }

    pub fn scan(&mut self, backend: &ComputeBackend) -> Result<(), ScanError> {
        let counts = &mut self.cell_counts[..self.live_cells + 1];
        self.scan.dispatch(backend, counts)
    }

    /// Slot of particle `i` in the sorted buffer. Valid between Scan and the
    /// next Clear while positions are unchanged.
    #[inline]
    pub fn sorted_index(&self, i: usize, position: Vector) -> usize {
        let cell = self.environment.cell_of(position) as usize;
        (self.cell_counts[cell].load(Ordering::Relaxed) + self.ranks[i]) as usize
    }

    /// Scatters `source` into cell order in `target`.
    pub fn reorder<P>(&self, backend: &ComputeBackend, source: &[P], target: &mut [P])
    where
        P: GridParticle + Copy + Send + Sync,
    {
        let len = source.len();
        backend.dispatch("spatial_hash.reorder", len as u32, WORKGROUP_SIZE, |i| {
            let slot = self.sorted_index(i as usize, source[i as usize].position());
            self.permutation[slot].store(i, Ordering::Relaxed);
        });

        let permutation = &self.permutation;
        backend.dispatch_mut(
            "spatial_hash.gather",
            &mut target[..len],
            WORKGROUP_SIZE,
            |slot, particle| {
                *particle = source[permutation[slot as usize].load(Ordering::Relaxed) as usize];
            },
        );
    }

    /// Sorted slots of the particles in `cell`.
    #[inline]
    pub fn cell_range(&self, cell: u32) -> Range<usize> {
        let start = self.cell_counts[cell as usize].load(Ordering::Relaxed);
        let end = self.cell_counts[cell as usize + 1].load(Ordering::Relaxed);
        start as usize..end as usize
    }

    /// Calls `f` with the sorted range of each in-grid cell of the 3×3×3
    /// block around `position`.
    #[inline]
    pub fn for_each_neighbor_cell(&self, position: Vector, mut f: impl FnMut(Range<usize>)) {
        let center = self.environment.cell_coord(position);
        for offset in &NEIGHBOR_OFFSETS {
            let coord = center + *offset;
            if self.environment.contains(coord) {
                f(self.cell_range(self.environment.cell_id(coord)));
            }
        }
    }

    /// Current contents of the counter buffer, including the sentinel.
    pub fn offsets(&self) -> Vec<u32> {
        read_buffer(&self.cell_counts[..self.live_cells + 1])
    }

    pub fn ranks(&self) -> &[u32] {
        &self.ranks
    }

    /// Sum of all cell counts from the last scan.
    pub fn scanned_total(&self) -> u32 {
        self.scan.total()
    }
}
