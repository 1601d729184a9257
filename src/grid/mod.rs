//! Grids used by the solvers.
//!
//! - [`spatial_hash`]: counting-sorted uniform grid for SPH neighbour search
//! - [`mpm_grid`]: dense fixed-point MLS-MPM grid

pub mod mpm_grid;
pub mod spatial_hash;

pub use mpm_grid::{MpmGrid, node_of};
pub use spatial_hash::{GridParticle, SpatialGrid, SphEnvironment};
