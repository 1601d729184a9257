//! Configuration and parameters
//!
//! Shared constants and the per-solver parameter resources.

pub mod constants;
pub mod mpm_params;
pub mod sph_params;

pub use constants::*;
pub use mpm_params::*;
pub use sph_params::*;
