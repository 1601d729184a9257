//! Fluid solvers
//!
//! Both solvers own their particle and grid buffers and advance them through a
//! fixed sequence of dispatches per substep:
//!
//! - [`sph`]: Clear → Build → Scan → Reorder → Density → Reorder → Force → Integrate
//! - [`mpm`]: ClearGrid → P2G-1 → P2G-2 → UpdateGrid → G2P → CopyPosition

pub mod mpm;
pub mod sph;

use std::fmt;

use bevy::math::Vec3;

use crate::core::PosVelBuffer;
use crate::error::SimulationError;

pub use mpm::MlsMpmSimulator;
pub use sph::SphSimulator;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SolverKind {
    Sph,
    MlsMpm,
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverKind::Sph => write!(f, "SPH"),
            SolverKind::MlsMpm => write!(f, "MLS-MPM"),
        }
    }
}

/// Common orchestration surface of the two solvers.
pub trait Solver: Send + Sync {
    fn kind(&self) -> SolverKind;

    /// Regenerates the particles as a dam break inside `box_size` and
    /// rewrites the box uniforms. On error nothing is changed.
    fn reset(&mut self, num_particles: u32, box_size: Vec3) -> Result<(), SimulationError>;

    /// Moves the walls used for boundary handling without touching
    /// particles. The box is clamped to the one passed to the last reset.
    fn change_box_size(&mut self, real_box_size: Vec3);

    /// Runs one substep.
    fn step(&mut self);

    /// Runs every substep of a frame and writes the renderer buffer.
    fn compute(&mut self, output: &mut PosVelBuffer);

    fn num_particles(&self) -> u32;

    /// Box passed to the last reset.
    fn box_size(&self) -> Vec3;

    /// Box currently used for boundary handling.
    fn real_box_size(&self) -> Vec3;
}
