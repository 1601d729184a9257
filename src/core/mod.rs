pub mod dam_break;
pub mod fixed_point;
pub mod kernel;
pub mod particle;

pub use dam_break::DamBreak;
pub use fixed_point::{FixedPoint, FixedPointCell};
pub use kernel::{BSplineStencil, SphKernels, inv_d};
pub use particle::{MpmParticle, PosVel, PosVelBuffer, SphParticle};
