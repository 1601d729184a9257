//! Scaled-integer accumulation for quantities summed by many invocations.
//!
//! Grid momentum and mass are carried as `i32` multiples of
//! `1 / multiplier` so that they can be accumulated with an atomic integer
//! add. Encoding truncates toward zero.

use std::sync::atomic::{AtomicI32, Ordering};

use crate::config::FIXED_POINT_MULTIPLIER;
use crate::math::{Real, Vector};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedPoint {
    pub multiplier: Real,
}

impl Default for FixedPoint {
    fn default() -> Self {
        Self {
            multiplier: FIXED_POINT_MULTIPLIER,
        }
    }
}

impl FixedPoint {
    pub fn new(multiplier: Real) -> Self {
        Self { multiplier }
    }

    #[inline(always)]
    pub fn encode(&self, value: Real) -> i32 {
        (value * self.multiplier) as i32
    }

    #[inline(always)]
    pub fn decode(&self, value: i32) -> Real {
        value as Real / self.multiplier
    }

    /// Largest error a single encode can introduce.
    pub fn resolution(&self) -> Real {
        1.0 / self.multiplier
    }
}

/// One MLS-MPM grid node: momentum (later velocity) and mass.
#[derive(Debug, Default)]
pub struct FixedPointCell {
    pub vx: AtomicI32,
    pub vy: AtomicI32,
    pub vz: AtomicI32,
    pub mass: AtomicI32,
}

impl FixedPointCell {
    pub fn clear(&mut self) {
        *self.vx.get_mut() = 0;
        *self.vy.get_mut() = 0;
        *self.vz.get_mut() = 0;
        *self.mass.get_mut() = 0;
    }

    #[inline]
    pub fn add_momentum(&self, fixed: FixedPoint, momentum: Vector) {
        self.vx.fetch_add(fixed.encode(momentum.x), Ordering::Relaxed);
        self.vy.fetch_add(fixed.encode(momentum.y), Ordering::Relaxed);
        self.vz.fetch_add(fixed.encode(momentum.z), Ordering::Relaxed);
    }

    #[inline]
    pub fn add_mass(&self, fixed: FixedPoint, mass: Real) {
        self.mass.fetch_add(fixed.encode(mass), Ordering::Relaxed);
    }

    #[inline]
    pub fn mass(&self, fixed: FixedPoint) -> Real {
        fixed.decode(self.mass.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn momentum(&self, fixed: FixedPoint) -> Vector {
        Vector::new(
            fixed.decode(self.vx.load(Ordering::Relaxed)),
            fixed.decode(self.vy.load(Ordering::Relaxed)),
            fixed.decode(self.vz.load(Ordering::Relaxed)),
        )
    }

    /// Overwrites the momentum slots. Only the invocation that owns the cell
    /// may call this.
    #[inline]
    pub fn store_velocity(&mut self, fixed: FixedPoint, velocity: Vector) {
        *self.vx.get_mut() = fixed.encode(velocity.x);
        *self.vy.get_mut() = fixed.encode(velocity.y);
        *self.vz.get_mut() = fixed.encode(velocity.z);
    }
}
