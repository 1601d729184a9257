//! Initial particle layout shared by both solvers: a jittered lattice block
//! packed against one corner of the box.

use bevy::math::Vec3;
use rand::Rng;

use crate::math::{Real, Vector};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DamBreak {
    /// Lattice spacing.
    pub spacing: Real,
    /// Gap kept between the lattice and every wall.
    pub margin: Real,
    /// Fraction of the inner box (per axis) the lattice may occupy.
    pub fill: Vec3,
    /// Maximum per-component displacement from the lattice point.
    pub jitter: Real,
}

impl DamBreak {
    pub fn new(spacing: Real) -> Self {
        Self {
            spacing,
            margin: spacing,
            fill: Vec3::new(0.5, 0.9, 1.0),
            jitter: spacing * 0.05,
        }
    }

    pub fn with_margin(mut self, margin: Real) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_fill(mut self, fill: Vec3) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_jitter(mut self, jitter: Real) -> Self {
        self.jitter = jitter;
        self
    }

    /// Lattice region inside the box `[min, max]`.
    pub fn fill_region(&self, min: Vector, max: Vector) -> (Vector, Vector) {
        let start = min + Vector::splat(self.margin);
        let inner = (max - min - Vector::splat(2.0 * self.margin)).max(Vector::ZERO);
        (start, start + inner * Vector::from(self.fill))
    }

    /// Walks the lattice (y outermost, then x, then z) and returns at most
    /// `count` positions.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        min: Vector,
        max: Vector,
        count: usize,
        rng: &mut R,
    ) -> Vec<Vector> {
        let mut positions = Vec::with_capacity(count);
        if self.spacing <= 0.0 {
            return positions;
        }

        let (start, end) = self.fill_region(min, max);
        let steps = ((end - start) / self.spacing).ceil().max(Vector::ZERO).as_uvec3();

        'fill: for iy in 0..steps.y {
            for ix in 0..steps.x {
                for iz in 0..steps.z {
                    if positions.len() == count {
                        break 'fill;
                    }
                    let lattice = start + Vector::new(ix as Real, iy as Real, iz as Real) * self.spacing;
                    positions.push(lattice + self.jitter_offset(rng));
                }
            }
        }

        positions
    }

    fn jitter_offset<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector {
        if self.jitter <= 0.0 {
            return Vector::ZERO;
        }
        Vector::new(
            rng.random_range(-self.jitter..self.jitter),
            rng.random_range(-self.jitter..self.jitter),
            rng.random_range(-self.jitter..self.jitter),
        )
    }
}
