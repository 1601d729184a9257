use std::f32::consts::PI;

use bevy::math::IVec3;

use crate::math::{Real, Vector};

/// Compute the inverse dimension factor used by MLS-MPM kernels.
///
/// With unit cells this is the `4` that scales both the APIC matrix recovery
/// and the stress term in P2G.
#[inline]
pub fn inv_d(cell_width: Real) -> Real {
    4.0 / (cell_width * cell_width)
}

#[inline(always)]
fn bspline_weights(d: Vector) -> [Vector; 3] {
    let left = Vector::splat(0.5) - d;
    let right = Vector::splat(0.5) + d;
    [
        0.5 * left * left,
        Vector::splat(0.75) - d * d,
        0.5 * right * right,
    ]
}

/// Quadratic B-spline stencil of a particle over the 3×3×3 grid nodes around
/// its cell.
#[derive(Clone, Copy, Debug)]
pub struct BSplineStencil {
    pub base_cell: IVec3,
    pub position: Vector,
    weights: [Vector; 3],
}

impl BSplineStencil {
    pub fn for_position(position: Vector) -> Self {
        let cell = position.floor();
        let cell_difference = position - cell - Vector::splat(0.5);

        Self {
            base_cell: cell.as_ivec3() - IVec3::ONE,
            position,
            weights: bspline_weights(cell_difference),
        }
    }

    /// Yields `(node, weight, distance)` for all 27 nodes, where `distance` is
    /// the offset from the particle to the node centre.
    pub fn iter_nodes(&self) -> impl Iterator<Item = (IVec3, Real, Vector)> + '_ {
        (0..27).map(move |i| {
            let (gx, gy, gz) = (i / 9, (i / 3) % 3, i % 3);
            let node = self.base_cell + IVec3::new(gx, gy, gz);
            let weight = self.weights[gx as usize].x
                * self.weights[gy as usize].y
                * self.weights[gz as usize].z;
            let distance = Vector::from(node.as_vec3()) + Vector::splat(0.5) - self.position;
            (node, weight, distance)
        })
    }
}

/// Smoothing kernels with the coefficients for one radius precomputed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphKernels {
    pub h: Real,
    pub h2: Real,
    poly6: Real,
    spiky: Real,
    spiky_grad: Real,
}

impl SphKernels {
    pub fn new(h: Real) -> Self {
        Self {
            h,
            h2: h * h,
            poly6: 315.0 / (64.0 * PI * h.powi(9)),
            spiky: 15.0 / (PI * h.powi(6)),
            spiky_grad: 45.0 / (PI * h.powi(6)),
        }
    }

    /// Poly6 kernel, `(h² − r²)³`.
    #[inline]
    pub fn poly6(&self, r_sq: Real) -> Real {
        if r_sq >= self.h2 {
            return 0.0;
        }
        let diff = self.h2 - r_sq;
        self.poly6 * diff * diff * diff
    }

    /// Spiky kernel, `(h − r)³`, used for near density.
    #[inline]
    pub fn spiky(&self, r: Real) -> Real {
        if r >= self.h {
            return 0.0;
        }
        let diff = self.h - r;
        self.spiky * diff * diff * diff
    }

    /// Magnitude of the spiky kernel gradient, `(h − r)²`.
    #[inline]
    pub fn spiky_gradient(&self, r: Real) -> Real {
        if r >= self.h {
            return 0.0;
        }
        let diff = self.h - r;
        self.spiky_grad * diff * diff
    }
}
