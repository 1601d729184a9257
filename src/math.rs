use bevy::math::{Mat3A, Vec3, Vec3A};

pub type Real = f32;
pub const DIM: usize = 3;

pub type Vector = Vec3A;
pub type Matrix = Mat3A;

#[inline(always)]
pub fn zero_vector() -> Vector {
    Vec3A::ZERO
}

#[inline(always)]
pub fn zero_matrix() -> Matrix {
    Mat3A::ZERO
}

#[inline(always)]
pub fn diagonal_from_value(value: Real) -> Matrix {
    Matrix::from_diagonal(Vec3::splat(value))
}

/// `a ⊗ b`, the matrix whose column `k` is `a * b[k]`.
#[inline(always)]
pub fn outer_product(a: Vector, b: Vector) -> Matrix {
    Matrix::from_cols(a * b.x, a * b.y, a * b.z)
}

/// Symmetric part scaled by two, `m + mᵀ`.
#[inline(always)]
pub fn symmetric_sum(m: &Matrix) -> Matrix {
    *m + m.transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outer_product_columns() {
        let m = outer_product(Vec3A::new(1.0, 2.0, 3.0), Vec3A::new(0.0, 1.0, 2.0));
        assert_eq!(m.x_axis, Vec3A::ZERO);
        assert_eq!(m.y_axis, Vec3A::new(1.0, 2.0, 3.0));
        assert_eq!(m.z_axis, Vec3A::new(2.0, 4.0, 6.0));
        // (a ⊗ b) c == a (b · c)
        let c = Vec3A::new(1.0, -1.0, 0.5);
        assert_eq!(m * c, Vec3A::new(1.0, 2.0, 3.0) * 0.0);
    }

    #[test]
    fn symmetric_sum_and_diagonal() {
        let m = Mat3A::from_cols(
            Vec3A::new(1.0, 2.0, 3.0),
            Vec3A::new(4.0, 5.0, 6.0),
            Vec3A::new(7.0, 8.0, 9.0),
        );
        let s = symmetric_sum(&m);
        assert_eq!(s, s.transpose());
        assert_eq!(s.x_axis, Vec3A::new(2.0, 6.0, 10.0));
        assert_eq!(diagonal_from_value(2.0) * Vec3A::ONE, Vec3A::splat(2.0));
    }
}
