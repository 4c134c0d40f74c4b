//! Vector and matrix primitives plus the free functions the renderer and
//! picker compose them with.
//!
//! All types are fixed-size `nalgebra` values. Read-only access is `&T`,
//! mutation goes through `&mut T`, so an output can never silently alias an
//! input: operations that write into one of their own operands have
//! dedicated in-place variants.

pub mod euler;
pub mod intersect;
pub mod invert;
pub mod matrix;
pub mod vector;

/// Scalar type used throughout the kernel.
pub type Scalar = f64;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<Scalar>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<Scalar>;

/// 4D (homogeneous) vector type.
pub type Vector4 = nalgebra::Vector4<Scalar>;

/// 2x2 matrix.
pub type Matrix2 = nalgebra::Matrix2<Scalar>;

/// 3x3 matrix.
pub type Matrix3 = nalgebra::Matrix3<Scalar>;

/// 4x4 transformation matrix.
pub type Matrix4 = nalgebra::Matrix4<Scalar>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: Scalar = 1e-10;

/// Relative singularity threshold: a determinant at most this fraction of
/// the product of its matrix's row norms is treated as zero.
pub const SINGULAR_EPSILON: Scalar = 1e-12;

/// Returns `true` if `a` and `b` differ by at most `epsilon`.
#[must_use]
pub fn equals(a: Scalar, b: Scalar, epsilon: Scalar) -> bool {
    (a - b).abs() <= epsilon
}

/// Component-wise tolerance equality for any fixed-size vector or matrix.
#[must_use]
pub fn approx_eq<const R: usize, const C: usize>(
    a: &nalgebra::SMatrix<Scalar, R, C>,
    b: &nalgebra::SMatrix<Scalar, R, C>,
    epsilon: Scalar,
) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| equals(*x, *y, epsilon))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approx_eq_compares_every_component() {
        let a = Vector3::new(1.0, 2.0, 3.0);
        assert!(approx_eq(&a, &Vector3::new(1.0, 2.0, 3.0 + 1e-12), 1e-9));
        assert!(!approx_eq(&a, &Vector3::new(1.0, 2.1, 3.0), 1e-9));
        assert!(approx_eq(&Matrix4::identity(), &Matrix4::identity(), 0.0));
    }

    #[test]
    fn equals_respects_epsilon() {
        assert!(equals(1.0, 1.0 + 1e-9, 1e-8));
        assert!(!equals(1.0, 1.1, 1e-8));
        assert!(!equals(Scalar::NAN, Scalar::NAN, 1.0));
    }
}
