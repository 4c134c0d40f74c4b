//! Matrix inversion.
//!
//! 4x4 matrices are inverted through 2x2 block decomposition. Partition
//!
//! ```text
//! M = | A  B |
//!     | C  D |
//! ```
//!
//! and eliminate through the Schur complement of whichever diagonal block is
//! regular. When neither block pivot goes through (quarter turns about X or
//! Y have singular diagonal blocks) a full LU inverse is used instead.
//!
//! Singularity is judged relative to scale: a determinant is compared with
//! the product of the row norms, which bounds it from above. Uniformly
//! scaling a matrix therefore never changes whether it inverts.

use nalgebra::SMatrix;
use tracing::trace;

use super::{matrix, Matrix2, Matrix3, Matrix4, Scalar, SINGULAR_EPSILON};

/// Returns `true` if `det` is negligible next to the scale of `m`.
fn is_singular<const N: usize>(m: &SMatrix<Scalar, N, N>, det: Scalar) -> bool {
    let scale: Scalar = m.row_iter().map(|row| row.norm()).product();
    det.abs() <= SINGULAR_EPSILON * scale
}

/// Inverse of a 2x2 matrix, or `None` if it is singular.
#[must_use]
pub fn invert2(m: &Matrix2) -> Option<Matrix2> {
    let det = m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)];
    if is_singular(m, det) {
        return None;
    }
    let inv_det = 1.0 / det;
    Some(Matrix2::new(
        m[(1, 1)] * inv_det,
        -m[(0, 1)] * inv_det,
        -m[(1, 0)] * inv_det,
        m[(0, 0)] * inv_det,
    ))
}

/// Inverse of a 3x3 matrix, or `None` if it is singular.
#[must_use]
pub fn invert3(m: &Matrix3) -> Option<Matrix3> {
    if is_singular(m, m.determinant()) {
        return None;
    }
    m.try_inverse()
}

/// Inverse of a 4x4 matrix, or `None` if it is singular.
///
/// Callers must check the result: a `None` means "no inverse", never an
/// identity or partially written matrix.
#[must_use]
pub fn invert(m: &Matrix4) -> Option<Matrix4> {
    let (a, b, c, d) = split(m);

    if let Some(inverse) = invert_by_upper_pivot(&a, &b, &c, &d) {
        return Some(inverse);
    }
    if let Some(inverse) = invert_by_lower_pivot(&a, &b, &c, &d) {
        return Some(inverse);
    }

    trace!("no regular block pivot, falling back to LU inverse");
    if is_singular(m, matrix::determinant(m)) {
        return None;
    }
    m.try_inverse()
}

/// Inverts `m` in place. Returns `false` and leaves `m` untouched if it is
/// singular.
pub fn invert_mut(m: &mut Matrix4) -> bool {
    match invert(m) {
        Some(inverse) => {
            *m = inverse;
            true
        }
        None => false,
    }
}

fn split(m: &Matrix4) -> (Matrix2, Matrix2, Matrix2, Matrix2) {
    (
        m.fixed_view::<2, 2>(0, 0).into_owned(),
        m.fixed_view::<2, 2>(0, 2).into_owned(),
        m.fixed_view::<2, 2>(2, 0).into_owned(),
        m.fixed_view::<2, 2>(2, 2).into_owned(),
    )
}

fn assemble(a: &Matrix2, b: &Matrix2, c: &Matrix2, d: &Matrix2) -> Matrix4 {
    let mut out = Matrix4::zeros();
    out.fixed_view_mut::<2, 2>(0, 0).copy_from(a);
    out.fixed_view_mut::<2, 2>(0, 2).copy_from(b);
    out.fixed_view_mut::<2, 2>(2, 0).copy_from(c);
    out.fixed_view_mut::<2, 2>(2, 2).copy_from(d);
    out
}

/// Elimination through `S = D - C A^-1 B`.
fn invert_by_upper_pivot(a: &Matrix2, b: &Matrix2, c: &Matrix2, d: &Matrix2) -> Option<Matrix4> {
    let a_inv = invert2(a)?;
    let a_inv_b = a_inv * b;
    let c_a_inv = c * a_inv;
    let s_inv = invert2(&(d - c * a_inv_b))?;

    let top_left = a_inv + a_inv_b * s_inv * c_a_inv;
    let top_right = -(a_inv_b * s_inv);
    let bottom_left = -(s_inv * c_a_inv);
    Some(assemble(&top_left, &top_right, &bottom_left, &s_inv))
}

/// Elimination through `T = A - B D^-1 C`.
fn invert_by_lower_pivot(a: &Matrix2, b: &Matrix2, c: &Matrix2, d: &Matrix2) -> Option<Matrix4> {
    let d_inv = invert2(d)?;
    let d_inv_c = d_inv * c;
    let b_d_inv = b * d_inv;
    let t_inv = invert2(&(a - b * d_inv_c))?;

    let top_right = -(t_inv * b_d_inv);
    let bottom_left = -(d_inv_c * t_inv);
    let bottom_right = d_inv + d_inv_c * t_inv * b_d_inv;
    Some(assemble(&t_inv, &top_right, &bottom_left, &bottom_right))
}
