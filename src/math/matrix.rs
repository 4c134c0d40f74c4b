//! Matrix composition, layout conversion and camera helpers.
//!
//! Composition functions (`translate`, `scale`, `rotate`) post-multiply onto
//! an existing matrix, so `translate(m, v)` leaves `m = m * T(v)`: the new
//! transform is applied to points *before* everything already in `m`.

use nalgebra::Unit;

use super::{Matrix3, Matrix4, Scalar, Vector3, TOLERANCE};

/// Returns a fresh identity matrix.
#[must_use]
pub fn identity() -> Matrix4 {
    Matrix4::identity()
}

/// Returns `a * b`.
#[must_use]
pub fn multiply(a: &Matrix4, b: &Matrix4) -> Matrix4 {
    a * b
}

/// Replaces `a` with `a * b`.
pub fn multiply_assign(a: &mut Matrix4, b: &Matrix4) {
    let product = *a * b;
    *a = product;
}

/// Replaces `b` with `a * b`.
pub fn premultiply(b: &mut Matrix4, a: &Matrix4) {
    let product = a * *b;
    *b = product;
}

/// Returns the transpose of `m`.
#[must_use]
pub fn transpose(m: &Matrix4) -> Matrix4 {
    m.transpose()
}

/// Transposes `m` in place by swapping the off-diagonal cells.
pub fn transpose_mut(m: &mut Matrix4) {
    for r in 0..4 {
        for c in (r + 1)..4 {
            m.swap((r, c), (c, r));
        }
    }
}

/// Determinant of a 4x4 matrix, expanded over complementary 2x2 minors.
#[must_use]
pub fn determinant(m: &Matrix4) -> Scalar {
    let b00 = m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)];
    let b01 = m[(0, 0)] * m[(1, 2)] - m[(0, 2)] * m[(1, 0)];
    let b02 = m[(0, 0)] * m[(1, 3)] - m[(0, 3)] * m[(1, 0)];
    let b03 = m[(0, 1)] * m[(1, 2)] - m[(0, 2)] * m[(1, 1)];
    let b04 = m[(0, 1)] * m[(1, 3)] - m[(0, 3)] * m[(1, 1)];
    let b05 = m[(0, 2)] * m[(1, 3)] - m[(0, 3)] * m[(1, 2)];
    let b06 = m[(2, 0)] * m[(3, 1)] - m[(2, 1)] * m[(3, 0)];
    let b07 = m[(2, 0)] * m[(3, 2)] - m[(2, 2)] * m[(3, 0)];
    let b08 = m[(2, 0)] * m[(3, 3)] - m[(2, 3)] * m[(3, 0)];
    let b09 = m[(2, 1)] * m[(3, 2)] - m[(2, 2)] * m[(3, 1)];
    let b10 = m[(2, 1)] * m[(3, 3)] - m[(2, 3)] * m[(3, 1)];
    let b11 = m[(2, 2)] * m[(3, 3)] - m[(2, 3)] * m[(3, 2)];

    b00 * b11 - b01 * b10 + b02 * b09 + b03 * b08 - b04 * b07 + b05 * b06
}

/// Builds a translation matrix.
#[must_use]
pub fn translation_matrix(offset: &Vector3) -> Matrix4 {
    Matrix4::new_translation(offset)
}

/// Builds a non-uniform scaling matrix.
#[must_use]
pub fn scaling_matrix(factors: &Vector3) -> Matrix4 {
    Matrix4::new_nonuniform_scaling(factors)
}

/// Post-multiplies a translation by `offset` onto `m`.
pub fn translate(m: &mut Matrix4, offset: &Vector3) {
    let shift = m.fixed_view::<4, 1>(0, 0) * offset.x
        + m.fixed_view::<4, 1>(0, 1) * offset.y
        + m.fixed_view::<4, 1>(0, 2) * offset.z;
    let mut last = m.fixed_view_mut::<4, 1>(0, 3);
    last += shift;
}

/// Post-multiplies a non-uniform scale by `factors` onto `m`.
pub fn scale(m: &mut Matrix4, factors: &Vector3) {
    for (axis, factor) in factors.iter().enumerate() {
        let mut column = m.column_mut(axis);
        column *= *factor;
    }
}

/// Post-multiplies a uniform scale onto `m`.
pub fn scale_uniform(m: &mut Matrix4, factor: Scalar) {
    scale(m, &Vector3::repeat(factor));
}

/// Builds the 3x3 rotation about a unit axis by `angle` radians (Rodrigues).
///
/// Positive angles turn counter-clockwise when looking from the tip of the
/// axis towards the origin.
#[must_use]
#[allow(
    clippy::many_single_char_names,
    clippy::suspicious_operation_groupings,
    clippy::let_and_return
)]
pub fn rotation_matrix(angle: Scalar, axis: &Unit<Vector3>) -> Matrix3 {
    let c = angle.cos();
    let s = angle.sin();
    let t = 1.0 - c;
    let (x, y, z) = (axis.x, axis.y, axis.z);

    #[rustfmt::skip]
    let r = Matrix3::new(
        t * x * x + c,     t * x * y - s * z, t * x * z + s * y,
        t * x * y + s * z, t * y * y + c,     t * y * z - s * x,
        t * x * z - s * y, t * y * z + s * x, t * z * z + c,
    );
    r
}

/// Post-multiplies a rotation about `axis` by `angle` radians onto `m`.
pub fn rotate(m: &mut Matrix4, angle: Scalar, axis: &Unit<Vector3>) {
    let r = rotation_matrix(angle, axis);
    let upper = m.fixed_view::<4, 3>(0, 0) * r;
    m.fixed_view_mut::<4, 3>(0, 0).copy_from(&upper);
}

/// Post-multiplies a rotation about the X axis.
pub fn rotate_x(m: &mut Matrix4, angle: Scalar) {
    rotate(m, angle, &Vector3::x_axis());
}

/// Post-multiplies a rotation about the Y axis.
pub fn rotate_y(m: &mut Matrix4, angle: Scalar) {
    rotate(m, angle, &Vector3::y_axis());
}

/// Post-multiplies a rotation about the Z axis.
pub fn rotate_z(m: &mut Matrix4, angle: Scalar) {
    rotate(m, angle, &Vector3::z_axis());
}

/// Flattens `m` row by row.
#[must_use]
pub fn to_row_major(m: &Matrix4) -> [Scalar; 16] {
    let mut out = [0.0; 16];
    for (i, value) in m.transpose().iter().enumerate() {
        out[i] = *value;
    }
    out
}

/// Builds a matrix from values laid out row by row.
#[must_use]
pub fn from_row_major(values: &[Scalar; 16]) -> Matrix4 {
    Matrix4::from_row_slice(values)
}

/// Flattens `m` column by column.
#[must_use]
pub fn to_column_major(m: &Matrix4) -> [Scalar; 16] {
    let mut out = [0.0; 16];
    out.copy_from_slice(m.as_slice());
    out
}

/// Builds a matrix from values laid out column by column.
#[must_use]
pub fn from_column_major(values: &[Scalar; 16]) -> Matrix4 {
    Matrix4::from_column_slice(values)
}

/// Column-major single-precision buffer, as consumed by OpenGL-style APIs.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn to_column_major_f32(m: &Matrix4) -> [f32; 16] {
    let mut out = [0.0_f32; 16];
    for (dst, src) in out.iter_mut().zip(m.as_slice()) {
        *dst = *src as f32;
    }
    out
}

/// Right-handed view matrix looking from `eye` towards `target`.
///
/// Returns `None` if `eye` and `target` coincide or `up` is parallel to the
/// viewing direction.
#[must_use]
pub fn look_at(eye: &Vector3, target: &Vector3, up: &Vector3) -> Option<Matrix4> {
    let forward = (target - eye).try_normalize(TOLERANCE)?;
    let side = forward.cross(up).try_normalize(TOLERANCE)?;
    let up = side.cross(&forward);

    #[rustfmt::skip]
    let view = Matrix4::new(
        side.x,     side.y,     side.z,     -side.dot(eye),
        up.x,       up.y,       up.z,       -up.dot(eye),
        -forward.x, -forward.y, -forward.z, forward.dot(eye),
        0.0,        0.0,        0.0,        1.0,
    );
    Some(view)
}

/// Right-handed perspective projection mapping depth to `[-1, 1]`.
///
/// `fov_y` is the vertical field of view in radians. Returns `None` for a
/// non-positive aspect ratio, a field of view outside `(0, π)`, or a
/// degenerate depth range.
#[must_use]
pub fn perspective(fov_y: Scalar, aspect: Scalar, near: Scalar, far: Scalar) -> Option<Matrix4> {
    if aspect <= 0.0
        || fov_y <= 0.0
        || fov_y >= std::f64::consts::PI
        || near <= 0.0
        || (far - near).abs() < TOLERANCE
    {
        return None;
    }
    let f = 1.0 / (fov_y / 2.0).tan();
    let depth = near - far;

    #[rustfmt::skip]
    let projection = Matrix4::new(
        f / aspect, 0.0, 0.0,                  0.0,
        0.0,        f,   0.0,                  0.0,
        0.0,        0.0, (far + near) / depth, 2.0 * far * near / depth,
        0.0,        0.0, -1.0,                 0.0,
    );
    Some(projection)
}
