use super::{Matrix4, Scalar, Vector2, Vector3, Vector4, TOLERANCE};

/// The zero vector `(0, 0, 0)`.
#[must_use]
pub fn zero() -> Vector3 {
    Vector3::zeros()
}

/// The vector `(1, 1, 1)`, the neutral size of a placement.
#[must_use]
pub fn one() -> Vector3 {
    Vector3::repeat(1.0)
}

/// Unit vector along X.
#[must_use]
pub fn unit_x() -> Vector3 {
    Vector3::x()
}

/// Unit vector along Y.
#[must_use]
pub fn unit_y() -> Vector3 {
    Vector3::y()
}

/// Unit vector along Z.
#[must_use]
pub fn unit_z() -> Vector3 {
    Vector3::z()
}

/// Returns `v` scaled to unit length, or `None` if `v` has (near) zero length.
#[must_use]
pub fn normalize(v: &Vector3) -> Option<Vector3> {
    v.try_normalize(TOLERANCE)
}

/// Normalizes a 2D vector, or `None` if it has (near) zero length.
#[must_use]
pub fn normalize_2d(v: &Vector2) -> Option<Vector2> {
    v.try_normalize(TOLERANCE)
}

/// Returns `true` if `v` is shorter than [`TOLERANCE`].
#[must_use]
pub fn is_zero_length(v: &Vector3) -> bool {
    v.norm() < TOLERANCE
}

/// Moves `point` by `offset`.
#[must_use]
pub fn translate(point: &Vector3, offset: &Vector3) -> Vector3 {
    point + offset
}

/// Euclidean distance between two points.
#[must_use]
pub fn distance(a: &Vector3, b: &Vector3) -> Scalar {
    (b - a).norm()
}

/// 2D cross product (z component of the 3D cross product).
#[must_use]
pub fn cross_2d(a: &Vector2, b: &Vector2) -> Scalar {
    a.x * b.y - a.y * b.x
}

/// Unsigned angle between two vectors in radians.
///
/// Returns `None` if either vector has zero length.
#[must_use]
pub fn angle_between(a: &Vector3, b: &Vector3) -> Option<Scalar> {
    let denom = a.norm() * b.norm();
    if denom < TOLERANCE {
        return None;
    }
    // Clamp against rounding just outside [-1, 1].
    Some((a.dot(b) / denom).clamp(-1.0, 1.0).acos())
}

/// Transforms a point by a 4x4 matrix, treating it as `(x, y, z, 1)`.
///
/// The result is divided by the resulting `w` unless `w` is zero, in which
/// case the homogeneous `xyz` is returned unchanged.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn transform_point(matrix: &Matrix4, point: &Vector3) -> Vector3 {
    let h = matrix * Vector4::new(point.x, point.y, point.z, 1.0);
    if h.w == 0.0 || h.w == 1.0 {
        h.xyz()
    } else {
        h.xyz() / h.w
    }
}

/// Transforms a direction by a 4x4 matrix, ignoring translation.
#[must_use]
pub fn transform_direction(matrix: &Matrix4, direction: &Vector3) -> Vector3 {
    (matrix * Vector4::new(direction.x, direction.y, direction.z, 0.0)).xyz()
}

/// Converts a cartesian vector to spherical coordinates.
///
/// The result is `(radius, inclination, azimuth)`: inclination is measured
/// from the +Z axis in `[0, π]`, azimuth from the +X axis towards +Y in
/// `(-π, π]`. Returns `None` for a zero-length vector.
#[must_use]
pub fn spherical_coordinates(v: &Vector3) -> Option<Vector3> {
    let radius = v.norm();
    if radius < TOLERANCE {
        return None;
    }
    let inclination = (v.z / radius).clamp(-1.0, 1.0).acos();
    let azimuth = v.y.atan2(v.x);
    Some(Vector3::new(radius, inclination, azimuth))
}

/// Converts `(radius, inclination, azimuth)` back to cartesian coordinates.
#[must_use]
pub fn from_spherical_coordinates(spherical: &Vector3) -> Vector3 {
    let (r, theta, phi) = (spherical.x, spherical.y, spherical.z);
    Vector3::new(
        r * theta.sin() * phi.cos(),
        r * theta.sin() * phi.sin(),
        r * theta.cos(),
    )
}
