//! Euler angles in the order position nodes apply them: Y, then Z, then X.
//!
//! Angles are stored as `(x, y, z)` and the composed rotation is
//! `R = Ry(y) * Rz(z) * Rx(x)`.

use nalgebra::{Unit, UnitQuaternion};

use super::vector::{angle_between, is_zero_length};
use super::{matrix, Matrix3, Matrix4, Vector3, TOLERANCE};

/// Builds the rotation matrix for Euler angles `(x, y, z)`.
#[must_use]
pub fn rotation_from_euler(angles: &Vector3) -> Matrix4 {
    let mut m = Matrix4::identity();
    matrix::rotate_y(&mut m, angles.y);
    matrix::rotate_z(&mut m, angles.z);
    matrix::rotate_x(&mut m, angles.x);
    m
}

/// Decomposes a pure rotation matrix into Euler angles `(x, y, z)`.
///
/// At the singularity (`z = ±π/2`) the X angle is fixed to zero and the
/// whole residual rotation is attributed to Y.
#[must_use]
pub fn euler_from_rotation(r: &Matrix3) -> Vector3 {
    let cos_z = r[(0, 0)].hypot(r[(2, 0)]);
    let z = r[(1, 0)].atan2(cos_z);
    if cos_z > TOLERANCE {
        let y = (-r[(2, 0)]).atan2(r[(0, 0)]);
        let x = (-r[(1, 2)]).atan2(r[(1, 1)]);
        Vector3::new(x, y, z)
    } else {
        let y = r[(0, 2)].atan2(r[(2, 2)]);
        Vector3::new(0.0, y, z)
    }
}

/// Euler angles that turn `reference` onto the direction of `vector`.
///
/// The shortest-arc axis/angle is converted through a quaternion into the
/// node rotation order. Aligned inputs yield the zero vector; opposite inputs
/// yield a half turn about an axis perpendicular to `reference`. Returns
/// `None` if either input has zero length.
#[must_use]
pub fn euler_angles(vector: &Vector3, reference: &Vector3) -> Option<Vector3> {
    if is_zero_length(vector) || is_zero_length(reference) {
        return None;
    }

    let axis = reference.cross(vector);
    let axis = match Unit::try_new(axis, TOLERANCE) {
        Some(axis) => axis,
        None if reference.dot(vector) > 0.0 => return Some(Vector3::zeros()),
        None => perpendicular(reference),
    };
    let angle = angle_between(reference, vector)?;

    let rotation = UnitQuaternion::from_axis_angle(&axis, angle).to_rotation_matrix();
    Some(euler_from_rotation(rotation.matrix()))
}

/// Any unit vector perpendicular to `v`.
fn perpendicular(v: &Vector3) -> Unit<Vector3> {
    let helper = if v.x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
    Unit::new_normalize(v.cross(&helper))
}
