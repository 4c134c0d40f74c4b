use super::{Scalar, Vector3, TOLERANCE};

/// Ray parameter `t` at which `start + t * direction` meets a plane.
///
/// Returns `None` if the ray runs parallel to the plane or the plane lies
/// behind the ray origin (`t < 0`).
#[must_use]
pub fn ray_plane_parameter(
    ray_start: &Vector3,
    ray_direction: &Vector3,
    plane_point: &Vector3,
    plane_normal: &Vector3,
) -> Option<Scalar> {
    let denom = plane_normal.dot(ray_direction);
    if denom.abs() < TOLERANCE {
        return None;
    }
    let t = plane_normal.dot(&(plane_point - ray_start)) / denom;
    if t < 0.0 {
        return None;
    }
    Some(t)
}

/// Point where a ray meets a plane.
///
/// Returns `None` under the same conditions as [`ray_plane_parameter`].
#[must_use]
pub fn ray_intersects_plane(
    ray_start: &Vector3,
    ray_direction: &Vector3,
    plane_point: &Vector3,
    plane_normal: &Vector3,
) -> Option<Vector3> {
    ray_plane_parameter(ray_start, ray_direction, plane_point, plane_normal)
        .map(|t| ray_start + ray_direction * t)
}

/// Real roots of `a·x² + b·x + c = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuadraticRoots {
    /// No real solution.
    None,
    /// A single (double or linear) root.
    One(Scalar),
    /// Two distinct roots, smaller first.
    Two(Scalar, Scalar),
}

/// Solves `a·x² + b·x + c = 0` over the reals.
///
/// A zero leading coefficient degrades to the linear equation `b·x + c = 0`.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn solve_quadratic(a: Scalar, b: Scalar, c: Scalar) -> QuadraticRoots {
    if a.abs() < TOLERANCE {
        if b.abs() < TOLERANCE {
            return QuadraticRoots::None;
        }
        return QuadraticRoots::One(-c / b);
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return QuadraticRoots::None;
    }
    if discriminant == 0.0 {
        return QuadraticRoots::One(-b / (2.0 * a));
    }

    // Avoids cancellation when b² dominates 4ac.
    let q = -0.5 * (b + b.signum() * discriminant.sqrt());
    let (x0, x1) = (q / a, c / q);
    if x0 <= x1 {
        QuadraticRoots::Two(x0, x1)
    } else {
        QuadraticRoots::Two(x1, x0)
    }
}
