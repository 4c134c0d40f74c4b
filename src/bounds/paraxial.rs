use crate::math::intersect::ray_intersects_plane;
use crate::math::{approx_eq, vector, Matrix4, Scalar, Vector3, TOLERANCE};

use super::BoundingBox;

/// Ray-entry candidates in test order: front/back, left/right, top/bottom.
const FACE_AXES: [usize; 3] = [2, 0, 1];

/// A bounding box that is axis-aligned in world space.
///
/// Built from an arbitrary [`BoundingBox`] under a transform, it is the
/// smallest axis-aligned box containing the transformed source box. This is
/// the box picking rays are tested against.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParaxialBoundingBox {
    position: Vector3,
    size: Vector3,
}

impl ParaxialBoundingBox {
    /// The tight axis-aligned box around `source` transformed by `matrix`.
    #[must_use]
    pub fn from_box(source: &BoundingBox, matrix: &Matrix4) -> Self {
        let mut paraxial = Self::default();
        paraxial.update(source, matrix);
        paraxial
    }

    /// The axis-aligned box between two opposite corners.
    #[must_use]
    pub fn from_corners(a: &Vector3, b: &Vector3) -> Self {
        let position = a.inf(b);
        Self {
            position,
            size: a.sup(b) - position,
        }
    }

    /// Recomputes this box from `source` under `matrix`.
    ///
    /// All eight corners are transformed and the component-wise minimum and
    /// maximum kept.
    pub fn update(&mut self, source: &BoundingBox, matrix: &Matrix4) {
        let corners = source.corners();
        let first = vector::transform_point(matrix, &corners[0]);
        let (min, max) = corners[1..].iter().fold((first, first), |(min, max), corner| {
            let p = vector::transform_point(matrix, corner);
            (min.inf(&p), max.sup(&p))
        });
        self.position = min;
        self.size = max - min;
    }

    /// Lower corner.
    #[must_use]
    pub fn position(&self) -> &Vector3 {
        &self.position
    }

    /// Extents along each axis.
    #[must_use]
    pub fn size(&self) -> &Vector3 {
        &self.size
    }

    /// Upper corner.
    #[must_use]
    pub fn end(&self) -> Vector3 {
        self.position + self.size
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Vector3 {
        self.position + self.size / 2.0
    }

    /// Distance from `ray_start` to the point where the ray enters the box.
    ///
    /// For each axis the ray is not parallel to, only the face it can enter
    /// through (the one whose outward normal opposes the direction) is
    /// tested. The first face hit within its extent wins, so a ray through an
    /// edge or corner reports whichever face comes first in front/back,
    /// left/right, top/bottom order. A ray starting inside the box enters no
    /// face and misses.
    #[must_use]
    pub fn intersect_ray(&self, ray_start: &Vector3, ray_direction: &Vector3) -> Option<Scalar> {
        let end = self.end();
        for axis in FACE_AXES {
            let d = ray_direction[axis];
            if d.abs() < TOLERANCE {
                continue;
            }

            let mut normal = Vector3::zeros();
            let plane_point = if d > 0.0 {
                normal[axis] = -1.0;
                self.position
            } else {
                normal[axis] = 1.0;
                end
            };

            let Some(hit) = ray_intersects_plane(ray_start, ray_direction, &plane_point, &normal)
            else {
                continue;
            };

            let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);
            if self.within(&end, u, hit[u]) && self.within(&end, v, hit[v]) {
                return Some(vector::distance(ray_start, &hit));
            }
        }
        None
    }

    /// Grows this box to also contain `other`.
    ///
    /// Returns `true` if the box changed.
    pub fn union(&mut self, other: &Self) -> bool {
        let end = self.end();
        let min = self.position.inf(&other.position);
        let max = end.sup(&other.end());
        if min == self.position && max == end {
            return false;
        }
        self.position = min;
        self.size = max - min;
        true
    }

    /// Returns `true` if `point` lies inside or on the box.
    #[must_use]
    pub fn contains(&self, point: &Vector3) -> bool {
        let end = self.end();
        (0..3).all(|axis| self.within(&end, axis, point[axis]))
    }

    /// This box as a plain [`BoundingBox`].
    #[must_use]
    pub fn as_bounding_box(&self) -> BoundingBox {
        BoundingBox::from_corners(&self.position, &self.end())
    }

    /// Returns `true` if both corners match `other` within `epsilon`.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, epsilon: Scalar) -> bool {
        approx_eq(&self.position, &other.position, epsilon)
            && approx_eq(&self.size, &other.size, epsilon)
    }

    fn within(&self, end: &Vector3, axis: usize, value: Scalar) -> bool {
        value >= self.position[axis] && value <= end[axis]
    }
}
