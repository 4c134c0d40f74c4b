use crate::error::{ensure_extent, ensure_finite, Result};
use crate::math::{vector, Matrix4, Scalar, Vector3};

/// A box given by its lower corner and its extents, relative to a parent.
///
/// `size` is never negative on any axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    position: Vector3,
    size: Vector3,
}

impl BoundingBox {
    /// Creates a box from its lower corner and extents.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` has a negative component or either vector
    /// has a non-finite component.
    pub fn new(position: Vector3, size: Vector3) -> Result<Self> {
        ensure_finite("position", &position)?;
        ensure_extent("size", &size)?;
        Ok(Self { position, size })
    }

    /// The box spanning two arbitrary opposite corners.
    #[must_use]
    pub fn from_corners(a: &Vector3, b: &Vector3) -> Self {
        let position = a.inf(b);
        Self {
            position,
            size: a.sup(b) - position,
        }
    }

    /// The unit cube at the origin.
    #[must_use]
    pub fn unit() -> Self {
        Self {
            position: Vector3::zeros(),
            size: Vector3::repeat(1.0),
        }
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

    /// Upper corner, `position + size`.
    #[must_use]
    pub fn end(&self) -> Vector3 {
        self.position + self.size
    }

    /// Center, `position + size / 2`.
    #[must_use]
    pub fn center(&self) -> Vector3 {
        self.position + self.size / 2.0
    }

    /// Moves the lower corner to `position`.
    ///
    /// # Errors
    ///
    /// Returns an error if `position` has a non-finite component.
    pub fn set_position(&mut self, position: Vector3) -> Result<()> {
        ensure_finite("position", &position)?;
        self.position = position;
        Ok(())
    }

    /// Replaces the extents.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` has a negative or non-finite component.
    pub fn set_size(&mut self, size: Vector3) -> Result<()> {
        ensure_extent("size", &size)?;
        self.size = size;
        Ok(())
    }

    /// Moves the box by `offset`.
    pub fn translate(&mut self, offset: &Vector3) {
        self.position = vector::translate(&self.position, offset);
    }

    /// Grows (or shrinks) the extents by `delta`, keeping the lower corner.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the box unchanged, if an extent would
    /// become negative.
    pub fn resize(&mut self, delta: &Vector3) -> Result<()> {
        let size = self.size + delta;
        ensure_extent("size", &size)?;
        self.size = size;
        Ok(())
    }

    /// Multiplies the extents per axis, keeping the lower corner.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the box unchanged, if a factor is negative.
    pub fn scale(&mut self, factors: &Vector3) -> Result<()> {
        ensure_extent("factors", factors)?;
        self.size.component_mul_assign(factors);
        Ok(())
    }

    /// Multiplies every extent by `factor`, keeping the lower corner.
    ///
    /// # Errors
    ///
    /// Returns an error if `factor` is negative.
    pub fn scale_uniform(&mut self, factor: Scalar) -> Result<()> {
        self.scale(&Vector3::repeat(factor))
    }

    /// Grows the box symmetrically about its center: every extent gains
    /// `delta` and the lower corner moves by `-delta / 2`.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the box unchanged, if a negative `delta`
    /// would make an extent negative.
    pub fn expand(&mut self, delta: Scalar) -> Result<()> {
        let grow = Vector3::repeat(delta);
        let size = self.size + grow;
        ensure_extent("size", &size)?;
        self.position -= grow / 2.0;
        self.size = size;
        Ok(())
    }

    /// Transforms the lower corner by `matrix` as a homogeneous point.
    ///
    /// Only the position moves; the extents are kept as they are. Use
    /// [`ParaxialBoundingBox::from_box`](crate::bounds::ParaxialBoundingBox::from_box)
    /// for the tight box around the transformed volume.
    pub fn transform(&mut self, matrix: &Matrix4) {
        self.position = vector::transform_point(matrix, &self.position);
    }

    /// The eight corners.
    #[must_use]
    pub fn corners(&self) -> [Vector3; 8] {
        let lo = self.position;
        let hi = self.end();
        [
            Vector3::new(lo.x, lo.y, lo.z),
            Vector3::new(hi.x, lo.y, lo.z),
            Vector3::new(lo.x, hi.y, lo.z),
            Vector3::new(hi.x, hi.y, lo.z),
            Vector3::new(lo.x, lo.y, hi.z),
            Vector3::new(hi.x, lo.y, hi.z),
            Vector3::new(lo.x, hi.y, hi.z),
            Vector3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Returns `true` if `point` lies inside or on the box.
    #[must_use]
    pub fn contains(&self, point: &Vector3) -> bool {
        let end = self.end();
        (0..3).all(|axis| point[axis] >= self.position[axis] && point[axis] <= end[axis])
    }
}
