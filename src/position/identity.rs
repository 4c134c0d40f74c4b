use crate::math::{vector, Matrix4, Vector3};

use super::Placement;

/// The fixed world frame nodes without a parent are placed in.
///
/// Zero location, unit size, no rotation, identity matrices. It is always
/// valid and has no mutators, so it can never be moved or invalidated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityPosition;

impl IdentityPosition {
    /// Always the zero vector.
    #[must_use]
    pub fn location(self) -> Vector3 {
        vector::zero()
    }

    /// Always `(1, 1, 1)`.
    #[must_use]
    pub fn size(self) -> Vector3 {
        vector::one()
    }

    /// Always the zero vector.
    #[must_use]
    pub fn rotation(self) -> Vector3 {
        vector::zero()
    }

    /// The neutral placement.
    #[must_use]
    pub fn placement(self) -> Placement {
        Placement::default()
    }

    /// Always the identity.
    #[must_use]
    pub fn rotation_location_matrix(self) -> Matrix4 {
        Matrix4::identity()
    }

    /// Always the identity.
    #[must_use]
    pub fn transformation_matrix(self) -> Matrix4 {
        Matrix4::identity()
    }

    /// Always `true`.
    #[must_use]
    pub fn is_valid(self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_neutral() {
        let root = IdentityPosition;
        assert_eq!(root.placement(), Placement::new(root.location(), root.size(), root.rotation()));
        assert_eq!(root.transformation_matrix(), Matrix4::identity());
        assert_eq!(root.rotation_location_matrix(), Matrix4::identity());
        assert!(root.is_valid());
    }
}
