//! Parent-relative placement of scene objects.
//!
//! Every object owns one node in a [`PositionTree`]. A node stores its
//! location (lower corner, relative to the parent), its size and its Euler
//! rotation, and lazily derives two world matrices from them:
//!
//! * the rotation-location matrix, which children build on, and
//! * the transformation (model) matrix, which additionally scales by size.
//!
//! Size is never inherited: children only see the parent's rotation and
//! location.

mod identity;
mod tree;

pub use identity::IdentityPosition;
pub use tree::PositionTree;

use crate::cache::{Local, Shared, SyncMode};
use crate::error::{ensure_extent, ensure_finite, Result};
use crate::math::{vector, Vector3};

slotmap::new_key_type! {
    /// Generational handle to a node in a [`PositionTree`].
    pub struct PositionId;
}

/// What a node's placement is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    /// The fixed world frame, see [`IdentityPosition`].
    #[default]
    Identity,
    /// Another node of the same tree.
    Node(PositionId),
}

impl From<PositionId> for Anchor {
    fn from(id: PositionId) -> Self {
        Self::Node(id)
    }
}

impl From<Option<PositionId>> for Anchor {
    fn from(id: Option<PositionId>) -> Self {
        id.map_or(Self::Identity, Self::Node)
    }
}

/// Location, size and rotation of one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Offset of the lower corner from the parent's lower corner.
    pub location: Vector3,
    /// Extents; never negative.
    pub size: Vector3,
    /// Euler angles `(x, y, z)` in radians, applied Y, then Z, then X.
    pub rotation: Vector3,
}

impl Placement {
    /// Creates a placement.
    #[must_use]
    pub fn new(location: Vector3, size: Vector3, rotation: Vector3) -> Self {
        Self {
            location,
            size,
            rotation,
        }
    }

    /// Unit-sized, unrotated placement at `location`.
    #[must_use]
    pub fn at(location: Vector3) -> Self {
        Self {
            location,
            ..Self::default()
        }
    }

    /// Returns this placement with `size` replaced.
    #[must_use]
    pub fn with_size(mut self, size: Vector3) -> Self {
        self.size = size;
        self
    }

    /// Returns this placement with `rotation` replaced.
    #[must_use]
    pub fn with_rotation(mut self, rotation: Vector3) -> Self {
        self.rotation = rotation;
        self
    }

    /// Checks that every component is finite and the size non-negative.
    ///
    /// # Errors
    ///
    /// Returns a precondition error naming the offending field and axis.
    pub fn validate(&self) -> Result<()> {
        ensure_finite("location", &self.location)?;
        ensure_extent("size", &self.size)?;
        ensure_finite("rotation", &self.rotation)
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            location: vector::zero(),
            size: vector::one(),
            rotation: vector::zero(),
        }
    }
}

/// Which property of a node changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionHint {
    Location,
    Rotation,
    Size,
}

/// Receives change notifications from a [`PositionTree`].
///
/// This is how the owning scene graph learns about moves, resizes and
/// rotations (for re-layout, display-list refresh and so on) without the
/// tree knowing anything about it.
pub trait PositionListener {
    /// Called after `node`'s property `hint` changed by `delta` (new − old).
    fn position_changed(&mut self, node: PositionId, hint: PositionHint, delta: &Vector3);
}

impl<F> PositionListener for F
where
    F: FnMut(PositionId, PositionHint, &Vector3),
{
    fn position_changed(&mut self, node: PositionId, hint: PositionHint, delta: &Vector3) {
        self(node, hint, delta);
    }
}

/// Pool mode of a [`PositionTree`], which also fixes the listener it holds.
pub trait TreeMode: SyncMode {
    /// Listener object stored by the tree.
    type Listener: PositionListener + ?Sized;
}

impl TreeMode for Local {
    type Listener = dyn PositionListener;
}

impl TreeMode for Shared {
    type Listener = dyn PositionListener + Send;
}
