//! Double-precision 3D math and a lazily evaluated position hierarchy.

pub mod bounds;
pub mod cache;
pub mod error;
pub mod math;
pub mod position;

pub use bounds::{BoundingBox, ParaxialBoundingBox};
pub use cache::ScratchPool;
pub use error::{Result, SpatiaError};
pub use position::{Anchor, IdentityPosition, Placement, PositionId, PositionTree};
