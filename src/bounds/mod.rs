mod bounding_box;
mod paraxial;

pub use bounding_box::BoundingBox;
pub use paraxial::ParaxialBoundingBox;
