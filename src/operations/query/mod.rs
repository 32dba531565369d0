mod bounding_box;
mod is_valid;
mod point_in_solid;
mod volume;

pub use bounding_box::BoundingBox;
pub use is_valid::{Invalidity, IsValid};
pub use point_in_solid::PointInSolid;
pub use volume::Volume;
