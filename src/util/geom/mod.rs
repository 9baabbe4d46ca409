mod point2d;
pub mod quad;

pub use point2d::Point2D;
pub use quad::{Quadrilateral, Corner};
