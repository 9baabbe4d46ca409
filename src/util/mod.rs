pub mod image;
pub mod geom;
mod timeprofile;

pub use self::image::{Image, ImageRGB8, ImageY8, Rgb};
pub use timeprofile::TimeProfile;
