pub mod f32;
pub mod io;
pub mod mask;
pub mod sample;
pub mod traits;

pub use self::f32::ImageF32;
pub use self::mask::Mask;
pub use self::sample::sample_cubic;
pub use self::traits::{ImageView, ImageViewMut, Rows};
