//! Image generation results and the generator trait.

mod provider;
mod types;

pub use provider::ImageGenerator;
pub use types::{is_image_content_type, GenerationResult, ImageFormat};
