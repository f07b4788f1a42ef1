//! Image generator trait.

use crate::error::Result;
use crate::image::types::GenerationResult;
use async_trait::async_trait;

/// Anything that turns a text prompt into image bytes.
///
/// Implemented by [`ProviderFailoverClient`](crate::ProviderFailoverClient);
/// callers such as CLIs or HTTP handlers can hold a `Box<dyn ImageGenerator>`.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generates an image from the given prompt.
    async fn generate(&self, prompt: &str) -> Result<GenerationResult>;

    /// Returns the name of this generator for display.
    fn name(&self) -> &str;
}
