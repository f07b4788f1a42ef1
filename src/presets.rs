//! Built-in provider definitions.
//!
//! Default failover order: Cloudflare Workers AI, DeepAI, Hugging Face
//! Inference. All three return raw image bytes for a text prompt.

use crate::error::Result;
use crate::registry::{ProviderConfig, ProviderRegistry};

const CLOUDFLARE_URL: &str = concat!(
    "https://api.cloudflare.com/client/v4/accounts/{CF_ACCOUNT}",
    "/ai/run/@cf/runwayml/stable-diffusion-v1-5",
);

/// Cloudflare Workers AI (Stable Diffusion 1.5). Needs `CF_ACCOUNT` and `CF_TOKEN`.
pub fn cloudflare() -> Result<ProviderConfig> {
    ProviderConfig::builder("cloudflare", CLOUDFLARE_URL)
    .require("CF_ACCOUNT")
    .bearer_auth("CF_TOKEN")
    .header("Content-Type", "application/json")
    .request_field("prompt")
    .build()
}

/// DeepAI text2img. Needs `DEEPAI_KEY`.
pub fn deepai() -> Result<ProviderConfig> {
    ProviderConfig::builder("deepai", "https://api.deepai.org/api/text2img")
        .header("api-key", "{DEEPAI_KEY}")
        .require("DEEPAI_KEY")
        .request_field("text")
        .build()
}

/// Hugging Face Inference API (Stable Diffusion 1.5). Needs `HF_TOKEN`.
pub fn huggingface() -> Result<ProviderConfig> {
    ProviderConfig::builder(
        "huggingface",
        "https://api-inference.huggingface.co/models/runwayml/stable-diffusion-v1-5",
    )
    .bearer_auth("HF_TOKEN")
    .request_field("inputs")
    .build()
}

/// The built-in registry in default failover order.
pub fn default_registry() -> Result<ProviderRegistry> {
    ProviderRegistry::new(vec![cloudflare()?, deepai()?, huggingface()?])
}
