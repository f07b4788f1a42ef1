#![warn(missing_docs)]
//! Text-to-image generation with ordered failover across HTTP providers.
//!
//! A [`ProviderFailoverClient`] holds an ordered [`ProviderRegistry`]. For a
//! prompt it tries each provider in turn, skipping those whose credentials
//! are missing and moving past authorization, quota, transport and malformed
//! response failures, and returns the first image produced together with the
//! name of the provider that produced it.
//!
//! # Quick Start
//!
//! ```no_run
//! use imagegen_failover::ProviderFailoverClient;
//!
//! #[tokio::main]
//! async fn main() -> imagegen_failover::Result<()> {
//!     // Cloudflare, DeepAI, Hugging Face; credentials from the environment.
//!     let client = ProviderFailoverClient::from_env()?;
//!     let image = client.generate("A lighthouse in a storm, oil painting").await?;
//!     println!("generated via {}", image.provider_name);
//!     image.save("lighthouse.png")?;
//!     Ok(())
//! }
//! ```
//!
//! # Custom providers
//!
//! ```
//! use imagegen_failover::{
//!     ProviderConfig, ProviderFailoverClient, ProviderRegistry, StaticCredentials,
//! };
//!
//! # fn main() -> imagegen_failover::Result<()> {
//! let registry = ProviderRegistry::new(vec![
//!     ProviderConfig::builder("primary", "https://images.example.com/v1/generate")
//!         .bearer_auth("PRIMARY_TOKEN")
//!         .build()?,
//!     ProviderConfig::builder("backup", "https://backup.example.com/txt2img")
//!         .header("x-api-key", "{BACKUP_KEY}")
//!         .require("BACKUP_KEY")
//!         .request_field("text")
//!         .build()?,
//! ])?;
//!
//! let client = ProviderFailoverClient::builder()
//!     .registry(registry)
//!     .credentials(StaticCredentials::new().with("BACKUP_KEY", "secret"))
//!     .build()?;
//! assert!(!client.readiness()[0].ready);
//! assert!(client.readiness()[1].ready);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `cli`: the `imagegen` command-line binary

mod attempt;
mod client;
mod credentials;
mod error;
pub mod image;
pub mod presets;
mod registry;

pub use attempt::{AttemptLog, AttemptObserver, AttemptRecord, AttemptStatus};
pub use client::{
    ProviderFailoverClient, ProviderFailoverClientBuilder, ProviderReadiness, DEFAULT_TIMEOUT,
};
pub use credentials::{CredentialSource, EnvCredentials, StaticCredentials};
pub use error::{FailoverError, Result};
pub use image::{GenerationResult, ImageFormat, ImageGenerator};
pub use registry::{ProviderConfig, ProviderConfigBuilder, ProviderRegistry, DEFAULT_REQUEST_FIELD};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::client::ProviderFailoverClient;
    pub use crate::credentials::{CredentialSource, StaticCredentials};
    pub use crate::error::{FailoverError, Result};
    pub use crate::image::{GenerationResult, ImageGenerator};
    pub use crate::registry::{ProviderConfig, ProviderRegistry};
}
