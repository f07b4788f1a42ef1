//! Ordered failover across image generation providers.

use crate::attempt::{classify_response, AttemptObserver, AttemptOutcome};
use crate::credentials::{CredentialSource, EnvCredentials};
use crate::error::{FailoverError, Result, NO_PROVIDERS_READY};
use crate::image::{GenerationResult, ImageGenerator};
use crate::presets;
use crate::registry::{ProviderConfig, ProviderRegistry};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Builder for `ProviderFailoverClient`.
pub struct ProviderFailoverClientBuilder {
    registry: Option<ProviderRegistry>,
    credentials: Option<Arc<dyn CredentialSource>>,
    timeout: Duration,
    http_client: Option<reqwest::Client>,
    observer: Option<Arc<dyn AttemptObserver>>,
}

impl Default for ProviderFailoverClientBuilder {
    fn default() -> Self {
        Self {
            registry: None,
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
            http_client: None,
            observer: None,
        }
    }
}

impl ProviderFailoverClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the provider registry. Falls back to [`presets::default_registry`].
    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the credential source. Falls back to the process environment.
    pub fn credentials(mut self, credentials: impl CredentialSource + 'static) -> Self {
        self.credentials = Some(Arc::new(credentials));
        self
    }

    /// Sets the per-provider request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Uses an existing HTTP client (connection pool, proxy settings, ...).
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Registers an observer notified once per provider attempt.
    pub fn observer(mut self, observer: impl AttemptObserver + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Builds the client.
    pub fn build(self) -> Result<ProviderFailoverClient> {
        if self.timeout.is_zero() {
            return Err(FailoverError::InvalidConfig(
                "timeout must be greater than zero".into(),
            ));
        }

        let registry = match self.registry {
            Some(registry) => registry,
            None => presets::default_registry()?,
        };
        let client = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder().build()?,
        };

        Ok(ProviderFailoverClient {
            client,
            registry: Arc::new(registry),
            credentials: self
                .credentials
                .unwrap_or_else(|| Arc::new(EnvCredentials)),
            timeout: self.timeout,
            observer: self.observer,
        })
    }
}

/// Readiness of one provider, as seen by the current credential source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderReadiness {
    /// Provider name.
    pub name: String,
    /// True when all required credentials are present.
    pub ready: bool,
    /// Required credentials that are absent or empty.
    pub missing: Vec<String>,
}

/// Tries providers in registry order and returns the first image produced.
///
/// Providers are attempted one at a time. A provider with missing
/// credentials is skipped; authorization, quota, transport and malformed
/// response failures move on to the next provider. Nothing is cached
/// between calls.
#[derive(Clone)]
pub struct ProviderFailoverClient {
    client: reqwest::Client,
    registry: Arc<ProviderRegistry>,
    credentials: Arc<dyn CredentialSource>,
    timeout: Duration,
    observer: Option<Arc<dyn AttemptObserver>>,
}

impl std::fmt::Debug for ProviderFailoverClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderFailoverClient")
            .field("registry", &self.registry)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ProviderFailoverClient {
    /// Creates a new `ProviderFailoverClientBuilder`.
    pub fn builder() -> ProviderFailoverClientBuilder {
        ProviderFailoverClientBuilder::new()
    }

    /// Client over the built-in providers, reading credentials from the environment.
    pub fn from_env() -> Result<Self> {
        Self::builder().build()
    }

    /// The provider registry in priority order.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Per-provider request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Reports which providers currently have their credentials. No network calls.
    pub fn readiness(&self) -> Vec<ProviderReadiness> {
        self.registry
            .iter()
            .map(|provider| {
                let missing: Vec<String> = provider
                    .missing_credentials(self.credentials.as_ref())
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                ProviderReadiness {
                    name: provider.name().to_string(),
                    ready: missing.is_empty(),
                    missing,
                }
            })
            .collect()
    }

    /// Generates an image from `prompt` using the first provider that succeeds.
    ///
    /// Fails with [`FailoverError::InvalidInput`] for a blank prompt, before
    /// any request is sent, and with [`FailoverError::AllProvidersExhausted`]
    /// when every provider was skipped or failed.
    pub async fn generate(&self, prompt: &str) -> Result<GenerationResult> {
        if prompt.trim().is_empty() {
            return Err(FailoverError::InvalidInput(
                "prompt must not be empty".into(),
            ));
        }

        let mut last_failure: Option<String> = None;

        for provider in self.registry.iter() {
            let start = Instant::now();
            let outcome = self.attempt(provider, prompt).await;
            let elapsed = start.elapsed();
            self.report(&outcome, elapsed);

            match outcome {
                AttemptOutcome::Success {
                    provider,
                    bytes,
                    content_type,
                } => {
                    return Ok(GenerationResult::new(bytes, provider, content_type, elapsed));
                }
                other => {
                    if let Some(reason) = other.failure_reason() {
                        last_failure = Some(reason.to_string());
                    }
                }
            }
        }

        Err(FailoverError::AllProvidersExhausted {
            reason: last_failure.unwrap_or_else(|| NO_PROVIDERS_READY.to_string()),
        })
    }

    async fn attempt(&self, provider: &ProviderConfig, prompt: &str) -> AttemptOutcome {
        let name = provider.name();
        let credentials = self.credentials.as_ref();

        let missing = provider.missing_credentials(credentials);
        if !missing.is_empty() {
            return AttemptOutcome::Skipped {
                provider: name.to_string(),
                reason: format!("missing credentials: {}", missing.join(", ")),
            };
        }

        let (url, headers) = match provider.resolve(credentials) {
            Ok(resolved) => resolved,
            Err(reason) => {
                return AttemptOutcome::FatalClientError {
                    provider: name.to_string(),
                    reason: format!("{name}: {reason}"),
                };
            }
        };

        let response = match self
            .client
            .post(url)
            .headers(headers)
            .timeout(self.timeout)
            .json(&provider.request_body(prompt))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return AttemptOutcome::TransientFailure {
                    provider: name.to_string(),
                    reason: format!("{name}: {}", self.describe_transport_error(&e)),
                };
            }
        };

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = match response.bytes().await {
            Ok(body) => body.to_vec(),
            Err(e) => {
                return AttemptOutcome::TransientFailure {
                    provider: name.to_string(),
                    reason: format!(
                        "{name}: {status} failed to read body: {}",
                        self.describe_transport_error(&e)
                    ),
                };
            }
        };

        classify_response(name, status, content_type.as_deref(), body)
    }

    fn describe_transport_error(&self, e: &reqwest::Error) -> String {
        if e.is_timeout() {
            format!("request timed out after {:?}", self.timeout)
        } else if e.is_connect() {
            format!("connection failed: {e}")
        } else {
            format!("request failed: {e}")
        }
    }

    fn report(&self, outcome: &AttemptOutcome, elapsed: Duration) {
        let elapsed_ms = elapsed.as_millis() as u64;
        match outcome {
            AttemptOutcome::Skipped { provider, reason } => {
                tracing::debug!(provider = %provider, reason = %reason, "skipping provider");
            }
            AttemptOutcome::TransientFailure { provider, reason } => {
                tracing::warn!(
                    provider = %provider,
                    elapsed_ms,
                    "provider failed, trying next: {reason}"
                );
            }
            AttemptOutcome::FatalClientError { provider, reason } => {
                tracing::error!(provider = %provider, "could not build request: {reason}");
            }
            AttemptOutcome::Success {
                provider, bytes, ..
            } => {
                tracing::info!(
                    provider = %provider,
                    elapsed_ms,
                    bytes = bytes.len(),
                    "image generated"
                );
            }
        }

        if let Some(observer) = &self.observer {
            observer.on_attempt(&outcome.record());
        }
    }
}

#[async_trait]
impl ImageGenerator for ProviderFailoverClient {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult> {
        ProviderFailoverClient::generate(self, prompt).await
    }

    fn name(&self) -> &str {
        "failover"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentials;

    fn registry() -> ProviderRegistry {
        ProviderRegistry::new(vec![
            ProviderConfig::builder("cloudflare", "https://example.com/{CF_ACCOUNT}")
                .require("CF_ACCOUNT")
                .bearer_auth("CF_TOKEN")
                .build()
                .unwrap(),
            ProviderConfig::builder("open", "https://example.com/open")
                .build()
                .unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let client = ProviderFailoverClient::builder()
            .registry(registry())
            .build()
            .unwrap();
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(client.registry().len(), 2);
    }

    #[test]
    fn test_builder_rejects_zero_timeout() {
        let result = ProviderFailoverClient::builder()
            .registry(registry())
            .timeout(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(FailoverError::InvalidConfig(_))));
    }

    #[test]
    fn test_default_registry_used_when_unset() {
        let client = ProviderFailoverClient::builder().build().unwrap();
        assert_eq!(client.registry().len(), 3);
    }

    #[test]
    fn test_readiness() {
        let client = ProviderFailoverClient::builder()
            .registry(registry())
            .credentials(StaticCredentials::new().with("CF_ACCOUNT", "acct"))
            .build()
            .unwrap();
        let readiness = client.readiness();
        assert_eq!(
            readiness,
            vec![
                ProviderReadiness {
                    name: "cloudflare".into(),
                    ready: false,
                    missing: vec!["CF_TOKEN".into()],
                },
                ProviderReadiness {
                    name: "open".into(),
                    ready: true,
                    missing: vec![],
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_prompt_is_invalid_input() {
        let client = ProviderFailoverClient::builder()
            .registry(registry())
            .build()
            .unwrap();
        for prompt in ["", "   ", "\n\t"] {
            let err = client.generate(prompt).await.unwrap_err();
            assert!(matches!(err, FailoverError::InvalidInput(_)));
        }
    }

    #[tokio::test]
    async fn test_empty_registry_is_exhausted() {
        let client = ProviderFailoverClient::builder()
            .registry(ProviderRegistry::default())
            .build()
            .unwrap();
        let err = client.generate("a cat").await.unwrap_err();
        assert_eq!(err.exhaustion_reason(), Some(NO_PROVIDERS_READY));
    }

    #[tokio::test]
    async fn test_trait_object_dispatch() {
        let client = ProviderFailoverClient::builder()
            .registry(ProviderRegistry::default())
            .build()
            .unwrap();
        let generator: Box<dyn ImageGenerator> = Box::new(client);
        assert_eq!(generator.name(), "failover");
        assert!(generator.generate("").await.is_err());
    }
}
