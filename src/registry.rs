//! Provider definitions and the ordered provider registry.

use crate::credentials::CredentialSource;
use crate::error::{FailoverError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Default request body key for the prompt.
pub const DEFAULT_REQUEST_FIELD: &str = "prompt";

/// One third-party text-to-image HTTP endpoint.
///
/// `endpoint_url` and header values may reference credentials as
/// `{CREDENTIAL_NAME}`; every referenced name must also be listed in
/// `required_credentials`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawProviderConfig")]
pub struct ProviderConfig {
    name: String,
    endpoint_url: String,
    request_field: String,
    headers: BTreeMap<String, String>,
    required_credentials: Vec<String>,
}

impl ProviderConfig {
    /// Creates a new `ProviderConfigBuilder`.
    pub fn builder(
        name: impl Into<String>,
        endpoint_url: impl Into<String>,
    ) -> ProviderConfigBuilder {
        ProviderConfigBuilder::new(name, endpoint_url)
    }

    /// Unique provider name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Endpoint URL template.
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Key under which the prompt is placed in the request body.
    pub fn request_field(&self) -> &str {
        &self.request_field
    }

    /// Header templates.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Credentials that must be present and non-empty for this provider.
    pub fn required_credentials(&self) -> &[String] {
        &self.required_credentials
    }

    /// Returns true if every required credential resolves to a non-empty value.
    pub fn is_ready(&self, credentials: &dyn CredentialSource) -> bool {
        self.missing_credentials(credentials).is_empty()
    }

    /// Returns the required credentials that are absent or empty.
    pub fn missing_credentials<'a>(
        &'a self,
        credentials: &dyn CredentialSource,
    ) -> Vec<&'a str> {
        credentials.missing(&self.required_credentials)
    }

    /// Builds the JSON request body `{ <request_field>: <prompt> }`.
    pub(crate) fn request_body(&self, prompt: &str) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        body.insert(
            self.request_field.clone(),
            serde_json::Value::String(prompt.to_string()),
        );
        serde_json::Value::Object(body)
    }

    /// Substitutes credentials into the URL and headers.
    ///
    /// Values placed in the URL are percent-encoded, so a credential can only
    /// fill its own path segment or query value. The error is a
    /// human-readable reason; callers treat it as a per-provider failure.
    pub(crate) fn resolve(
        &self,
        credentials: &dyn CredentialSource,
    ) -> std::result::Result<(reqwest::Url, HeaderMap), String> {
        let url = render_with(&self.endpoint_url, |key| {
            credentials
                .resolve(key)
                .map(|value| urlencoding::encode(&value).into_owned())
        })
        .ok_or_else(|| "endpoint URL references an unresolved credential".to_string())?;
        let url = reqwest::Url::parse(&url).map_err(|e| format!("invalid endpoint URL: {e}"))?;

        let mut headers = HeaderMap::new();
        for (name, template) in &self.headers {
            let value = render_template(template, credentials)
                .ok_or_else(|| format!("header {name} references an unresolved credential"))?;
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| format!("invalid header name {name}: {e}"))?;
            let mut value = HeaderValue::from_str(&value)
                .map_err(|e| format!("invalid value for header {name}: {e}"))?;
            value.set_sensitive(true);
            headers.insert(header, value);
        }

        Ok((url, headers))
    }
}

/// Builder for `ProviderConfig`.
#[derive(Debug, Clone)]
pub struct ProviderConfigBuilder {
    name: String,
    endpoint_url: String,
    request_field: String,
    headers: BTreeMap<String, String>,
    required_credentials: Vec<String>,
}

impl ProviderConfigBuilder {
    /// Creates a builder for a provider posting to `endpoint_url`.
    pub fn new(name: impl Into<String>, endpoint_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint_url: endpoint_url.into(),
            request_field: DEFAULT_REQUEST_FIELD.to_string(),
            headers: BTreeMap::new(),
            required_credentials: Vec::new(),
        }
    }

    /// Sets the request body key for the prompt. Defaults to `prompt`.
    pub fn request_field(mut self, field: impl Into<String>) -> Self {
        self.request_field = field.into();
        self
    }

    /// Adds a header. The value may contain `{CREDENTIAL}` placeholders.
    ///
    /// Header names are case-insensitive and stored lowercase; setting the
    /// same header twice keeps the later value.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Adds an `Authorization: Bearer {credential}` header and marks the
    /// credential as required.
    pub fn bearer_auth(self, credential: impl Into<String>) -> Self {
        let credential = credential.into();
        self.header("Authorization", format!("Bearer {{{credential}}}"))
            .require(credential)
    }

    /// Marks a credential as required for this provider.
    pub fn require(mut self, credential: impl Into<String>) -> Self {
        let credential = credential.into();
        if !self.required_credentials.contains(&credential) {
            self.required_credentials.push(credential);
        }
        self
    }

    /// Validates and builds the provider definition.
    pub fn build(self) -> Result<ProviderConfig> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(FailoverError::InvalidConfig(
                "provider name must not be empty".into(),
            ));
        }
        if self.request_field.trim().is_empty() {
            return Err(FailoverError::InvalidConfig(format!(
                "{name}: request field must not be empty"
            )));
        }
        if let Some(key) = self.required_credentials.iter().find(|k| !is_credential_name(k)) {
            return Err(FailoverError::InvalidConfig(format!(
                "{name}: invalid credential name {key:?}"
            )));
        }

        let declared: HashSet<&str> =
            self.required_credentials.iter().map(String::as_str).collect();
        let templates = std::iter::once(self.endpoint_url.as_str())
            .chain(self.headers.values().map(String::as_str));
        for template in templates {
            if let Some(undeclared) = placeholders(template)
                .into_iter()
                .find(|p| !declared.contains(p))
            {
                return Err(FailoverError::InvalidConfig(format!(
                    "{name}: placeholder {{{undeclared}}} is not a required credential"
                )));
            }
        }

        let sample_url = render_with(&self.endpoint_url, |_| Some("x".to_string()))
            .unwrap_or_default();
        let url = reqwest::Url::parse(&sample_url).map_err(|e| {
            FailoverError::InvalidConfig(format!("{name}: invalid endpoint URL: {e}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FailoverError::InvalidConfig(format!(
                "{name}: unsupported URL scheme {}",
                url.scheme()
            )));
        }

        for (header, template) in &self.headers {
            HeaderName::from_bytes(header.as_bytes()).map_err(|_| {
                FailoverError::InvalidConfig(format!("{name}: invalid header name {header:?}"))
            })?;
            let sample = render_with(template, |_| Some("x".to_string())).unwrap_or_default();
            HeaderValue::from_str(&sample).map_err(|_| {
                FailoverError::InvalidConfig(format!("{name}: invalid value for header {header}"))
            })?;
        }

        Ok(ProviderConfig {
            name,
            endpoint_url: self.endpoint_url,
            request_field: self.request_field,
            headers: self.headers,
            required_credentials: self.required_credentials,
        })
    }
}

#[derive(Deserialize)]
struct RawProviderConfig {
    name: String,
    endpoint_url: String,
    #[serde(default = "default_request_field")]
    request_field: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    required_credentials: Vec<String>,
}

fn default_request_field() -> String {
    DEFAULT_REQUEST_FIELD.to_string()
}

impl TryFrom<RawProviderConfig> for ProviderConfig {
    type Error = FailoverError;

    fn try_from(raw: RawProviderConfig) -> Result<Self> {
        let mut builder = ProviderConfigBuilder::new(raw.name, raw.endpoint_url)
            .request_field(raw.request_field);
        for (name, value) in raw.headers {
            builder = builder.header(name, value);
        }
        for key in raw.required_credentials {
            builder = builder.require(key);
        }
        builder.build()
    }
}

/// Ordered, immutable list of providers. The first entry is tried first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProviderRegistry {
    providers: Vec<ProviderConfig>,
}

impl ProviderRegistry {
    /// Creates a registry, rejecting duplicate provider names.
    pub fn new(providers: Vec<ProviderConfig>) -> Result<Self> {
        let mut seen = HashSet::new();
        for provider in &providers {
            if !seen.insert(provider.name()) {
                return Err(FailoverError::InvalidConfig(format!(
                    "duplicate provider name: {}",
                    provider.name()
                )));
            }
        }
        Ok(Self { providers })
    }

    /// Parses a JSON array of provider definitions.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let providers: Vec<ProviderConfig> = serde_json::from_str(json)?;
        Self::new(providers)
    }

    /// Loads a JSON registry file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Providers in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter()
    }

    /// Looks up a provider by name.
    pub fn get(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name() == name)
    }

    /// Number of providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns true if the registry has no providers.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl<'a> IntoIterator for &'a ProviderRegistry {
    type Item = &'a ProviderConfig;
    type IntoIter = std::slice::Iter<'a, ProviderConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.providers.iter()
    }
}

fn is_credential_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Returns the credential names referenced as `{NAME}` in `template`.
pub(crate) fn placeholders(template: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) if is_credential_name(&after[..end]) => {
                found.push(&after[..end]);
                rest = &after[end + 1..];
            }
            _ => rest = after,
        }
    }
    found
}

fn render_with(template: &str, mut lookup: impl FnMut(&str) -> Option<String>) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) if is_credential_name(&after[..end]) => {
                out.push_str(&lookup(&after[..end])?);
                rest = &after[end + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Some(out)
}

/// Substitutes `{NAME}` placeholders with resolved credentials.
///
/// Returns `None` if any referenced credential is absent or empty.
pub(crate) fn render_template(
    template: &str,
    credentials: &dyn CredentialSource,
) -> Option<String> {
    render_with(template, |key| credentials.resolve(key))
}
