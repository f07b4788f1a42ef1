//! Credential sources consulted at call time.

use std::collections::HashMap;

/// Capability that resolves credential names (e.g. `HF_TOKEN`) to values.
///
/// Implementations must be cheap to query; the failover client looks up
/// every required credential on each `generate` call.
pub trait CredentialSource: Send + Sync {
    /// Returns the raw value for `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Returns the value for `key` only when it is present and non-empty.
    fn resolve(&self, key: &str) -> Option<String> {
        self.get(key).filter(|value| !value.is_empty())
    }

    /// Returns the keys from `keys` that do not resolve to a non-empty value.
    fn missing<'a>(&self, keys: &'a [String]) -> Vec<&'a str> {
        keys.iter()
            .filter(|key| self.resolve(key).is_none())
            .map(String::as_str)
            .collect()
    }
}

/// Reads credentials from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// In-memory credential map, for tests and injected secrets.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    values: HashMap<String, String>,
}

impl StaticCredentials {
    /// Creates an empty credential map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a credential.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Inserts or replaces a credential.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl<K, V> FromIterator<(K, V)> for StaticCredentials
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl CredentialSource for StaticCredentials {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}
