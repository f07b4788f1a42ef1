//! Per-provider attempt outcomes and diagnostics.

use crate::error::body_excerpt;
use crate::image::is_image_content_type;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};

/// Result of trying a single provider. Drives the failover loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttemptOutcome {
    /// Provider was not attempted (missing credentials).
    Skipped { provider: String, reason: String },
    /// Provider failed in a way that moves on to the next provider.
    TransientFailure { provider: String, reason: String },
    /// Request for this provider could not be built.
    FatalClientError { provider: String, reason: String },
    /// Provider returned image bytes.
    Success {
        provider: String,
        bytes: Vec<u8>,
        content_type: String,
    },
}

impl AttemptOutcome {
    /// Failure reason to surface if the whole call is exhausted.
    ///
    /// Skips do not count as failures.
    pub(crate) fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::TransientFailure { reason, .. } | Self::FatalClientError { reason, .. } => {
                Some(reason)
            }
            Self::Skipped { .. } | Self::Success { .. } => None,
        }
    }

    /// Public diagnostic view of this outcome.
    pub(crate) fn record(&self) -> AttemptRecord {
        match self {
            Self::Skipped { provider, reason } => AttemptRecord {
                provider: provider.clone(),
                status: AttemptStatus::Skipped,
                detail: Some(reason.clone()),
            },
            Self::TransientFailure { provider, reason }
            | Self::FatalClientError { provider, reason } => AttemptRecord {
                provider: provider.clone(),
                status: AttemptStatus::Failed,
                detail: Some(reason.clone()),
            },
            Self::Success { provider, bytes, .. } => AttemptRecord {
                provider: provider.clone(),
                status: AttemptStatus::Succeeded,
                detail: Some(format!("{} bytes", bytes.len())),
            },
        }
    }
}

/// Classifies an HTTP response from `provider`.
///
/// 401/403/429 are reported as quota or authorization errors; a 2xx with an
/// image content type is a success; everything else is a transient failure
/// carrying the status and a short body excerpt.
pub(crate) fn classify_response(
    provider: &str,
    status: u16,
    content_type: Option<&str>,
    body: Vec<u8>,
) -> AttemptOutcome {
    if matches!(status, 401 | 403 | 429) {
        return AttemptOutcome::TransientFailure {
            provider: provider.to_string(),
            reason: format!("{provider}: API quota/authorization error ({status})"),
        };
    }

    let content_type = content_type.unwrap_or_default();
    if (200..300).contains(&status) && is_image_content_type(content_type) {
        return AttemptOutcome::Success {
            provider: provider.to_string(),
            bytes: body,
            content_type: content_type.to_string(),
        };
    }

    let excerpt = body_excerpt(&String::from_utf8_lossy(&body));
    AttemptOutcome::TransientFailure {
        provider: provider.to_string(),
        reason: format!("{provider}: {status} {excerpt}").trim_end().to_string(),
    }
}

/// Coarse status of one provider attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    /// Required credentials were missing; no request was sent.
    Skipped,
    /// The provider was tried and failed.
    Failed,
    /// The provider returned an image.
    Succeeded,
}

impl AttemptStatus {
    /// Returns the lowercase status name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Failed => "failed",
            Self::Succeeded => "succeeded",
        }
    }
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Diagnostic record emitted once per provider per `generate` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    /// Provider name.
    pub provider: String,
    /// What happened.
    pub status: AttemptStatus,
    /// Skip or failure reason, or a short success summary.
    pub detail: Option<String>,
}

/// Receives one [`AttemptRecord`] per provider attempt.
pub trait AttemptObserver: Send + Sync {
    /// Called after each attempt, in registry order.
    fn on_attempt(&self, record: &AttemptRecord);
}

impl<F> AttemptObserver for F
where
    F: Fn(&AttemptRecord) + Send + Sync,
{
    fn on_attempt(&self, record: &AttemptRecord) {
        self(record)
    }
}

/// Observer that keeps every record in memory.
///
/// Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct AttemptLog {
    records: Arc<Mutex<Vec<AttemptRecord>>>,
}

impl AttemptLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded attempts.
    pub fn records(&self) -> Vec<AttemptRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of records with the given status.
    pub fn count(&self, status: AttemptStatus) -> usize {
        self.records().iter().filter(|r| r.status == status).count()
    }

    /// Drops all recorded attempts.
    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl AttemptObserver for AttemptLog {
    fn on_attempt(&self, record: &AttemptRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_and_quota_statuses_are_transient() {
        for status in [401, 403, 429] {
            let outcome = classify_response("deepai", status, Some("image/png"), vec![1, 2, 3]);
            assert_eq!(
                outcome,
                AttemptOutcome::TransientFailure {
                    provider: "deepai".into(),
                    reason: format!("deepai: API quota/authorization error ({status})"),
                }
            );
        }
    }

    #[test]
    fn test_image_success() {
        let outcome = classify_response("hf", 200, Some("image/jpeg"), vec![0xFF, 0xD8]);
        assert_eq!(
            outcome,
            AttemptOutcome::Success {
                provider: "hf".into(),
                bytes: vec![0xFF, 0xD8],
                content_type: "image/jpeg".into(),
            }
        );
    }

    #[test]
    fn test_octet_stream_success() {
        let outcome = classify_response("cf", 201, Some("application/octet-stream"), vec![9]);
        assert!(matches!(outcome, AttemptOutcome::Success { .. }));
    }

    #[test]
    fn test_json_success_is_transient() {
        let outcome = classify_response(
            "deepai",
            200,
            Some("application/json"),
            br#"{"output_url": "https://example.com/x.png"}"#.to_vec(),
        );
        match outcome {
            AttemptOutcome::TransientFailure { reason, .. } => {
                assert!(reason.starts_with("deepai: 200 {\"output_url\""));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_missing_content_type_is_transient() {
        let outcome = classify_response("p", 200, None, vec![1]);
        assert!(outcome.failure_reason().is_some());
    }

    #[test]
    fn test_server_error_reason_is_truncated() {
        let body = "e".repeat(1000).into_bytes();
        let outcome = classify_response("hf", 503, Some("text/plain"), body);
        let reason = outcome.failure_reason().unwrap();
        assert_eq!(reason, format!("hf: 503 {}", "e".repeat(120)));
    }

    #[test]
    fn test_empty_body_reason_has_no_trailing_space() {
        let outcome = classify_response("hf", 500, None, Vec::new());
        assert_eq!(outcome.failure_reason(), Some("hf: 500"));
    }

    #[test]
    fn test_skipped_has_no_failure_reason() {
        let outcome = AttemptOutcome::Skipped {
            provider: "cf".into(),
            reason: "missing credentials: CF_TOKEN".into(),
        };
        assert_eq!(outcome.failure_reason(), None);
        assert_eq!(outcome.record().status, AttemptStatus::Skipped);
    }

    #[test]
    fn test_attempt_log_records() {
        let log = AttemptLog::new();
        let shared = log.clone();
        shared.on_attempt(&AttemptRecord {
            provider: "a".into(),
            status: AttemptStatus::Failed,
            detail: None,
        });
        assert_eq!(log.records().len(), 1);
        assert_eq!(log.count(AttemptStatus::Failed), 1);
        log.clear();
        assert!(shared.records().is_empty());
    }

    #[test]
    fn test_attempt_log_survives_poisoned_lock() {
        let log = AttemptLog::new();
        log.on_attempt(&AttemptRecord {
            provider: "a".into(),
            status: AttemptStatus::Failed,
            detail: None,
        });

        let shared = log.clone();
        let panicked = std::thread::spawn(move || {
            let _guard = shared.records.lock().unwrap();
            panic!("observer panicked while holding the log");
        })
        .join();
        assert!(panicked.is_err());
        assert!(log.records.is_poisoned());

        log.on_attempt(&AttemptRecord {
            provider: "b".into(),
            status: AttemptStatus::Succeeded,
            detail: None,
        });
        let providers: Vec<String> = log.records().into_iter().map(|r| r.provider).collect();
        assert_eq!(providers, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(log.count(AttemptStatus::Succeeded), 1);

        log.clear();
        assert!(log.records().is_empty());
    }

    #[test]
    fn test_closure_observer() {
        let seen = Mutex::new(Vec::new());
        let observer = |record: &AttemptRecord| seen.lock().unwrap().push(record.provider.clone());
        observer.on_attempt(&AttemptRecord {
            provider: "x".into(),
            status: AttemptStatus::Succeeded,
            detail: None,
        });
        assert_eq!(*seen.lock().unwrap(), vec!["x".to_string()]);
    }
}
