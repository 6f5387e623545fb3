//! Bounded retry around a single translation call
//!
//! A call is attempted at most `max_attempts` times, each under a timeout.
//! Transient failures (network, timeout, 5xx) are retried after a fixed or
//! exponentially growing delay. Anything else, and retry exhaustion, yields
//! an empty map so the caller simply treats the group's words as failed.

use super::data::Script;
use super::translator::WordTranslator;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    #[default]
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff: Backoff,
    /// Per-attempt timeout
    pub timeout_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 3000,
            backoff: Backoff::Fixed,
            timeout_secs: 600,
        }
    }
}

impl RetryPolicy {
    /// Policy without delays, for tests and local mocks
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            backoff: Backoff::Fixed,
            timeout_secs: 30,
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let millis = match self.backoff {
            Backoff::Fixed => self.base_delay_ms,
            Backoff::Exponential => {
                let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
                self.base_delay_ms.saturating_mul(factor)
            }
        };
        Duration::from_millis(millis)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Translate one group of words under this policy
    ///
    /// Never fails: a group that cannot be translated returns an empty map.
    pub async fn translate(
        &self,
        translator: &dyn WordTranslator,
        words: &[String],
        script: Script,
    ) -> HashMap<String, String> {
        let attempts = self.attempts();

        for attempt in 1..=attempts {
            match tokio::time::timeout(self.timeout(), translator.translate_words(words, script)).await {
                Ok(Ok(map)) => {
                    debug!(
                        "{} returned {} translations for {} words",
                        translator.provider_name(),
                        map.len(),
                        words.len()
                    );
                    return map;
                }
                Ok(Err(e)) if e.is_retryable() => {
                    warn!(
                        "{} attempt {}/{} failed: {}",
                        translator.provider_name(),
                        attempt,
                        attempts,
                        e
                    );
                }
                Ok(Err(e)) => {
                    warn!(
                        "{} gave an unusable answer, skipping group: {}",
                        translator.provider_name(),
                        e
                    );
                    return HashMap::new();
                }
                Err(_) => {
                    warn!(
                        "{} attempt {}/{} timed out after {:?}",
                        translator.provider_name(),
                        attempt,
                        attempts,
                        self.timeout()
                    );
                }
            }

            if attempt < attempts {
                tokio::time::sleep(self.delay_after(attempt)).await;
            }
        }

        warn!(
            "{} exhausted {} attempts for a group of {} words",
            translator.provider_name(),
            attempts,
            words.len()
        );
        HashMap::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::mock::{MockMode, MockTranslator};

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    fn mappings() -> HashMap<String, String> {
        HashMap::from([("λόγος".to_string(), "palavra".to_string())])
    }

    // ========== Delay computation ==========

    #[test]
    fn test_fixed_delay() {
        let policy = RetryPolicy {
            base_delay_ms: 1000,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(4), Duration::from_millis(1000));
    }

    #[test]
    fn test_exponential_delay() {
        let policy = RetryPolicy {
            base_delay_ms: 100,
            backoff: Backoff::Exponential,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(4), Duration::from_millis(800));
        // Saturates instead of overflowing
        assert_eq!(policy.delay_after(200), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_policy_deserializes_with_defaults() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"max_attempts": 2, "backoff": "exponential"}"#).unwrap();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.backoff, Backoff::Exponential);
        assert_eq!(policy.base_delay_ms, 3000);
    }

    // ========== Retry behavior ==========

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let mock = MockTranslator::new(MockMode::Mappings(mappings()));
        let map = RetryPolicy::immediate(3)
            .translate(&mock, &words(&["λόγος"]), Script::Greek)
            .await;
        assert_eq!(map["λόγος"], "palavra");
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let mock = MockTranslator::new(MockMode::Flaky(2, mappings()));
        let map = RetryPolicy::immediate(3)
            .translate(&mock, &words(&["λόγος"]), Script::Greek)
            .await;
        assert_eq!(map["λόγος"], "palavra");
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_yields_empty_map() {
        let mock = MockTranslator::new(MockMode::Error("connection refused".into()));
        let map = RetryPolicy::immediate(4)
            .translate(&mock, &words(&["λόγος"]), Script::Greek)
            .await;
        assert!(map.is_empty());
        assert_eq!(mock.calls(), 4);
    }

    #[tokio::test]
    async fn test_malformed_response_is_not_retried() {
        let mock = MockTranslator::new(MockMode::Garbage);
        let map = RetryPolicy::immediate(5)
            .translate(&mock, &words(&["λόγος"]), Script::Greek)
            .await;
        assert!(map.is_empty());
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failed_attempt() {
        let mock = MockTranslator::with_delay(MockMode::Mappings(mappings()), 1500);
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay_ms: 0,
            backoff: Backoff::Fixed,
            timeout_secs: 1,
        };
        let map = policy.translate(&mock, &words(&["λόγος"]), Script::Greek).await;
        assert!(map.is_empty());
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let mock = MockTranslator::new(MockMode::Mappings(mappings()));
        let map = RetryPolicy::immediate(0)
            .translate(&mock, &words(&["λόγος"]), Script::Greek)
            .await;
        assert_eq!(map.len(), 1);
    }
}
