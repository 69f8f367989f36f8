//! # Completion Client
//!
//! Wraps an [`AiProvider`] with a per-call timeout, a bounded retry on transient
//! failures, and a sentinel fallback for callers that must never fail.
//!
//! A `CompletionClient` is built once at startup, passed by reference to every
//! pipeline stage, and released with [`CompletionClient::shutdown`].

use crate::{errors::PromptError, providers::ai::AiProvider};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Returned in place of an answer when the completion service could not produce one.
pub const COMPLETION_FAILED_SENTINEL: &str =
    "Error: Could not generate answers based on the conversation.";

/// Timeout and retry policy for completion calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionOptions {
    /// Upper bound for a single attempt.
    pub timeout: Duration,
    /// Extra attempts after the first one, only for transient failures.
    pub max_retries: u32,
    /// Pause between attempts.
    pub retry_delay: Duration,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug)]
pub struct CompletionClient {
    provider: Box<dyn AiProvider>,
    options: CompletionOptions,
}

impl CompletionClient {
    pub fn new(provider: Box<dyn AiProvider>, options: CompletionOptions) -> Self {
        debug!("Creating completion client with {:?}", options);
        Self { provider, options }
    }

    pub fn options(&self) -> CompletionOptions {
        self.options
    }

    /// Sends one completion request, retrying transient failures.
    ///
    /// An empty reply counts as a transient failure.
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, PromptError> {
        let attempts = self.options.max_retries + 1;
        let mut attempt = 1;

        loop {
            let result = match tokio::time::timeout(
                self.options.timeout,
                self.provider.generate(system_prompt, user_prompt),
            )
            .await
            {
                Ok(Ok(text)) if text.trim().is_empty() => Err(PromptError::EmptyResponse),
                Ok(result) => result,
                Err(_) => Err(PromptError::Timeout(self.options.timeout)),
            };

            match result {
                Ok(text) => {
                    debug!("<-- Completion ({} chars) on attempt {}", text.len(), attempt);
                    return Ok(text);
                }
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!(
                        "Completion attempt {}/{} failed: {}. Retrying.",
                        attempt, attempts, e
                    );
                    attempt += 1;
                    tokio::time::sleep(self.options.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Like [`complete`](Self::complete), but degrades any failure to
    /// [`COMPLETION_FAILED_SENTINEL`].
    pub async fn complete_or_sentinel(&self, system_prompt: &str, user_prompt: &str) -> String {
        match self.complete(system_prompt, user_prompt).await {
            Ok(text) => text,
            Err(e) => {
                error!("Completion failed, using sentinel answer: {}", e);
                COMPLETION_FAILED_SENTINEL.to_string()
            }
        }
    }

    /// Releases the underlying provider.
    pub fn shutdown(self) {
        info!("Shutting down completion client.");
        drop(self.provider);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Fails the first `failures` calls with `error`, then answers "ok".
    #[derive(Clone, Debug)]
    struct FlakyProvider {
        failures: usize,
        status: u16,
        calls: Arc<AtomicUsize>,
        delay: Duration,
    }

    #[async_trait]
    impl AiProvider for FlakyProvider {
        async fn generate(&self, _s: &str, _u: &str) -> Result<String, PromptError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if call < self.failures {
                Err(PromptError::AiApi {
                    status: self.status,
                    body: "boom".to_string(),
                })
            } else {
                Ok("ok".to_string())
            }
        }
    }

    fn client(failures: usize, status: u16, delay: Duration) -> (CompletionClient, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = FlakyProvider {
            failures,
            status,
            calls: calls.clone(),
            delay,
        };
        let options = CompletionOptions {
            timeout: Duration::from_millis(200),
            max_retries: 1,
            retry_delay: Duration::from_millis(1),
        };
        (CompletionClient::new(Box::new(provider), options), calls)
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_once() {
        let (client, calls) = client(1, 503, Duration::ZERO);
        assert_eq!(client.complete("s", "u").await.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_persistent_failure_gives_up_after_retry() {
        let (client, calls) = client(5, 500, Duration::ZERO);
        assert!(client.complete("s", "u").await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let (client, calls) = client(5, 401, Duration::ZERO);
        let err = client.complete("s", "u").await.unwrap_err();
        assert!(matches!(err, PromptError::AiApi { status: 401, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_degrades_to_sentinel() {
        let (client, calls) = client(0, 200, Duration::from_secs(5));
        let answer = client.complete_or_sentinel("s", "u").await;
        assert_eq!(answer, COMPLETION_FAILED_SENTINEL);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
