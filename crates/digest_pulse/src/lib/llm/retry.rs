//! Bounded retry around text generation calls.
//!
//! Every attempt runs under its own timeout. A failed, timed out or empty
//! response is retried after a linearly growing pause
//! (`attempt * base_delay`); once the attempts are used up the caller gets a
//! [`Error::TerminalGeneration`].

use std::time::Duration;

use crate::{
    error::Error,
    llm::{PromptRole, TextGenerator},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(120),
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Pause before the attempt following `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

#[derive(Debug, Clone)]
pub struct Retrying<G> {
    inner: G,
    policy: RetryPolicy,
}

impl<G> Retrying<G> {
    pub fn new(inner: G, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl<G> TextGenerator for Retrying<G>
where
    G: TextGenerator + Send + Sync,
{
    #[tracing::instrument(skip(self, payload), fields(payload_len = payload.len()))]
    async fn generate(&self, role: PromptRole, payload: &str) -> Result<String, Error> {
        let attempts = self.policy.max_attempts.max(1);
        let mut reason = String::new();

        for attempt in 1..=attempts {
            let result =
                tokio::time::timeout(self.policy.attempt_timeout, self.inner.generate(role, payload))
                    .await;

            reason = match result {
                Ok(Ok(text)) if !text.trim().is_empty() => return Ok(text),
                Ok(Ok(_)) => "empty response".to_string(),
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!("timed out after {:?}", self.policy.attempt_timeout),
            };

            if attempt < attempts {
                let delay = self.policy.backoff(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts = attempts,
                    error = %reason,
                    ?delay,
                    "Generation attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }

        tracing::error!(attempts, error = %reason, "Generation attempts exhausted");
        Err(Error::TerminalGeneration {
            role,
            attempts,
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicU32, Ordering},
            Mutex,
        },
    };

    use super::*;

    /// Replays queued outcomes; `None` means "hang until timed out"
    struct Scripted {
        outcomes: Mutex<VecDeque<Option<Result<String, Error>>>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(outcomes: Vec<Option<Result<String, Error>>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicU32::new(0),
            }
        }
    }

    impl TextGenerator for Scripted {
        async fn generate(&self, _role: PromptRole, _payload: &str) -> Result<String, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.outcomes.lock().unwrap().pop_front();
            match next {
                Some(Some(outcome)) => outcome,
                Some(None) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok("too late".into())
                }
                None => panic!("unexpected extra call"),
            }
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(10),
            base_delay: Duration::from_secs(2),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures_with_linear_backoff() {
        let inner = Scripted::new(vec![
            Some(Err(Error::TransientUpstream("502".into()))),
            Some(Ok("   ".into())),
            Some(Ok("podcast".into())),
        ]);
        let retrying = Retrying::new(inner, policy());

        let started = tokio::time::Instant::now();
        let text = retrying.generate(PromptRole::Podcast, "payload").await.unwrap();

        assert_eq!(text, "podcast");
        assert_eq!(retrying.inner().calls.load(Ordering::SeqCst), 3);
        // 2s after the first failure, 4s after the second
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts_surface_terminal_error() {
        let inner = Scripted::new(vec![
            Some(Err(Error::TransientUpstream("boom".into()))),
            Some(Err(Error::TransientUpstream("boom".into()))),
            Some(Err(Error::TransientUpstream("still boom".into()))),
        ]);
        let retrying = Retrying::new(inner, policy());

        let err = retrying.generate(PromptRole::Blog, "payload").await.unwrap_err();

        match err {
            Error::TerminalGeneration {
                role,
                attempts,
                reason,
            } => {
                assert_eq!(role, PromptRole::Blog);
                assert_eq!(attempts, 3);
                assert!(reason.contains("still boom"), "got {reason}");
            }
            other => panic!("expected TerminalGeneration, got {other:?}"),
        }
        assert_eq!(retrying.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_attempt_is_bounded_by_timeout() {
        let inner = Scripted::new(vec![None, Some(Ok("intro".into()))]);
        let retrying = Retrying::new(inner, policy());

        let started = tokio::time::Instant::now();
        let text = retrying.generate(PromptRole::Intro, "script").await.unwrap();

        assert_eq!(text, "intro");
        assert_eq!(started.elapsed(), Duration::from_secs(12));
    }

    #[tokio::test]
    async fn test_zero_attempts_still_calls_once() {
        let inner = Scripted::new(vec![Some(Ok("story".into()))]);
        let retrying = Retrying::new(
            inner,
            RetryPolicy {
                max_attempts: 0,
                ..policy()
            },
        );

        assert_eq!(
            retrying.generate(PromptRole::Story, "x").await.unwrap(),
            "story"
        );
    }
}
