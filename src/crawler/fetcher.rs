//! Resilient HTTP fetcher
//!
//! This module handles every page request the crawler makes, including:
//! - Building the HTTP client with timeout and user agent
//! - Bounded retries for rate limiting and transient network failures
//! - Politeness pacing after every attempt
//! - Error classification into retryable and fatal outcomes
//!
//! All waiting goes through a [`Sleeper`] so retry timing can be observed
//! without real delays.

use crate::config::FetchConfig;
use rand::Rng;
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Why a target produced no content
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Rate limited on every one of {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("HTTP {status}")]
    Status { status: u16 },

    #[error("Network failure after {attempts} attempts: {message}")]
    Network { attempts: u32, message: String },
}

/// What a wait is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitKind {
    /// Exponential wait after a rate-limit response
    RateLimitBackoff,
    /// Linear wait after a transient network failure
    RetryBackoff,
    /// Politeness delay observed after every attempt
    Pacing,
}

/// Suspends the fetch loop
pub trait Sleeper: Send + Sync {
    fn sleep(&self, kind: WaitKind, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, _kind: WaitKind, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Retry, backoff and pacing parameters
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
    /// Inclusive jitter range added to rate-limit backoff
    pub rate_limit_jitter: (Duration, Duration),
    pub pacing: Duration,
    /// Upper bound of the uniform `[0, x]` jitter added to pacing
    pub pacing_jitter: Duration,
}

impl From<&FetchConfig> for FetchPolicy {
    fn from(config: &FetchConfig) -> Self {
        let [jitter_min, jitter_max] = config.rate_limit_jitter_secs;
        Self {
            max_attempts: config.max_attempts,
            backoff: Duration::from_secs_f64(config.backoff_secs),
            rate_limit_jitter: (
                Duration::from_secs_f64(jitter_min),
                Duration::from_secs_f64(jitter_max),
            ),
            pacing: Duration::from_secs_f64(config.pacing_secs),
            pacing_jitter: Duration::from_secs_f64(config.pacing_jitter_secs),
        }
    }
}

impl FetchPolicy {
    /// Wait after the rate-limited attempt number `attempt` (0-based):
    /// `backoff * 2^attempt + jitter`
    pub fn rate_limit_wait(&self, attempt: u32, jitter: Duration) -> Duration {
        self.backoff
            .saturating_mul(2u32.saturating_pow(attempt))
            .saturating_add(jitter)
    }

    /// Wait after the failed attempt number `attempt` (0-based):
    /// `backoff * (attempt + 1)`
    pub fn retry_wait(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt.saturating_add(1))
    }

    fn rate_limit_jitter(&self) -> Duration {
        let (min, max) = self.rate_limit_jitter;
        random_between(min, max)
    }

    fn pacing_delay(&self) -> Duration {
        self.pacing + random_between(Duration::ZERO, self.pacing_jitter)
    }
}

fn random_between(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let secs = rand::thread_rng().gen_range(min.as_secs_f64()..=max.as_secs_f64());
    Duration::from_secs_f64(secs)
}

/// Builds an HTTP client with the configured timeout and user agent
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.timeout())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Outcome of a single attempt
enum Attempt {
    Done(String),
    RateLimited,
    Transient(String),
    Fatal(u16),
}

/// Fetches pages one at a time with retries and pacing
#[derive(Debug, Clone)]
pub struct Fetcher<S = TokioSleeper> {
    client: Client,
    policy: FetchPolicy,
    sleeper: S,
}

impl Fetcher<TokioSleeper> {
    /// Creates a fetcher that sleeps for real
    pub fn new(client: Client, policy: FetchPolicy) -> Self {
        Self::with_sleeper(client, policy, TokioSleeper)
    }

    /// Builds client and policy from the `[fetch]` configuration section
    pub fn from_config(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config)?, FetchPolicy::from(config)))
    }
}

impl<S: Sleeper> Fetcher<S> {
    pub fn with_sleeper(client: Client, policy: FetchPolicy, sleeper: S) -> Self {
        Self {
            client,
            policy,
            sleeper,
        }
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Fetches a page body
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx | Return body |
    /// | HTTP 429 | Wait `backoff * 2^attempt + jitter`, retry |
    /// | Other HTTP error | Give up immediately |
    /// | Timeout / connection / body error | Wait `backoff * (attempt + 1)`, retry |
    ///
    /// No backoff follows the final attempt. After every attempt, whatever
    /// its outcome, the pacing delay is observed before moving on.
    ///
    /// A returned error means "no data for this target"; callers are
    /// expected to carry on.
    pub async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut failure = FetchError::Network {
            attempts: 0,
            message: "no attempt made".to_string(),
        };

        for attempt in 0..attempts {
            let has_next = attempt + 1 < attempts;

            let finished = match self.attempt(url).await {
                Attempt::Done(body) => Some(Ok(body)),

                Attempt::Fatal(status) => {
                    tracing::warn!("HTTP {} for {}, not retrying", status, url);
                    Some(Err(FetchError::Status { status }))
                }

                Attempt::RateLimited => {
                    failure = FetchError::RateLimited {
                        attempts: attempt + 1,
                    };
                    if has_next {
                        let wait = self
                            .policy
                            .rate_limit_wait(attempt, self.policy.rate_limit_jitter());
                        tracing::warn!(
                            "Rate limited. Waiting {:.1}s before retry {}/{}",
                            wait.as_secs_f64(),
                            attempt + 2,
                            attempts
                        );
                        self.sleeper.sleep(WaitKind::RateLimitBackoff, wait).await;
                    }
                    None
                }

                Attempt::Transient(message) => {
                    if has_next {
                        let wait = self.policy.retry_wait(attempt);
                        tracing::warn!(
                            "Retrying {} in {:.1}s ({}); attempt {}/{}",
                            url,
                            wait.as_secs_f64(),
                            message,
                            attempt + 2,
                            attempts
                        );
                        self.sleeper.sleep(WaitKind::RetryBackoff, wait).await;
                    } else {
                        tracing::warn!(
                            "Failed to fetch {} after {} attempts: {}",
                            url,
                            attempts,
                            message
                        );
                    }
                    failure = FetchError::Network {
                        attempts: attempt + 1,
                        message,
                    };
                    None
                }
            };

            self.sleeper
                .sleep(WaitKind::Pacing, self.policy.pacing_delay())
                .await;

            if let Some(result) = finished {
                return result;
            }
        }

        Err(failure)
    }

    async fn attempt(&self, url: &Url) -> Attempt {
        tracing::debug!("GET {}", url);

        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return Attempt::Transient(describe(&e)),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Attempt::RateLimited;
        }
        if !status.is_success() {
            return Attempt::Fatal(status.as_u16());
        }

        match response.text().await {
            Ok(body) => Attempt::Done(body),
            Err(e) => Attempt::Transient(describe(&e)),
        }
    }
}

fn describe(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timeout".to_string()
    } else if error.is_connect() {
        "connection failed".to_string()
    } else {
        error.to_string()
    }
}
