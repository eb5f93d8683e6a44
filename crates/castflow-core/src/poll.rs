//! Bounded polling.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::error::UploadError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub const fn new(interval_ms: u64, max_attempts: u32) -> Self {
        Self {
            interval_ms,
            max_attempts,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Upper bound on time spent sleeping between attempts.
    pub fn budget(&self) -> Duration {
        self.interval() * self.max_attempts.saturating_sub(1)
    }
}

/// What one inspection of the page observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T = ()> {
    Pending,
    Ready(T),
    /// The page explicitly reported failure; polling stops immediately.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T = ()> {
    Ready { value: T, attempts: u32 },
    Failed { reason: String, attempts: u32 },
    Exhausted { attempts: u32 },
}

impl<T> PollOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Ready { attempts, .. }
            | Self::Failed { attempts, .. }
            | Self::Exhausted { attempts } => *attempts,
        }
    }

    /// Treat anything but `Ready` as a job failure.
    pub fn into_result(self, what: &str) -> Result<T, UploadError> {
        match self {
            Self::Ready { value, .. } => Ok(value),
            Self::Failed { reason, .. } => Err(UploadError::ProcessingFailed(reason)),
            Self::Exhausted { attempts } => Err(UploadError::PollExhausted {
                what: what.to_string(),
                attempts,
            }),
        }
    }
}

/// Run `probe` up to `policy.max_attempts` times, sleeping `interval`
/// between attempts (never after the last one).
///
/// The probe receives the 1-based attempt number. An `Err` from the probe
/// aborts polling and is returned as-is.
pub async fn poll_until<T, E, F, Fut>(policy: PollPolicy, mut probe: F) -> Result<PollOutcome<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Probe<T>, E>>,
{
    for attempt in 1..=policy.max_attempts {
        match probe(attempt).await? {
            Probe::Ready(value) => {
                return Ok(PollOutcome::Ready {
                    value,
                    attempts: attempt,
                });
            }
            Probe::Failed(reason) => {
                return Ok(PollOutcome::Failed {
                    reason,
                    attempts: attempt,
                });
            }
            Probe::Pending => {
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.interval()).await;
                }
            }
        }
    }

    Ok(PollOutcome::Exhausted {
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const FAST: PollPolicy = PollPolicy::new(0, 5);

    #[tokio::test]
    async fn exhausts_exactly_at_budget() {
        let calls = AtomicU32::new(0);
        let outcome = poll_until(FAST, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<Probe, UploadError>(Probe::Pending) }
        })
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::Exhausted { attempts: 5 });
        assert_eq!(calls.load(Ordering::SeqCst), 5);

        let error = outcome.into_result("cover image").unwrap_err();
        assert!(error.is_timeout());
        assert!(error.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn stops_on_first_ready() {
        let outcome = poll_until(FAST, |attempt| async move {
            Ok::<_, UploadError>(if attempt == 3 {
                Probe::Ready(attempt * 10)
            } else {
                Probe::Pending
            })
        })
        .await
        .unwrap();

        assert_eq!(
            outcome,
            PollOutcome::Ready {
                value: 30,
                attempts: 3
            }
        );
    }

    #[tokio::test]
    async fn failure_marker_wins_and_is_surfaced_verbatim() {
        let outcome: PollOutcome = poll_until(FAST, |_| async {
            Ok::<_, UploadError>(Probe::Failed("视频上传失败".to_string()))
        })
        .await
        .unwrap();

        assert_eq!(outcome.attempts(), 1);
        let error = outcome.into_result("video upload").unwrap_err();
        assert_eq!(error.to_string(), "视频上传失败");
    }

    #[tokio::test]
    async fn probe_errors_abort_polling() {
        let calls = AtomicU32::new(0);
        let result: Result<PollOutcome, UploadError> = poll_until(FAST, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(UploadError::control("spinner")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_budget_never_probes() {
        let outcome: PollOutcome = poll_until(PollPolicy::new(0, 0), |_| async {
            Ok::<_, UploadError>(Probe::Ready(()))
        })
        .await
        .unwrap();
        assert_eq!(outcome, PollOutcome::Exhausted { attempts: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_between_attempts_only() {
        let started = tokio::time::Instant::now();
        let _ = poll_until(PollPolicy::new(2000, 3), |_| async {
            Ok::<Probe, UploadError>(Probe::Pending)
        })
        .await;
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }
}
