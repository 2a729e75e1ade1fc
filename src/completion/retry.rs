use crate::config::Retry;
use crate::document::{ErrorKind, Failure};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Source of time for the retry loop.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, dur: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, dur: Duration) {
        std::thread::sleep(dur);
    }
}

/// Exponential backoff: `multiplier * 2^(attempt - 1)` seconds, clamped to
/// `[min_backoff_seconds, max_backoff_seconds]`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    multiplier: f64,
    min: Duration,
    max: Duration,
    deadline: Option<Duration>,
}

impl RetryPolicy {
    pub fn from_config(cfg: &Retry) -> Self {
        let min = Duration::from_secs(cfg.min_backoff_seconds);
        let max = Duration::from_secs(cfg.max_backoff_seconds).max(min);
        Self {
            max_attempts: cfg.max_attempts.max(1),
            multiplier: cfg.multiplier.max(0.0),
            min,
            max,
            deadline: (cfg.overall_deadline_seconds > 0)
                .then(|| Duration::from_secs(cfg.overall_deadline_seconds)),
        }
    }

    /// Delay to wait after `attempt` (1-based) has failed.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = 2f64.powi(attempt.saturating_sub(1).min(62) as i32);
        let secs = (self.multiplier * exp).min(self.max.as_secs_f64());
        Duration::from_secs_f64(secs).clamp(self.min, self.max)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }
}

/// Per-call bookkeeping for the retry loop. Dropped once the call resolves.
#[derive(Debug)]
pub struct RetryState {
    pub attempt: u32,
    pub last_error: Option<Failure>,
    pub next_backoff: Duration,
    deadline: Option<Instant>,
}

impl RetryState {
    pub fn new(policy: &RetryPolicy, started: Instant) -> Self {
        Self {
            attempt: 0,
            last_error: None,
            next_backoff: policy.backoff(1),
            deadline: policy.deadline().map(|d| started + d),
        }
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    /// Whether a backoff sleep starting at `now` would end past the deadline.
    pub fn backoff_crosses_deadline(&self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) => now + self.next_backoff >= deadline,
            None => false,
        }
    }

    pub fn into_failure(self) -> Failure {
        self.last_error.unwrap_or_else(|| {
            Failure::new(
                ErrorKind::NetworkError,
                "network request error: deadline reached before the request was sent",
            )
        })
    }
}

/// Lets a caller abandon a request. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
