//! Bounded status polling for asynchronous provider jobs.
//!
//! A job is fetched immediately, then again after each sleep until it reaches
//! a terminal state or the wait budget is spent. The last sleep is shortened
//! so the final fetch happens exactly at the deadline.

use std::future::Future;
use std::time::Duration;

use vidshift_core::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_wait: Duration) -> Self {
        Self { interval, max_wait }
    }
}

/// Result of one status fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep<T> {
    Done(T),
    Pending,
}

/// Result of a whole polling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Polled<T> {
    Done { value: T, attempts: u32 },
    TimedOut { attempts: u32, waited: Duration },
}

/// What to do after a fetch that came back pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    Sleep(Duration),
    GiveUp,
}

/// Polling bookkeeping, independent of how time passes.
#[derive(Debug, Clone)]
pub struct PollState {
    policy: PollPolicy,
    started_at: Duration,
    attempts: u32,
}

impl PollState {
    pub fn new(policy: PollPolicy, started_at: Duration) -> Self {
        Self {
            policy,
            started_at,
            attempts: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    pub fn elapsed(&self, now: Duration) -> Duration {
        now.saturating_sub(self.started_at)
    }

    /// Decide the next move after a pending fetch observed at `now`.
    pub fn after_pending(&self, now: Duration) -> PollDecision {
        let elapsed = self.elapsed(now);
        if elapsed >= self.policy.max_wait {
            return PollDecision::GiveUp;
        }
        let remaining = self.policy.max_wait - elapsed;
        PollDecision::Sleep(self.policy.interval.min(remaining))
    }
}

/// Fetch until `fetch` reports [`PollStep::Done`] or `policy.max_wait` elapses.
///
/// Errors returned by `fetch` abort polling immediately.
pub async fn poll_until<T, E, F, Fut>(
    clock: &dyn Clock,
    policy: PollPolicy,
    mut fetch: F,
) -> Result<Polled<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PollStep<T>, E>>,
{
    let mut state = PollState::new(policy, clock.now());

    loop {
        let attempt = state.begin_attempt();
        if let PollStep::Done(value) = fetch(attempt).await? {
            return Ok(Polled::Done {
                value,
                attempts: attempt,
            });
        }

        match state.after_pending(clock.now()) {
            PollDecision::Sleep(delay) => clock.sleep(delay).await,
            PollDecision::GiveUp => {
                return Ok(Polled::TimedOut {
                    attempts: state.attempts(),
                    waited: state.elapsed(clock.now()),
                })
            }
        }
    }
}
