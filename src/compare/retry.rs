//! Retry state machine for remote reasoning calls.
//!
//! ```text
//! Idle --Start--> Sent(1)
//! Sent(n) --Succeeded--> Done
//! Sent(n) --Failed(fatal)--> Failed
//! Sent(n) --Failed(rate-limited | transient)--> Backoff(n) | Failed (budget spent)
//! Backoff(n) --BackoffElapsed--> Sent(n + 1)
//! ```
//!
//! Transitions are pure, so timing and retry limits are testable without
//! a clock or a network. The engine drives the machine and does the
//! actual sleeping.

use std::time::Duration;

/// How a failed attempt should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The service asked us to slow down
    RateLimited,
    /// Timeouts, network errors, server errors
    Transient,
    /// Retrying cannot help
    Fatal,
}

impl FailureClass {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FailureClass::Fatal)
    }
}

/// Retry budget and backoff schedule.
///
/// The default is 3 retries after the first attempt (4 attempts in all),
/// waiting 1s, 2s and 4s between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each later one
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay after failed attempt `attempt` (1-based): base, 2·base, 4·base, ...
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }

    /// Total attempts allowed, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Where a call is in its retry lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Idle,
    /// Attempt `attempt` is in flight
    Sent { attempt: u32 },
    /// Waiting `delay` after failed attempt `attempt`
    Backoff { attempt: u32, delay: Duration },
    Done,
    Failed {
        attempts: u32,
        /// True when the retry budget ran out, false for fatal errors
        exhausted: bool,
    },
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryEvent {
    Start,
    Succeeded,
    Failed(FailureClass),
    BackoffElapsed,
}

impl RetryState {
    /// Apply one event. Events that make no sense in a state leave it
    /// unchanged.
    pub fn next(self, event: RetryEvent, policy: &RetryPolicy) -> RetryState {
        match (self, event) {
            (RetryState::Idle, RetryEvent::Start) => RetryState::Sent { attempt: 1 },
            (RetryState::Sent { .. }, RetryEvent::Succeeded) => RetryState::Done,
            (RetryState::Sent { attempt }, RetryEvent::Failed(class)) => {
                if !class.is_retryable() {
                    RetryState::Failed {
                        attempts: attempt,
                        exhausted: false,
                    }
                } else if attempt >= policy.max_attempts() {
                    RetryState::Failed {
                        attempts: attempt,
                        exhausted: true,
                    }
                } else {
                    RetryState::Backoff {
                        attempt,
                        delay: policy.delay_after(attempt),
                    }
                }
            }
            (RetryState::Backoff { attempt, .. }, RetryEvent::BackoffElapsed) => {
                RetryState::Sent {
                    attempt: attempt + 1,
                }
            }
            (state, _) => state,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RetryState::Done | RetryState::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(policy: &RetryPolicy, failures: &[FailureClass]) -> (RetryState, Vec<Duration>) {
        let mut state = RetryState::Idle.next(RetryEvent::Start, policy);
        let mut delays = Vec::new();
        let mut remaining = failures.iter();
        while !state.is_terminal() {
            state = match state {
                RetryState::Sent { .. } => match remaining.next() {
                    Some(class) => state.next(RetryEvent::Failed(*class), policy),
                    None => state.next(RetryEvent::Succeeded, policy),
                },
                RetryState::Backoff { delay, .. } => {
                    delays.push(delay);
                    state.next(RetryEvent::BackoffElapsed, policy)
                }
                other => panic!("unexpected state {:?}", other),
            };
        }
        (state, delays)
    }

    #[test]
    fn test_default_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn test_success_first_try() {
        let (state, delays) = run(&RetryPolicy::default(), &[]);
        assert_eq!(state, RetryState::Done);
        assert!(delays.is_empty());
    }

    #[test]
    fn test_rate_limited_then_success() {
        let (state, delays) = run(
            &RetryPolicy::default(),
            &[FailureClass::RateLimited, FailureClass::Transient],
        );
        assert_eq!(state, RetryState::Done);
        assert_eq!(delays, [Duration::from_secs(1), Duration::from_secs(2)]);
    }

    #[test]
    fn test_budget_exhausted() {
        let (state, delays) = run(&RetryPolicy::default(), &[FailureClass::RateLimited; 10]);
        assert_eq!(
            state,
            RetryState::Failed {
                attempts: 4,
                exhausted: true
            }
        );
        assert_eq!(
            delays,
            [
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
    }

    #[test]
    fn test_fatal_is_not_retried() {
        let (state, delays) = run(
            &RetryPolicy::default(),
            &[FailureClass::Transient, FailureClass::Fatal],
        );
        assert_eq!(
            state,
            RetryState::Failed {
                attempts: 2,
                exhausted: false
            }
        );
        assert_eq!(delays, [Duration::from_secs(1)]);
    }

    #[test]
    fn test_zero_retries() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10));
        let (state, delays) = run(&policy, &[FailureClass::Transient]);
        assert_eq!(
            state,
            RetryState::Failed {
                attempts: 1,
                exhausted: true
            }
        );
        assert!(delays.is_empty());
    }

    #[test]
    fn test_irrelevant_events_ignored() {
        let policy = RetryPolicy::default();
        assert_eq!(
            RetryState::Idle.next(RetryEvent::Succeeded, &policy),
            RetryState::Idle
        );
        assert_eq!(
            RetryState::Done.next(RetryEvent::Start, &policy),
            RetryState::Done
        );
    }
}
