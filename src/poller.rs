//! Bounded polling of remote state.
//!
//! A condition is evaluated repeatedly until it reports [`Observation::Ready`],
//! returns an error, or the budget runs out. Two budgets exist: a fixed number
//! of attempts ([`poll_with_attempts`]) and a wall-clock deadline
//! ([`poll_with_deadline`]). Both suspend between attempts through the
//! [`Shutdown`] handle, so a tripped shutdown ends the poll early.
//!
//! Only "not yet" is retried. An error from the condition ends the poll
//! immediately with [`PollOutcome::Failed`].

use std::fmt::{Debug, Display};
use std::future::Future;

use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::shutdown::{Shutdown, ShutdownReason};

/// Result of a single condition evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Observation<T> {
    Ready(T),
    Pending(T),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttemptOutcome {
    Met,
    NotYet,
    Error,
}

/// One evaluation of a condition. Only ever logged.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PollAttempt {
    pub(crate) ordinal: u32,
    pub(crate) at: Instant,
    pub(crate) outcome: AttemptOutcome,
}

#[derive(Debug)]
pub(crate) enum PollOutcome<T, E> {
    Succeeded {
        value: T,
        attempts: u32,
    },
    /// Budget spent without the condition being met. `last` is the last observed state.
    Exhausted {
        last: Option<T>,
        attempts: u32,
    },
    Failed {
        error: E,
        attempts: u32,
    },
    Cancelled {
        reason: ShutdownReason,
        last: Option<T>,
        attempts: u32,
    },
}

impl<T, E> PollOutcome<T, E> {
    pub(crate) fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Succeeded { attempts, .. }
            | PollOutcome::Exhausted { attempts, .. }
            | PollOutcome::Failed { attempts, .. }
            | PollOutcome::Cancelled { attempts, .. } => *attempts,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Budget {
    Attempts(u32),
    /// `None` when the timeout is past the clock's range; only success, an error
    /// or shutdown ends the poll.
    Deadline(Option<Instant>),
}

/// Evaluates `condition` up to `max_attempts` times, sleeping `delay` between attempts.
pub(crate) async fn poll_with_attempts<T, E, F, Fut>(
    name: &str,
    max_attempts: u32,
    delay: Duration,
    shutdown: &Shutdown,
    condition: F,
) -> PollOutcome<T, E>
where
    T: Debug,
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Observation<T>, E>>,
{
    poll(
        name,
        Budget::Attempts(max_attempts.max(1)),
        delay,
        shutdown,
        condition,
    )
    .await
}

/// Evaluates `condition` every `interval` until it is met or `timeout` has elapsed.
///
/// The condition is evaluated once more when the deadline is reached, so a
/// timeout of zero still yields one attempt.
pub(crate) async fn poll_with_deadline<T, E, F, Fut>(
    name: &str,
    interval: Duration,
    timeout: Duration,
    shutdown: &Shutdown,
    condition: F,
) -> PollOutcome<T, E>
where
    T: Debug,
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Observation<T>, E>>,
{
    let deadline = Instant::now().checked_add(timeout);
    if deadline.is_none() {
        warn!(condition = %name, "Timeout of {} seconds is unbounded", timeout.as_secs());
    }
    poll(name, Budget::Deadline(deadline), interval, shutdown, condition).await
}

async fn poll<T, E, F, Fut>(
    name: &str,
    budget: Budget,
    interval: Duration,
    shutdown: &Shutdown,
    mut condition: F,
) -> PollOutcome<T, E>
where
    T: Debug,
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Observation<T>, E>>,
{
    let mut shutdown = shutdown.clone();
    let start = Instant::now();
    let mut last = None;
    let mut ordinal = 0u32;

    loop {
        ordinal += 1;
        let result = condition().await;
        let attempt = PollAttempt {
            ordinal,
            at: Instant::now(),
            outcome: match &result {
                Ok(Observation::Ready(_)) => AttemptOutcome::Met,
                Ok(Observation::Pending(_)) => AttemptOutcome::NotYet,
                Err(_) => AttemptOutcome::Error,
            },
        };
        debug!(
            condition = %name,
            attempt = attempt.ordinal,
            elapsed_ms = attempt.at.duration_since(start).as_millis() as u64,
            outcome = ?attempt.outcome,
            "Polled condition"
        );

        match result {
            Ok(Observation::Ready(value)) => {
                return PollOutcome::Succeeded {
                    value,
                    attempts: ordinal,
                };
            }
            Ok(Observation::Pending(value)) => {
                debug!(condition = %name, observed = ?value, "Condition not met yet");
                last = Some(value);
            }
            Err(error) => {
                warn!(
                    condition = %name,
                    attempt = ordinal,
                    error = %error,
                    "Condition check failed"
                );
                return PollOutcome::Failed {
                    error,
                    attempts: ordinal,
                };
            }
        }

        let pause = match budget {
            Budget::Attempts(max) if ordinal >= max => None,
            Budget::Attempts(_) => Some(interval),
            Budget::Deadline(Some(deadline)) => {
                let now = Instant::now();
                (now < deadline).then(|| interval.min(deadline - now))
            }
            Budget::Deadline(None) => Some(interval),
        };
        let Some(pause) = pause else {
            return PollOutcome::Exhausted {
                last,
                attempts: ordinal,
            };
        };

        if let Err(reason) = shutdown.sleep(pause).await {
            warn!(condition = %name, attempt = ordinal, "Polling cancelled: {reason}");
            return PollOutcome::Cancelled {
                reason,
                last,
                attempts: ordinal,
            };
        }
    }
}
