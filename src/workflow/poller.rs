//! Bounded polling for asynchronous provider state changes.
//!
//! The provider offers no notification, so the only way to observe a
//! `--no-wait` deallocate or start is to re-read the resource until it reports
//! the target state or the attempt budget runs out.

use crate::azure::ControlPlane;
use crate::error::CliResult;
use crate::models::PowerState;
use colored::Colorize;
use std::fmt::Debug;
use std::time::Duration;

/// How often and how long to poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    /// `max_wait_minutes * 60 / check_interval_secs` attempts, at least one.
    pub fn new(check_interval_secs: u64, max_wait_minutes: u64) -> Self {
        let interval_secs = check_interval_secs.max(1);
        let attempts = (max_wait_minutes.saturating_mul(60) / interval_secs).max(1);
        PollPolicy {
            interval: Duration::from_secs(interval_secs),
            max_attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
        }
    }

    /// Poll without sleeping, used by tests and dry environments.
    pub fn immediate(max_attempts: u32) -> Self {
        PollPolicy {
            interval: Duration::ZERO,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts
    }

    /// Attempts between two progress lines, roughly one minute apart.
    fn progress_every(&self) -> u32 {
        match self.interval.as_secs() {
            0 => 6,
            secs => u32::try_from((60 / secs).max(1)).unwrap_or(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Reached,
    TimedOut,
}

impl PollOutcome {
    pub fn reached(&self) -> bool {
        matches!(self, PollOutcome::Reached)
    }
}

/// Sleep, sample, compare, until `predicate` holds or the budget is spent.
///
/// A failing sample counts as "not there yet". Never returns an error, the
/// caller decides what a timeout means for its step.
pub fn await_state<T, F, P>(what: &str, policy: &PollPolicy, mut probe: F, predicate: P) -> PollOutcome
where
    T: Debug,
    F: FnMut() -> CliResult<T>,
    P: Fn(&T) -> bool,
{
    let progress_every = policy.progress_every();
    for attempt in 1..=policy.max_attempts {
        if !policy.interval.is_zero() {
            std::thread::sleep(policy.interval);
        }
        match probe() {
            Ok(observed) if predicate(&observed) => {
                log::info!("{what}: reached after {attempt} check(s)");
                return PollOutcome::Reached;
            }
            Ok(observed) => {
                log::trace!("{what}: attempt {attempt} observed {observed:?}");
                if attempt % progress_every == 0 {
                    log::info!(
                        "{what}: still waiting, {elapsed}s elapsed, last seen {observed:?}",
                        elapsed = (policy.interval * attempt).as_secs()
                    );
                }
            }
            Err(e) => log::debug!("{what}: attempt {attempt} failed to sample: {e}"),
        }
    }
    log::warn!(
        "{what}: {} after {}s",
        "timed out".yellow(),
        policy.max_wait().as_secs()
    );
    PollOutcome::TimedOut
}

/// Wait until the VM reports `target` as its power state.
pub fn await_power_state<C: ControlPlane + ?Sized>(
    client: &C,
    vm_name: &str,
    resource_group: &str,
    target: PowerState,
    policy: &PollPolicy,
) -> PollOutcome {
    let what = format!("{vm_name} -> {target}");
    await_state(
        &what,
        policy,
        || {
            client
                .get_vm(vm_name, resource_group)
                .map(|vm| vm.map(|vm| vm.power_state))
        },
        |state| state.as_ref() == Some(&target),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;

    #[test]
    fn test_policy_attempts() {
        let policy = PollPolicy::new(10, 10);
        assert_eq!(policy.max_attempts, 60);
        assert_eq!(policy.max_wait(), Duration::from_secs(600));
        assert_eq!(policy.progress_every(), 6);
        assert_eq!(PollPolicy::new(0, 0).max_attempts, 1);
        assert_eq!(PollPolicy::new(30, 1).progress_every(), 2);
    }

    #[test]
    fn test_policy_huge_wait_saturates() {
        let policy = PollPolicy::new(10, u64::MAX);
        assert_eq!(policy.max_attempts, u32::MAX);
        assert_eq!(PollPolicy::new(u64::MAX, u64::MAX).max_attempts, 1);
    }

    #[test]
    fn test_await_state_reached() {
        let mut samples = vec!["deallocating", "deallocating", "deallocated"].into_iter();
        let mut calls = 0;
        let outcome = await_state(
            "vm1",
            &PollPolicy::immediate(5),
            || {
                calls += 1;
                Ok(samples.next().unwrap_or("deallocated"))
            },
            |s| *s == "deallocated",
        );
        assert_eq!(outcome, PollOutcome::Reached);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_await_state_timeout_counts_attempts() {
        let mut calls = 0;
        let outcome = await_state(
            "vm1",
            &PollPolicy::immediate(4),
            || {
                calls += 1;
                Ok("starting")
            },
            |s| *s == "running",
        );
        assert_eq!(outcome, PollOutcome::TimedOut);
        assert!(!outcome.reached());
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_await_state_sample_errors_are_not_fatal() {
        let mut calls = 0;
        let outcome = await_state(
            "vm1",
            &PollPolicy::immediate(3),
            || {
                calls += 1;
                if calls < 3 {
                    Err(CliError::Empty)
                } else {
                    Ok(true)
                }
            },
            |reached| *reached,
        );
        assert_eq!(outcome, PollOutcome::Reached);
    }
}
