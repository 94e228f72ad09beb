//! Defaults and run-time settings.
//!
//! Every tunable can be overridden on the command line or through the
//! environment (a `.env` file is loaded at start-up).

use crate::workflow::PollPolicy;
use chrono_tz::Tz;
use std::path::PathBuf;
use std::time::Duration;

/// Seconds between two power state samples.
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 10;
/// Upper bound for a deallocate/start wait.
pub const DEFAULT_MAX_WAIT_MINUTES: u64 = 10;
/// Pause before claiming the target address on the new NIC.
pub const DEFAULT_IP_SETTLE_SECS: u64 = 15;
/// Pause after removing a leftover NIC so the provider frees its name and address.
pub const DEFAULT_NAME_RELEASE_SECS: u64 = 10;

/// Host part range used by the hash based temporary address fallback.
pub const FALLBACK_HOST_MIN: u8 = 100;
pub const FALLBACK_HOST_MAX: u8 = 199;
/// Prefix length assumed when deriving the fallback address from the target.
pub const FALLBACK_PREFIX_LEN: u8 = 24;

/// Refuse to parse `az` responses larger than this.
pub const MAX_STDOUT_BYTES: usize = 500_000;

/// Wait intervals used by the replacement workflow.
#[derive(Debug, Clone)]
pub struct Timings {
    pub poll: PollPolicy,
    pub ip_settle: Duration,
    pub name_release: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Timings {
            poll: PollPolicy::new(DEFAULT_CHECK_INTERVAL_SECS, DEFAULT_MAX_WAIT_MINUTES),
            ip_settle: Duration::from_secs(DEFAULT_IP_SETTLE_SECS),
            name_release: Duration::from_secs(DEFAULT_NAME_RELEASE_SECS),
        }
    }
}

impl Timings {
    /// No sleeping at all, polls give up after `attempts` samples.
    pub fn immediate(attempts: u32) -> Self {
        Timings {
            poll: PollPolicy::immediate(attempts),
            ip_settle: Duration::ZERO,
            name_release: Duration::ZERO,
        }
    }
}

/// Everything a batch run needs besides its input records.
#[derive(Debug, Clone)]
pub struct Settings {
    pub timings: Timings,
    pub report_dir: PathBuf,
    pub report_tz: Tz,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            timings: Timings::default(),
            report_dir: PathBuf::from("."),
            report_tz: Tz::UTC,
        }
    }
}

/// Parse a timezone name such as `Pacific/Auckland`.
pub fn parse_tz(name: &str) -> Result<Tz, String> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| format!("Unknown timezone '{name}': {e}"))
}
