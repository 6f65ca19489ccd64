//! Per-IP request counting with temporary blocking.
//!
//! Every non-blocked request from an IP bumps that IP's counter. Once the
//! counter passes the threshold, the IP is blocked for a fixed duration and
//! its requests are rejected without being counted.
//!
//! Counters are cumulative for the life of the process: they are never
//! decayed, and block expiry does not reset them. An IP that was blocked once
//! is therefore still over the threshold when its block lapses, and its next
//! counted request blocks it again.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// Requests an IP may make before it is blocked.
pub const DEFAULT_THRESHOLD: u64 = 100;

/// How long a block lasts.
pub const DEFAULT_BLOCK_DURATION: Duration = Duration::from_secs(5 * 60);

/// Outcome of [`RateLimiter::check_and_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// The request pushed the IP over the threshold; it is now blocked.
    RateLimited,
}

#[derive(Debug, Default)]
struct ClientState {
    request_count: u64,
    blocked_until: Option<Instant>,
}

/// Shared per-IP counters and blocklist.
///
/// One mutex guards the whole table, so the increment and the threshold
/// comparison happen atomically with respect to other connections. The lock
/// is never held across an `.await`.
///
/// # Examples
///
/// ```
/// use std::net::{IpAddr, Ipv4Addr};
/// use std::time::Duration;
/// use lserve::security::{RateDecision, RateLimiter};
///
/// let limiter = RateLimiter::new(2, Duration::from_secs(60));
/// let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
///
/// assert_eq!(limiter.check_and_record(ip), RateDecision::Allowed);
/// assert_eq!(limiter.check_and_record(ip), RateDecision::Allowed);
/// assert_eq!(limiter.check_and_record(ip), RateDecision::RateLimited);
/// assert!(limiter.is_blocked(ip));
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    clients: Mutex<HashMap<IpAddr, ClientState>>,
    threshold: u64,
    block_duration: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, DEFAULT_BLOCK_DURATION)
    }
}

impl RateLimiter {
    pub fn new(threshold: u64, block_duration: Duration) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            threshold,
            block_duration,
        }
    }

    /// Returns `true` while `ip` is blocked. Does not count the request.
    ///
    /// Expired blocks are cleared here, on first access after expiry.
    pub fn is_blocked(&self, ip: IpAddr) -> bool {
        let mut clients = self.lock();
        let Some(state) = clients.get_mut(&ip) else {
            return false;
        };
        match state.blocked_until {
            Some(until) if Instant::now() < until => true,
            Some(_) => {
                state.blocked_until = None;
                debug!(%ip, count = state.request_count, "block expired");
                false
            }
            None => false,
        }
    }

    /// Counts one request from `ip` and blocks it if this one crossed the
    /// threshold.
    pub fn check_and_record(&self, ip: IpAddr) -> RateDecision {
        let mut clients = self.lock();
        let state = clients.entry(ip).or_default();
        state.request_count += 1;

        if state.request_count > self.threshold {
            state.blocked_until = Some(Instant::now() + self.block_duration);
            warn!(
                %ip,
                count = state.request_count,
                block_secs = self.block_duration.as_secs(),
                "rate limit exceeded, blocking client"
            );
            RateDecision::RateLimited
        } else {
            RateDecision::Allowed
        }
    }

    /// Total requests counted for `ip` so far.
    pub fn request_count(&self, ip: IpAddr) -> u64 {
        self.lock().get(&ip).map_or(0, |s| s.request_count)
    }

    /// Number of IPs currently holding an unexpired block.
    pub fn blocked_count(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .values()
            .filter(|s| s.blocked_until.is_some_and(|until| now < until))
            .count()
    }

    // Poisoning is ignored: every mutation is a single field write, so the
    // table is consistent even if a holder panicked.
    fn lock(&self) -> MutexGuard<'_, HashMap<IpAddr, ClientState>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
