//! Adaptive rate limiting for outgoing registry commands
//!
//! The registry throttles clients with an unpublished, self-adjusting limit.
//! The limiter keeps well inside it: a short spacing while traffic is bursty,
//! a longer one once traffic has been sustained for a while, and a fresh
//! session after a long idle period.
//!
//! One limiter instance belongs to one authenticated session and is owned by
//! the [`ConnectionHandler`](crate::protocol::connection::ConnectionHandler).

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Spacing and session thresholds for the limiter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Minimum spacing while the active span is short
    pub short_spacing_ms: u64,
    /// Minimum spacing once traffic has been sustained
    pub long_spacing_ms: u64,
    /// Active span after which the long spacing applies
    pub sustained_after_secs: u64,
    /// Idle gap after which the active span starts over
    pub reset_after_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            short_spacing_ms: 2_500,
            long_spacing_ms: 4_500,
            sustained_after_secs: 60 * 60,
            reset_after_secs: 30 * 60,
        }
    }
}

impl RateLimitConfig {
    pub fn short_spacing(&self) -> Duration {
        Duration::from_millis(self.short_spacing_ms)
    }

    pub fn long_spacing(&self) -> Duration {
        Duration::from_millis(self.long_spacing_ms)
    }

    pub fn sustained_after(&self) -> Duration {
        Duration::from_secs(self.sustained_after_secs)
    }

    pub fn reset_after(&self) -> Duration {
        Duration::from_secs(self.reset_after_secs)
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveWindow {
    first_request_at: Instant,
    last_request_at: Instant,
}

/// Decision taken for one send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    /// How long the caller must wait before sending
    pub delay: Duration,
    /// Minimum spacing that applied to this send
    pub spacing: Duration,
    /// Whether this send opened a new active session
    pub new_session: bool,
}

/// Point-in-time view of the limiter, for status displays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterSnapshot {
    pub first_request_at: Option<Instant>,
    pub last_request_at: Option<Instant>,
    pub current_spacing: Duration,
}

/// Rate limiter enforcing the adaptive spacing between sends
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    window: Mutex<Option<ActiveWindow>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            window: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Wait until the next command may be sent.
    ///
    /// Must be called immediately before every physical send. Dropping the
    /// returned future while it sleeps abandons the send; the slot stays
    /// reserved, which only errs on the side of sending later.
    pub async fn ensure(&self) {
        let reservation = self.reserve(Instant::now());
        if reservation.delay.is_zero() {
            trace!("Rate limiter: no wait needed");
            return;
        }

        debug!(
            "Rate limiter: waiting {:?} (spacing {:?})",
            reservation.delay, reservation.spacing
        );
        sleep(reservation.delay).await;
    }

    /// Decide the delay for a send requested at `now` and record it.
    ///
    /// The delay is either zero or the full spacing; it is never trimmed by
    /// the time already elapsed. The recorded send time is `now` plus the
    /// delay, so the next decision measures from the moment this caller is
    /// actually released.
    pub fn reserve(&self, now: Instant) -> Reservation {
        let mut guard = self.window.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(window) = guard.as_mut() else {
            *guard = Some(ActiveWindow {
                first_request_at: now,
                last_request_at: now,
            });
            trace!("Rate limiter: first request of the session");
            return Reservation {
                delay: Duration::ZERO,
                spacing: self.config.short_spacing(),
                new_session: true,
            };
        };

        let idle_gap = now.saturating_duration_since(window.last_request_at);
        let new_session = idle_gap > self.config.reset_after();
        if new_session {
            debug!("Rate limiter: idle for {idle_gap:?}, starting a new active session");
            window.first_request_at = now;
        }

        let active_span = now.saturating_duration_since(window.first_request_at);
        let spacing = self.spacing_for(active_span);
        let delay = if idle_gap >= spacing {
            Duration::ZERO
        } else {
            spacing
        };

        window.last_request_at = now + delay;
        trace!(
            "Rate limiter: idle {idle_gap:?}, active {active_span:?}, spacing {spacing:?}, delay {delay:?}"
        );

        Reservation {
            delay,
            spacing,
            new_session,
        }
    }

    /// Current timestamps and the spacing a send right now would use
    pub fn snapshot(&self) -> RateLimiterSnapshot {
        let window = *self.window.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        let current_spacing = match window {
            Some(w) if now.saturating_duration_since(w.last_request_at) <= self.config.reset_after() => {
                self.spacing_for(now.saturating_duration_since(w.first_request_at))
            }
            _ => self.config.short_spacing(),
        };

        RateLimiterSnapshot {
            first_request_at: window.map(|w| w.first_request_at),
            last_request_at: window.map(|w| w.last_request_at),
            current_spacing,
        }
    }

    fn spacing_for(&self, active_span: Duration) -> Duration {
        if active_span > self.config.sustained_after() {
            self.config.long_spacing()
        } else {
            self.config.short_spacing()
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
