//! Rate limiter for WebSocket message handling.
//!
//! Limits the number of frames a client can send within a time window so a
//! single connection cannot flood its room actor.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Rate limiter using a sliding window algorithm
#[derive(Debug)]
pub struct RateLimiter {
    /// Timestamps of recent requests
    timestamps: VecDeque<Instant>,
    /// Maximum number of requests allowed in the window
    max_requests: usize,
    /// Time window for rate limiting
    window: Duration,
    /// Label used in logs and metrics
    name: &'static str,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Arguments
    ///
    /// * `name` - Label reported when the limit is hit
    /// * `max_requests` - Maximum number of requests allowed in the time window
    /// * `window` - Time window duration
    ///
    /// # Example
    ///
    /// ```
    /// use checkers_server::api::rate_limiter::RateLimiter;
    /// use std::time::Duration;
    ///
    /// // Allow 10 requests per second
    /// let limiter = RateLimiter::new("burst", 10, Duration::from_secs(1));
    /// assert_eq!(limiter.remaining(), 10);
    /// ```
    pub fn new(name: &'static str, max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: VecDeque::with_capacity(max_requests),
            max_requests,
            window,
            name,
        }
    }

    /// Create a rate limiter for burst protection (10 messages per second)
    pub fn burst() -> Self {
        Self::new("burst", 10, Duration::from_secs(1))
    }

    /// Create a rate limiter for sustained usage (100 messages per minute)
    pub fn sustained() -> Self {
        Self::new("sustained", 100, Duration::from_secs(60))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Check if a request should be allowed
    ///
    /// Returns `true` if the request is allowed, `false` if rate limit exceeded.
    /// Rejected requests are not recorded.
    ///
    /// # Example
    ///
    /// ```
    /// # use checkers_server::api::rate_limiter::RateLimiter;
    /// # use std::time::Duration;
    /// let mut limiter = RateLimiter::new("test", 5, Duration::from_secs(1));
    ///
    /// for _ in 0..5 {
    ///     assert!(limiter.check());
    /// }
    ///
    /// assert!(!limiter.check());
    /// ```
    pub fn check(&mut self) -> bool {
        let now = Instant::now();

        while let Some(ts) = self.timestamps.front() {
            if now.duration_since(*ts) > self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }

        if self.timestamps.len() >= self.max_requests {
            return false;
        }

        self.timestamps.push_back(now);
        true
    }

    /// Get the number of remaining requests allowed in the current window
    pub fn remaining(&self) -> usize {
        self.max_requests.saturating_sub(self.timestamps.len())
    }
}

/// Both windows a WebSocket connection is held to.
#[derive(Debug)]
pub struct ConnectionLimits {
    burst: RateLimiter,
    sustained: RateLimiter,
}

impl ConnectionLimits {
    pub fn new() -> Self {
        Self {
            burst: RateLimiter::burst(),
            sustained: RateLimiter::sustained(),
        }
    }

    /// Admit one frame.
    ///
    /// # Returns
    ///
    /// * `Err(name)` - Label of the first limiter that rejected the frame
    pub fn admit(&mut self) -> Result<(), &'static str> {
        if !self.burst.check() {
            return Err(self.burst.name());
        }
        if !self.sustained.check() {
            return Err(self.sustained.name());
        }
        Ok(())
    }
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self::new()
    }
}
