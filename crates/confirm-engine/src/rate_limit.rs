//! Sliding-window limiting of auto-approvals.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Length of the rolling window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Capacity gate consulted before pattern evaluation.
///
/// Implementations are driven from inside the engine's state lock, so they
/// need no synchronization of their own.
pub trait RateLimiter: Send {
    /// Drop expired entries, then report whether another approval fits under
    /// `max_per_minute`.
    fn has_capacity(&mut self, max_per_minute: u32) -> bool;

    /// Record one approval at the current instant.
    fn consume(&mut self);

    /// Forget every recorded approval.
    fn reset(&mut self);
}

/// Stores the instant of every approval in the trailing [`WINDOW`].
///
/// Pruning is lazy: expired entries are removed on each capacity check, not
/// on a timer.
#[derive(Debug, Default)]
pub struct SlidingWindowLimiter {
    approvals: VecDeque<Instant>,
}

impl SlidingWindowLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// [`RateLimiter::has_capacity`] evaluated at `now`.
    pub fn has_capacity_at(&mut self, max_per_minute: u32, now: Instant) -> bool {
        self.prune(now);
        self.approvals.len() < max_per_minute as usize
    }

    /// [`RateLimiter::consume`] recorded at `now`.
    pub fn consume_at(&mut self, now: Instant) {
        self.approvals.push_back(now);
    }

    /// Approvals currently held. May include expired entries until the next
    /// capacity check.
    pub fn len(&self) -> usize {
        self.approvals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.approvals.is_empty()
    }

    fn prune(&mut self, now: Instant) {
        // Entries are appended in order, so expired ones sit at the front.
        while let Some(&oldest) = self.approvals.front() {
            if now.saturating_duration_since(oldest) >= WINDOW {
                self.approvals.pop_front();
            } else {
                break;
            }
        }
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn has_capacity(&mut self, max_per_minute: u32) -> bool {
        self.has_capacity_at(max_per_minute, Instant::now())
    }

    fn consume(&mut self) {
        self.consume_at(Instant::now());
    }

    fn reset(&mut self) {
        self.approvals.clear();
    }
}
