//! Progress synthesis for asset loads.
//!
//! Raw progress samples arrive in bursts (a network chunk, a cache hit, a
//! finished parse). [`ProgressAnimator`] turns a jump into a short ramp of
//! evenly spaced values, and [`ProgressTracker`] guarantees the published
//! stream never goes backwards and reaches 100 exactly once.
//!
//! Animators are frame-driven: the owner feeds elapsed time into
//! [`ProgressAnimator::advance`] from its update loop, so dropping or
//! cancelling the animator is all it takes to stop further callbacks.

use std::time::Duration;

/// Number of evenly spaced values a ramp passes through.
pub const ANIMATION_STEPS: u32 = 20;

/// Upper bound of progress.
pub const PROGRESS_COMPLETE: u8 = 100;

/// A cancellable ramp from one progress value to another.
#[derive(Debug, Clone)]
pub struct ProgressAnimator {
    from: u8,
    to: u8,
    duration: Duration,
    elapsed: Duration,
    /// Steps already delivered to the sink.
    delivered: u32,
    cancelled: bool,
}

impl ProgressAnimator {
    /// Create a ramp from `from` to `to` over `duration`.
    ///
    /// A ramp never moves backwards: `to` below `from` is raised to `from`.
    #[must_use]
    pub fn new(from: u8, to: u8, duration: Duration) -> Self {
        let from = from.min(PROGRESS_COMPLETE);
        Self {
            from,
            to: to.clamp(from, PROGRESS_COMPLETE),
            duration,
            elapsed: Duration::ZERO,
            delivered: 0,
            cancelled: false,
        }
    }

    /// The value this ramp resolves at.
    #[must_use]
    pub fn target(&self) -> u8 {
        self.to
    }

    /// Whether the ramp has delivered its final value or was cancelled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.cancelled || self.delivered > ANIMATION_STEPS
    }

    /// Stop the ramp; no further values are delivered.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// The value at step `step` of [`ANIMATION_STEPS`].
    fn value_at(&self, step: u32) -> u8 {
        let span = f64::from(self.to - self.from);
        let value = f64::from(self.from) + span * f64::from(step) / f64::from(ANIMATION_STEPS);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let value = value.round() as u8;
        value.min(self.to)
    }

    /// Advance the ramp by `delta`, delivering every step that became due.
    ///
    /// Step 0 (the start value) is due immediately and the last step at
    /// `duration`. Returns the time left over once the ramp finishes, so the
    /// owner can carry it into the next ramp.
    pub fn advance(&mut self, delta: Duration, mut sink: impl FnMut(u8)) -> Duration {
        if self.is_finished() {
            return delta;
        }

        self.elapsed += delta;
        let due = if self.duration.is_zero() || self.elapsed >= self.duration {
            ANIMATION_STEPS
        } else {
            let fraction = self.elapsed.as_secs_f64() / self.duration.as_secs_f64();
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let step = (fraction * f64::from(ANIMATION_STEPS)).floor() as u32;
            step.min(ANIMATION_STEPS)
        };

        while self.delivered <= due {
            sink(self.value_at(self.delivered));
            self.delivered += 1;
        }

        if self.is_finished() {
            self.elapsed.saturating_sub(self.duration)
        } else {
            Duration::ZERO
        }
    }
}

/// Publishes a monotonic progress stream for one load.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    current: u8,
}

impl ProgressTracker {
    /// The last published value.
    #[must_use]
    pub fn current(&self) -> u8 {
        self.current
    }

    /// Whether the stream has reached 100.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.current == PROGRESS_COMPLETE
    }

    /// Offer a new sample; returns it if it was published.
    ///
    /// Samples that do not increase the value are dropped, which is what
    /// keeps the stream non-decreasing and 100 unique.
    pub fn offer(&mut self, value: u8) -> Option<u8> {
        let value = value.min(PROGRESS_COMPLETE);
        (value > self.current).then(|| {
            self.current = value;
            value
        })
    }

    /// Return to 0 after a failed load.
    ///
    /// Returns `Some(0)` if the value changed.
    pub fn reset(&mut self) -> Option<u8> {
        (self.current != 0).then(|| {
            self.current = 0;
            0
        })
    }
}
