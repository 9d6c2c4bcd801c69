//! Absolute-deadline periodic scheduling.
//!
//! Deadline `n` is always `origin + (n - origin_frame) × period`, computed from
//! the origin and never from the previous wake-up, so per-iteration processing
//! time cannot accumulate into drift. An iteration that overruns its slot makes the next
//! one start immediately; no deadline is ever skipped.

use embassy_time::{Duration, Instant, Timer};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleState {
    /// Iterations started since the task began. Never reset.
    pub frame: u64,
    /// Time base for deadlines after the last rate change.
    pub origin: Instant,
    /// Value of `frame` when `origin` was taken.
    pub origin_frame: u64,
    /// Wake-up time of the previous iteration.
    pub last_sample: Instant,
}

/// One scheduled wake-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    pub frame: u64,
    pub deadline: Instant,
    pub woke_at: Instant,
    /// Real time since the previous iteration woke.
    pub dt: Duration,
}

impl Tick {
    pub fn dt_secs(&self) -> f32 {
        self.dt.as_micros() as f32 * 1.0e-6
    }

    /// How far past its deadline the iteration started.
    pub fn lateness(&self) -> Duration {
        if self.woke_at > self.deadline {
            self.woke_at - self.deadline
        } else {
            Duration::from_ticks(0)
        }
    }
}

pub struct PeriodicScheduler {
    state: CycleState,
    period: Duration,
}

impl PeriodicScheduler {
    pub fn start(origin: Instant, period: Duration) -> Self {
        Self {
            state: CycleState {
                frame: 0,
                origin,
                origin_frame: 0,
                last_sample: origin,
            },
            period,
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Deadline of iteration `frame` under the current origin and period.
    /// Frames before the last rate change map onto the origin.
    pub fn deadline(&self, frame: u64) -> Instant {
        let steps = frame.saturating_sub(self.state.origin_frame);
        self.state.origin + Duration::from_ticks(self.period.as_ticks().saturating_mul(steps))
    }

    /// Switch to a new period. The origin moves to the last deadline so the
    /// iterations already run keep their slots and the next one is exactly
    /// one new period later. The frame counter keeps counting.
    pub fn set_period(&mut self, period: Duration) {
        if period == self.period {
            return;
        }
        self.state.origin = self.deadline(self.state.frame);
        self.state.origin_frame = self.state.frame;
        self.period = period;
    }

    /// Start the next iteration and return its number and deadline.
    pub fn advance(&mut self) -> (u64, Instant) {
        self.state.frame += 1;
        (self.state.frame, self.deadline(self.state.frame))
    }

    /// Record the wake-up time and return the time since the previous one.
    pub fn record_sample(&mut self, now: Instant) -> Duration {
        let dt = if now > self.state.last_sample {
            now - self.state.last_sample
        } else {
            Duration::from_ticks(0)
        };
        self.state.last_sample = now;
        dt
    }

    /// Block until the next absolute deadline.
    pub async fn wait_next(&mut self) -> Tick {
        let (frame, deadline) = self.advance();
        Timer::at(deadline).await;
        let woke_at = Instant::now();
        let dt = self.record_sample(woke_at);
        Tick {
            frame,
            deadline,
            woke_at,
            dt,
        }
    }
}
