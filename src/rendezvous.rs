//! One-shot startup barrier: hold the perception loop until the telemetry
//! stream delivers a fresh attitude sample.
//!
//! The barrier writes [`SYNC_SENTINEL`] into `attitude.pitch` and waits until a
//! telemetry writer replaces it. Liveness depends on that writer existing; with
//! no timeout configured a silent stream keeps the task here forever, which is
//! what log replay on the bench wants.

use core::fmt;

use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Instant, Timer};

use crate::state::{Attitude, TelemetryBus};

/// Pitch in degrees that no real attitude estimate produces.
pub const SYNC_SENTINEL: f32 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "board", derive(defmt::Format))]
pub enum RendezvousError {
    /// No telemetry overwrote the sentinel before the deadline.
    Timeout,
}

impl fmt::Display for RendezvousError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RendezvousError::Timeout => f.write_str("no telemetry before timeout"),
        }
    }
}

pub struct StartupRendezvous<'a> {
    telemetry: &'a TelemetryBus,
    timeout: Option<Duration>,
}

impl<'a> StartupRendezvous<'a> {
    pub fn new(telemetry: &'a TelemetryBus, timeout: Option<Duration>) -> Self {
        Self { telemetry, timeout }
    }

    /// Publish the sentinel and wait for the first attitude that replaces it.
    ///
    /// Returns that attitude. Consumes the barrier: it runs once per task.
    pub async fn wait(self) -> Result<Attitude, RendezvousError> {
        let bus = self.telemetry;
        let deadline = self.timeout.map(|t| Instant::now() + t);

        let mut attitude = bus.attitude();
        attitude.pitch = SYNC_SENTINEL;
        bus.set_attitude(attitude);
        // Our own write raised the event; a writer racing with us is caught by
        // the value check below.
        bus.clear_attitude_written();
        debug!("waiting for telemetry");

        loop {
            let current = bus.attitude();
            if current.pitch != SYNC_SENTINEL {
                info!("telemetry synchronized, pitch={}", current.pitch);
                return Ok(current);
            }

            match deadline {
                None => bus.attitude_written().await,
                Some(deadline) => match select(bus.attitude_written(), Timer::at(deadline)).await {
                    Either::First(()) => {}
                    Either::Second(()) => {
                        // A write landing exactly at the deadline still counts.
                        let current = bus.attitude();
                        if current.pitch != SYNC_SENTINEL {
                            return Ok(current);
                        }
                        warn!("telemetry rendezvous timed out");
                        return Err(RendezvousError::Timeout);
                    }
                },
            }
        }
    }
}
