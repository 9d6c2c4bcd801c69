//! Telemetry types shared between the link tasks and the perception loop.
//!
//! All types are `Copy` so a reader always takes a whole sample out of the bus.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;

// ── Data types ────────────────────────────────────────────────────────────────

/// Vehicle attitude in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "board", derive(defmt::Format))]
pub struct Attitude {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl Attitude {
    pub const ZERO: Self = Self { roll: 0.0, pitch: 0.0, yaw: 0.0 };
}

/// Position in metres, north/east/down from the home fix.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "board", derive(defmt::Format))]
pub struct Position {
    pub north: f32,
    pub east: f32,
    pub down: f32,
}

impl Position {
    pub const ZERO: Self = Self { north: 0.0, east: 0.0, down: 0.0 };
}

/// Velocity in m/s, north/east/down.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "board", derive(defmt::Format))]
pub struct Velocity {
    pub north: f32,
    pub east: f32,
    pub down: f32,
}

impl Velocity {
    pub const ZERO: Self = Self { north: 0.0, east: 0.0, down: 0.0 };
}

/// One read of the whole bus, valid for a single iteration.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "board", derive(defmt::Format))]
pub struct TelemetrySample {
    pub attitude: Attitude,
    pub position: Position,
    pub velocity: Velocity,
}

// ── Bus ───────────────────────────────────────────────────────────────────────

/// Latest-value store for attitude, position and velocity.
///
/// Writers are the link tasks (CRSF today, log replay on the bench); every
/// attitude write also raises `attitude_written` so a waiter does not have to spin.
pub struct TelemetryBus {
    attitude: Mutex<CriticalSectionRawMutex, Cell<Attitude>>,
    position: Mutex<CriticalSectionRawMutex, Cell<Position>>,
    velocity: Mutex<CriticalSectionRawMutex, Cell<Velocity>>,
    attitude_written: Signal<CriticalSectionRawMutex, ()>,
}

impl TelemetryBus {
    pub const fn new() -> Self {
        Self {
            attitude: Mutex::new(Cell::new(Attitude::ZERO)),
            position: Mutex::new(Cell::new(Position::ZERO)),
            velocity: Mutex::new(Cell::new(Velocity::ZERO)),
            attitude_written: Signal::new(),
        }
    }

    pub fn attitude(&self) -> Attitude {
        self.attitude.lock(|a| a.get())
    }

    pub fn set_attitude(&self, attitude: Attitude) {
        self.attitude.lock(|a| a.set(attitude));
        self.attitude_written.signal(());
    }

    pub fn position(&self) -> Position {
        self.position.lock(|p| p.get())
    }

    pub fn set_position(&self, position: Position) {
        self.position.lock(|p| p.set(position));
    }

    pub fn velocity(&self) -> Velocity {
        self.velocity.lock(|v| v.get())
    }

    pub fn set_velocity(&self, velocity: Velocity) {
        self.velocity.lock(|v| v.set(velocity));
    }

    pub fn sample(&self) -> TelemetrySample {
        TelemetrySample {
            attitude: self.attitude(),
            position: self.position(),
            velocity: self.velocity(),
        }
    }

    /// Completes once an attitude write happened since the last wait.
    ///
    /// Only one task may wait at a time.
    pub async fn attitude_written(&self) {
        self.attitude_written.wait().await
    }

    pub(crate) fn clear_attitude_written(&self) {
        self.attitude_written.reset();
    }
}

impl Default for TelemetryBus {
    fn default() -> Self {
        Self::new()
    }
}
