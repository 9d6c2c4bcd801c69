//! Turns decoded CRSF telemetry into attitude/position/velocity on the bus.

#[allow(unused_imports)]
use micromath::F32Ext;

use crate::drivers::crsf::{CrsfTelemetry, GpsFix};
use crate::state::{Position, TelemetryBus, Velocity};

/// Metres per degree of latitude.
const METRES_PER_DEG: f32 = 111_319.5;
/// Fixes with fewer satellites are ignored.
const MIN_SATS: u8 = 4;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Home {
    lat_e7: i32,
    lon_e7: i32,
    alt_m: f32,
    lon_scale: f32,
}

/// Position is relative to the first usable GPS fix.
pub struct TelemetryLink {
    home: Option<Home>,
}

impl TelemetryLink {
    pub const fn new() -> Self {
        Self { home: None }
    }

    pub fn has_home(&self) -> bool {
        self.home.is_some()
    }

    pub fn apply(&mut self, msg: CrsfTelemetry, bus: &TelemetryBus) {
        match msg {
            CrsfTelemetry::Attitude(attitude) => bus.set_attitude(attitude),
            CrsfTelemetry::Gps(fix) => self.apply_gps(&fix, bus),
            CrsfTelemetry::Vario(vario) => {
                let mut velocity = bus.velocity();
                velocity.down = -vario.climb_ms;
                bus.set_velocity(velocity);
            }
        }
    }

    fn apply_gps(&mut self, fix: &GpsFix, bus: &TelemetryBus) {
        if fix.sats < MIN_SATS {
            return;
        }
        let home = *self.home.get_or_insert_with(|| {
            let lat_deg = fix.lat_e7 as f32 * 1.0e-7;
            info!("home fix with {} sats", fix.sats);
            Home {
                lat_e7: fix.lat_e7,
                lon_e7: fix.lon_e7,
                alt_m: fix.alt_m,
                lon_scale: lat_deg.to_radians().cos(),
            }
        });

        // Deltas stay small, so the i32 difference keeps full resolution in f32.
        let d_lat = fix.lat_e7.wrapping_sub(home.lat_e7) as f32 * 1.0e-7;
        let d_lon = fix.lon_e7.wrapping_sub(home.lon_e7) as f32 * 1.0e-7;
        bus.set_position(Position {
            north: d_lat * METRES_PER_DEG,
            east: d_lon * METRES_PER_DEG * home.lon_scale,
            down: home.alt_m - fix.alt_m,
        });

        let course = fix.course_deg.to_radians();
        let down = bus.velocity().down;
        bus.set_velocity(Velocity {
            north: fix.ground_speed_ms * course.cos(),
            east: fix.ground_speed_ms * course.sin(),
            down,
        });
    }
}

impl Default for TelemetryLink {
    fn default() -> Self {
        Self::new()
    }
}
