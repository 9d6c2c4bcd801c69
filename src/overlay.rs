//! Artificial-horizon overlay drawn onto the retained frame.

#[allow(unused_imports)]
use micromath::F32Ext;

use crate::frame::Frame;
use crate::state::Attitude;

/// Luma of the horizon line (yellow on a colour display).
pub const HORIZON_LUMA: u8 = 226;
/// Line thickness in pixels.
pub const HORIZON_THICKNESS: i32 = 3;
/// Pitch that moves the line by one full frame height.
const PITCH_SPAN_DEG: f32 = 60.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "board", derive(defmt::Format))]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "board", derive(defmt::Format))]
pub struct HorizonLine {
    pub left: Point,
    pub right: Point,
}

impl HorizonLine {
    /// Line through the frame centre shifted down by pitch and rotated by roll.
    /// Its half-length is a third of the shorter frame side.
    pub fn from_attitude(attitude: &Attitude, width: u16, height: u16) -> Self {
        let w = width as f32;
        let h = height as f32;

        let center = Point {
            x: (width / 2) as i32,
            y: ((height / 2) as f32 + attitude.pitch * h / PITCH_SPAN_DEG) as i32,
        };

        let half = w.min(h) / 3.0;
        let roll = attitude.roll.to_radians();
        let dx = (half * roll.cos()).round() as i32;
        let dy = (-half * roll.sin()).round() as i32;

        Self {
            left: Point { x: center.x - dx, y: center.y - dy },
            right: Point { x: center.x + dx, y: center.y + dy },
        }
    }

    /// Rasterize with Bresenham, stamping a square brush at every step.
    pub fn draw<const N: usize>(&self, frame: &mut Frame<N>) {
        let (mut x, mut y) = (self.left.x, self.left.y);
        let (x1, y1) = (self.right.x, self.right.y);
        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            stamp(frame, x, y);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}

fn stamp<const N: usize>(frame: &mut Frame<N>, x: i32, y: i32) {
    let r = HORIZON_THICKNESS / 2;
    for oy in -r..=r {
        for ox in -r..=r {
            frame.set(x + ox, y + oy, HORIZON_LUMA);
        }
    }
}
