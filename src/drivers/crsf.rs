//! CRSF telemetry frames coming from the flight controller.
//!
//! Frame layout: `[Sync] [Len] [Type] [Payload...] [CRC]`, where `Len` counts
//! Type + Payload + CRC and the CRC (DVB-S2) covers Type + Payload.
//! Multi-byte fields are big endian.

use crate::state::Attitude;

pub const CRSF_SYNC: u8 = 0xC8;
pub const CRSF_FRAMETYPE_GPS: u8 = 0x02;
pub const CRSF_FRAMETYPE_VARIO: u8 = 0x09;
pub const CRSF_FRAMETYPE_ATTITUDE: u8 = 0x1E;

/// Largest legal frame: Sync + Len + 62.
const MAX_FRAME: usize = 64;
const MIN_LEN: u8 = 2;
const MAX_LEN: u8 = 62;

const GPS_PAYLOAD: usize = 15;
const VARIO_PAYLOAD: usize = 4;
const ATTITUDE_PAYLOAD: usize = 6;

// ── Decoded messages ──────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "board", derive(defmt::Format))]
pub struct GpsFix {
    /// Degrees × 10^7.
    pub lat_e7: i32,
    /// Degrees × 10^7.
    pub lon_e7: i32,
    pub ground_speed_ms: f32,
    pub course_deg: f32,
    pub alt_m: f32,
    pub sats: u8,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "board", derive(defmt::Format))]
pub struct Vario {
    pub alt_m: f32,
    /// Positive up.
    pub climb_ms: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "board", derive(defmt::Format))]
pub enum CrsfTelemetry {
    Attitude(Attitude),
    Gps(GpsFix),
    Vario(Vario),
}

// ── Parser ────────────────────────────────────────────────────────────────────

pub struct CrsfParser {
    buffer: heapless::Vec<u8, MAX_FRAME>,
}

impl CrsfParser {
    pub const fn new() -> Self {
        Self {
            buffer: heapless::Vec::new(),
        }
    }

    pub fn push_byte(&mut self, b: u8) -> Option<CrsfTelemetry> {
        if self.buffer.is_empty() {
            if b == CRSF_SYNC {
                let _ = self.buffer.push(b);
            }
            return None;
        }

        if self.buffer.len() == 1 {
            if (MIN_LEN..=MAX_LEN).contains(&b) {
                let _ = self.buffer.push(b);
            } else {
                // Bad length; a sync byte here starts a new frame.
                self.buffer.clear();
                if b == CRSF_SYNC {
                    let _ = self.buffer.push(b);
                }
            }
            return None;
        }

        let total = 2 + self.buffer[1] as usize;
        let _ = self.buffer.push(b);
        if self.buffer.len() < total {
            return None;
        }

        let frame = &self.buffer[..total];
        let body = &frame[2..total - 1];
        let decoded = if crc8_dvb_s2(body) == frame[total - 1] {
            decode(body[0], &body[1..])
        } else {
            None
        };
        self.buffer.clear();
        decoded
    }
}

impl Default for CrsfParser {
    fn default() -> Self {
        Self::new()
    }
}

fn be_i16(b: &[u8]) -> i16 {
    i16::from_be_bytes([b[0], b[1]])
}

fn be_u16(b: &[u8]) -> u16 {
    u16::from_be_bytes([b[0], b[1]])
}

fn be_i32(b: &[u8]) -> i32 {
    i32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

fn decode(frame_type: u8, payload: &[u8]) -> Option<CrsfTelemetry> {
    match frame_type {
        CRSF_FRAMETYPE_ATTITUDE if payload.len() == ATTITUDE_PAYLOAD => {
            // 100 µrad per LSB
            let angle = |raw: i16| (raw as f32 / 10_000.0).to_degrees();
            Some(CrsfTelemetry::Attitude(Attitude {
                pitch: angle(be_i16(&payload[0..2])),
                roll: angle(be_i16(&payload[2..4])),
                yaw: angle(be_i16(&payload[4..6])),
            }))
        }
        CRSF_FRAMETYPE_GPS if payload.len() == GPS_PAYLOAD => Some(CrsfTelemetry::Gps(GpsFix {
            lat_e7: be_i32(&payload[0..4]),
            lon_e7: be_i32(&payload[4..8]),
            // km/h × 10
            ground_speed_ms: be_u16(&payload[8..10]) as f32 / 36.0,
            // deg × 100
            course_deg: be_u16(&payload[10..12]) as f32 / 100.0,
            // m + 1000
            alt_m: be_u16(&payload[12..14]) as f32 - 1000.0,
            sats: payload[14],
        })),
        CRSF_FRAMETYPE_VARIO if payload.len() == VARIO_PAYLOAD => {
            let packed = be_u16(&payload[0..2]);
            // MSB clear: decimetres with a 10000 dm offset. MSB set: metres.
            let alt_m = if packed & 0x8000 == 0 {
                (packed as f32 - 10_000.0) / 10.0
            } else {
                (packed & 0x7FFF) as f32
            };
            Some(CrsfTelemetry::Vario(Vario {
                alt_m,
                climb_ms: be_i16(&payload[2..4]) as f32 / 100.0,
            }))
        }
        _ => None,
    }
}

/// Serialize one frame into `buf`. Returns the byte count, 0 if `buf` is too small.
pub fn build_frame(buf: &mut [u8], frame_type: u8, payload: &[u8]) -> usize {
    let len = payload.len() + 2;
    if len > MAX_LEN as usize || buf.len() < len + 2 {
        return 0;
    }
    buf[0] = CRSF_SYNC;
    buf[1] = len as u8;
    buf[2] = frame_type;
    buf[3..3 + payload.len()].copy_from_slice(payload);
    buf[3 + payload.len()] = crc8_dvb_s2(&buf[2..3 + payload.len()]);
    len + 2
}

pub fn crc8_dvb_s2(data: &[u8]) -> u8 {
    data.iter().fold(0, |crc, &b| crc8_dvb_s2_update(crc, b))
}

pub fn crc8_dvb_s2_update(crc: u8, b: u8) -> u8 {
    let mut crc = crc ^ b;
    for _ in 0..8 {
        crc = if crc & 0x80 != 0 { (crc << 1) ^ 0xD5 } else { crc << 1 };
    }
    crc
}
