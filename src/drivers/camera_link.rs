//! Serial camera framing.
//!
//! Camera → board, one frame:
//! `[0xA5] [0x5A] [width u16 LE] [height u16 LE] [width×height luma bytes] [CRC]`
//!
//! Board → camera, geometry request:
//! `[0xA5] [0x5B] [width u16 LE] [height u16 LE] [CRC]`
//!
//! The CRC is DVB-S2 over everything after the two sync bytes.

use crate::drivers::crsf::{crc8_dvb_s2, crc8_dvb_s2_update};
use crate::frame::Frame;

pub const SYNC: u8 = 0xA5;
pub const KIND_FRAME: u8 = 0x5A;
pub const KIND_GEOMETRY: u8 = 0x5B;

const HEADER_LEN: usize = 4;
pub const GEOMETRY_REQUEST_LEN: usize = 2 + HEADER_LEN + 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Sync,
    Kind,
    Header { got: usize },
    Pixels { written: usize },
    Crc,
}

/// Assembles frames in place into a single capture buffer.
///
/// The buffer is reused: as soon as the next frame header arrives the
/// previous frame is no longer available.
pub struct FrameAssembler<const N: usize> {
    state: State,
    header: [u8; HEADER_LEN],
    crc: u8,
    frame: Frame<N>,
    ready: bool,
}

impl<const N: usize> FrameAssembler<N> {
    pub const fn new() -> Self {
        Self {
            state: State::Sync,
            header: [0; HEADER_LEN],
            crc: 0,
            frame: Frame::new(),
            ready: false,
        }
    }

    pub fn frame(&self) -> Option<&Frame<N>> {
        self.ready.then_some(&self.frame)
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Stop handing out the last completed frame. Assembly in progress
    /// continues.
    pub fn invalidate(&mut self) {
        self.ready = false;
    }

    /// Feed received bytes. Returns `true` when they completed a frame; bytes
    /// after the end of that frame are dropped (the camera idles the line
    /// between frames).
    pub fn push(&mut self, data: &[u8]) -> bool {
        let mut i = 0;
        while i < data.len() {
            match self.state {
                State::Sync => {
                    if data[i] == SYNC {
                        self.state = State::Kind;
                    }
                    i += 1;
                }
                State::Kind => {
                    self.state = match data[i] {
                        KIND_FRAME => {
                            self.ready = false;
                            self.crc = 0;
                            State::Header { got: 0 }
                        }
                        SYNC => State::Kind,
                        _ => State::Sync,
                    };
                    i += 1;
                }
                State::Header { got } => {
                    self.header[got] = data[i];
                    self.crc = crc8_dvb_s2_update(self.crc, data[i]);
                    i += 1;
                    self.state = if got + 1 < HEADER_LEN {
                        State::Header { got: got + 1 }
                    } else {
                        self.begin_pixels()
                    };
                }
                State::Pixels { written } => {
                    let total = self.frame.pixels().len();
                    let n = (total - written).min(data.len() - i);
                    let chunk = &data[i..i + n];
                    self.frame.pixels_mut()[written..written + n].copy_from_slice(chunk);
                    self.crc = chunk.iter().fold(self.crc, |c, &b| crc8_dvb_s2_update(c, b));
                    i += n;
                    self.state = if written + n == total {
                        State::Crc
                    } else {
                        State::Pixels { written: written + n }
                    };
                }
                State::Crc => {
                    let ok = data[i] == self.crc;
                    i += 1;
                    self.state = State::Sync;
                    if ok {
                        self.ready = true;
                        return true;
                    }
                    debug!("camera frame crc mismatch");
                }
            }
        }
        false
    }

    fn begin_pixels(&mut self) -> State {
        let width = u16::from_le_bytes([self.header[0], self.header[1]]);
        let height = u16::from_le_bytes([self.header[2], self.header[3]]);
        if width == 0 || height == 0 || !self.frame.reshape(width, height, 0) {
            debug!("camera frame {}x{} rejected", width, height);
            return State::Sync;
        }
        State::Pixels { written: 0 }
    }
}

impl<const N: usize> Default for FrameAssembler<N> {
    fn default() -> Self {
        Self::new()
    }
}

pub fn encode_geometry_request(width: u16, height: u16) -> [u8; GEOMETRY_REQUEST_LEN] {
    let mut buf = [0u8; GEOMETRY_REQUEST_LEN];
    buf[0] = SYNC;
    buf[1] = KIND_GEOMETRY;
    buf[2..4].copy_from_slice(&width.to_le_bytes());
    buf[4..6].copy_from_slice(&height.to_le_bytes());
    buf[6] = crc8_dvb_s2(&buf[2..6]);
    buf
}
