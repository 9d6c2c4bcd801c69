//! Line commands for live reconfiguration over the USB console.
//!
//! ```text
//! rate <hz>        target frame rate
//! size <w> <h>     capture geometry
//! sync <ms>        rendezvous timeout, 0 = wait forever
//! show             print the active snapshot
//! ```

use core::fmt::{self, Write};

use crate::config::{ConfigSnapshot, SettingsBus, SharedConfig, VisionSettings};

pub const LINE_CAPACITY: usize = 64;
pub const REPLY_CAPACITY: usize = 96;

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "board", derive(defmt::Format))]
pub enum Command {
    Rate(f32),
    Size(u16, u16),
    Sync(u32),
    Show,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "board", derive(defmt::Format))]
pub enum CommandError {
    Empty,
    Unknown,
    MissingArgument,
    InvalidArgument,
    /// Line longer than the console buffer.
    Overflow,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => f.write_str("empty line"),
            CommandError::Unknown => f.write_str("unknown command"),
            CommandError::MissingArgument => f.write_str("missing argument"),
            CommandError::InvalidArgument => f.write_str("invalid argument"),
            CommandError::Overflow => f.write_str("line too long"),
        }
    }
}

pub fn parse(line: &str) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let name = words.next().ok_or(CommandError::Empty)?;

    let mut arg = || words.next().ok_or(CommandError::MissingArgument);
    let command = match name {
        "rate" => Command::Rate(arg()?.parse().map_err(|_| CommandError::InvalidArgument)?),
        "size" => {
            let w = arg()?.parse().map_err(|_| CommandError::InvalidArgument)?;
            let h = arg()?.parse().map_err(|_| CommandError::InvalidArgument)?;
            Command::Size(w, h)
        }
        "sync" => Command::Sync(arg()?.parse().map_err(|_| CommandError::InvalidArgument)?),
        "show" => Command::Show,
        _ => return Err(CommandError::Unknown),
    };
    Ok(command)
}

impl Command {
    /// Apply to a settings object. `false` for read-only commands.
    pub fn apply(&self, settings: &mut VisionSettings) -> bool {
        match *self {
            Command::Rate(hz) => settings.frame_rate_hz = hz,
            Command::Size(w, h) => {
                settings.frame_width = w;
                settings.frame_height = h;
            }
            Command::Sync(ms) => settings.sync_timeout_ms = ms,
            Command::Show => return false,
        }
        true
    }
}

/// Collects bytes into lines terminated by `\n` or `\r`.
pub struct LineAssembler {
    line: heapless::String<LINE_CAPACITY>,
    overflow: bool,
}

impl LineAssembler {
    pub const fn new() -> Self {
        Self {
            line: heapless::String::new(),
            overflow: false,
        }
    }

    /// Returns a complete, non-empty line. Overlong lines are dropped whole.
    pub fn push(&mut self, b: u8) -> Option<Result<heapless::String<LINE_CAPACITY>, CommandError>> {
        if b == b'\n' || b == b'\r' {
            let line = core::mem::take(&mut self.line);
            if core::mem::take(&mut self.overflow) {
                return Some(Err(CommandError::Overflow));
            }
            return (!line.trim().is_empty()).then_some(Ok(line));
        }
        if !b.is_ascii() || self.line.push(b as char).is_err() {
            self.overflow = true;
        }
        None
    }
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}

pub fn format_snapshot(snapshot: &ConfigSnapshot) -> heapless::String<REPLY_CAPACITY> {
    let mut out = heapless::String::new();
    let _ = write!(
        out,
        "[CFG] {}x{} @ {:.1} Hz, period {} ms\r\n",
        snapshot.frame_width(),
        snapshot.frame_height(),
        snapshot.frame_rate_hz(),
        snapshot.period().as_millis()
    );
    out
}

/// Run one console line against the settings bus and build the reply.
///
/// Accepted edits reach `config` through the bus listeners before this
/// returns, so the reply shows what the perception loop will use next.
pub fn execute(
    line: Result<&str, CommandError>,
    settings: &SettingsBus,
    config: &SharedConfig,
) -> heapless::String<REPLY_CAPACITY> {
    let command = match line.and_then(parse) {
        Ok(command) => command,
        Err(e) => {
            let mut out = heapless::String::new();
            let _ = write!(out, "[ERR] {}\r\n", e);
            return out;
        }
    };

    let mut next = settings.get();
    if command.apply(&mut next) {
        settings.set(next);
        info!("console: settings updated");
    }
    format_snapshot(&config.load())
}
