//! Debug display seam. Fire and forget: the loop logs failures and moves on.

use core::fmt;

/// Window the horizon overlay is shown in.
pub const DEBUG_WINDOW: &str = "debug";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "board", derive(defmt::Format))]
pub enum DisplayError {
    /// The sink is still busy with an earlier frame.
    Busy,
    /// Nobody is listening (host detached).
    Disconnected,
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::Busy => f.write_str("busy"),
            DisplayError::Disconnected => f.write_str("disconnected"),
        }
    }
}

pub trait DisplaySink<F> {
    fn show(&mut self, window: &str, frame: &F) -> Result<(), DisplayError>;
}
