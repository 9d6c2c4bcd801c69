#![cfg_attr(not(test), no_std)]

//! Periodic perception core for the flight controller: gated start, telemetry
//! rendezvous, absolute-deadline scheduling, frame retention and the
//! hot-reloadable settings around them.

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod config;
pub mod console;
pub mod cycle;
pub mod display;
pub mod drivers;
pub mod estimator;
pub mod frame;
pub mod gate;
pub mod link;
pub mod overlay;
pub mod rendezvous;
pub mod scheduler;
pub mod state;
pub mod task;
pub mod video;
