#![macro_use]
#![allow(unused_macros)]

//! Log macros shared by the library: `defmt` on the board, the `log` facade on the host.
//!
//! Format strings must stay within what both back ends accept (`{}` with primitive arguments).

macro_rules! trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "board")]
        ::defmt::trace!($($arg)*);
        #[cfg(not(feature = "board"))]
        ::log::trace!($($arg)*);
    }};
}

macro_rules! debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "board")]
        ::defmt::debug!($($arg)*);
        #[cfg(not(feature = "board"))]
        ::log::debug!($($arg)*);
    }};
}

macro_rules! info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "board")]
        ::defmt::info!($($arg)*);
        #[cfg(not(feature = "board"))]
        ::log::info!($($arg)*);
    }};
}

macro_rules! warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "board")]
        ::defmt::warn!($($arg)*);
        #[cfg(not(feature = "board"))]
        ::log::warn!($($arg)*);
    }};
}

macro_rules! error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "board")]
        ::defmt::error!($($arg)*);
        #[cfg(not(feature = "board"))]
        ::log::error!($($arg)*);
    }};
}
