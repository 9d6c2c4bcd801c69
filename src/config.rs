//! Vision settings object, the change-notification bus around it, and the
//! immutable snapshot the perception loop reads once per iteration.

use core::cell::{Cell, RefCell};
use core::fmt;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::Duration;

// ── Defaults and limits ───────────────────────────────────────────────────────

pub const DEFAULT_FRAME_WIDTH: u16 = 160;
pub const DEFAULT_FRAME_HEIGHT: u16 = 120;
pub const DEFAULT_FRAME_RATE_HZ: f32 = 30.0;
/// 0 = wait for telemetry forever.
pub const DEFAULT_SYNC_TIMEOUT_MS: u32 = 0;

/// Upper bound keeps the rounded period at 1 ms or more.
pub const MAX_FRAME_RATE_HZ: f32 = 1000.0;
/// Listener slots on the settings bus.
pub const MAX_LISTENERS: usize = 4;

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "board", derive(defmt::Format))]
pub enum ConfigError {
    /// Width or height is zero.
    EmptyFrame,
    /// width × height does not fit the capture buffer.
    FrameTooLarge,
    /// Rate is not finite or outside (0, MAX_FRAME_RATE_HZ].
    FrameRate,
    /// All listener slots on the bus are taken.
    TooManyListeners,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyFrame => f.write_str("frame dimensions must be non-zero"),
            ConfigError::FrameTooLarge => f.write_str("frame does not fit the capture buffer"),
            ConfigError::FrameRate => f.write_str("frame rate out of range"),
            ConfigError::TooManyListeners => f.write_str("no free listener slot"),
        }
    }
}

// ── Settings object ───────────────────────────────────────────────────────────

/// The mutable settings object, as edited from the console.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "board", derive(defmt::Format))]
pub struct VisionSettings {
    pub frame_width: u16,
    pub frame_height: u16,
    pub frame_rate_hz: f32,
    pub sync_timeout_ms: u32,
}

impl VisionSettings {
    pub const DEFAULT: Self = Self {
        frame_width: DEFAULT_FRAME_WIDTH,
        frame_height: DEFAULT_FRAME_HEIGHT,
        frame_rate_hz: DEFAULT_FRAME_RATE_HZ,
        sync_timeout_ms: DEFAULT_SYNC_TIMEOUT_MS,
    };
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// Validated, read-only view of the settings.
///
/// Only built through [`ConfigSnapshot::from_settings`], so `frame_rate_hz` is
/// always finite and positive and the frame is never empty.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "board", derive(defmt::Format))]
pub struct ConfigSnapshot {
    frame_width: u16,
    frame_height: u16,
    frame_rate_hz: f32,
    sync_timeout_ms: u32,
}

impl ConfigSnapshot {
    pub const DEFAULT: Self = Self {
        frame_width: DEFAULT_FRAME_WIDTH,
        frame_height: DEFAULT_FRAME_HEIGHT,
        frame_rate_hz: DEFAULT_FRAME_RATE_HZ,
        sync_timeout_ms: DEFAULT_SYNC_TIMEOUT_MS,
    };

    pub fn from_settings(settings: &VisionSettings, max_pixels: usize) -> Result<Self, ConfigError> {
        if settings.frame_width == 0 || settings.frame_height == 0 {
            return Err(ConfigError::EmptyFrame);
        }
        if settings.frame_width as usize * settings.frame_height as usize > max_pixels {
            return Err(ConfigError::FrameTooLarge);
        }
        let hz = settings.frame_rate_hz;
        if !hz.is_finite() || hz <= 0.0 || hz > MAX_FRAME_RATE_HZ {
            return Err(ConfigError::FrameRate);
        }
        Ok(Self {
            frame_width: settings.frame_width,
            frame_height: settings.frame_height,
            frame_rate_hz: hz,
            sync_timeout_ms: settings.sync_timeout_ms,
        })
    }

    pub fn frame_width(&self) -> u16 {
        self.frame_width
    }

    pub fn frame_height(&self) -> u16 {
        self.frame_height
    }

    pub fn frame_rate_hz(&self) -> f32 {
        self.frame_rate_hz
    }

    /// Iteration period, `round(1000 / frame_rate_hz)` milliseconds.
    pub fn period(&self) -> Duration {
        let ms = (1000.0 / self.frame_rate_hz + 0.5) as u64;
        Duration::from_millis(ms.max(1))
    }

    /// `None` means the startup rendezvous waits without bound.
    pub fn sync_timeout(&self) -> Option<Duration> {
        match self.sync_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms as u64)),
        }
    }
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ── Settings bus ──────────────────────────────────────────────────────────────

/// Receiver of "settings changed" notifications.
///
/// Called from whichever context performed the update; implementations must
/// not block.
pub trait SettingsListener: Sync {
    fn on_settings_changed(&self, bus: &SettingsBus);
}

/// Owner of the settings object. Every update notifies all connected
/// listeners, which re-read the whole object.
pub struct SettingsBus {
    settings: Mutex<CriticalSectionRawMutex, Cell<VisionSettings>>,
    listeners: Mutex<CriticalSectionRawMutex, RefCell<heapless::Vec<&'static dyn SettingsListener, MAX_LISTENERS>>>,
}

impl SettingsBus {
    pub const fn new(initial: VisionSettings) -> Self {
        Self {
            settings: Mutex::new(Cell::new(initial)),
            listeners: Mutex::new(RefCell::new(heapless::Vec::new())),
        }
    }

    pub fn get(&self) -> VisionSettings {
        self.settings.lock(|s| s.get())
    }

    pub fn connect(&self, listener: &'static dyn SettingsListener) -> Result<(), ConfigError> {
        self.listeners
            .lock(|l| l.borrow_mut().push(listener))
            .map_err(|_| ConfigError::TooManyListeners)
    }

    /// Edit the settings object in place, then notify listeners.
    pub fn update(&self, edit: impl FnOnce(&mut VisionSettings)) {
        self.settings.lock(|s| {
            let mut settings = s.get();
            edit(&mut settings);
            s.set(settings);
        });
        self.notify();
    }

    pub fn set(&self, settings: VisionSettings) {
        self.update(|s| *s = settings);
    }

    fn notify(&self) {
        // Copy the list out so listeners run outside the critical section.
        let listeners = self.listeners.lock(|l| l.borrow().clone());
        for listener in listeners.iter() {
            listener.on_settings_changed(self);
        }
    }
}

impl Default for SettingsBus {
    fn default() -> Self {
        Self::new(VisionSettings::DEFAULT)
    }
}

// ── Shared snapshot ───────────────────────────────────────────────────────────

/// The single published [`ConfigSnapshot`], replaced whole on every accepted
/// settings change.
pub struct SharedConfig {
    snapshot: Mutex<CriticalSectionRawMutex, Cell<ConfigSnapshot>>,
    max_pixels: usize,
}

impl SharedConfig {
    /// `max_pixels` is the capture buffer capacity settings are checked against.
    pub const fn new(max_pixels: usize) -> Self {
        Self {
            snapshot: Mutex::new(Cell::new(ConfigSnapshot::DEFAULT)),
            max_pixels,
        }
    }

    /// Consistent copy of the current snapshot.
    pub fn load(&self) -> ConfigSnapshot {
        self.snapshot.lock(|s| s.get())
    }

    /// Validate `settings` and publish them. On error the old snapshot stays.
    pub fn publish(&self, settings: &VisionSettings) -> Result<ConfigSnapshot, ConfigError> {
        let snapshot = ConfigSnapshot::from_settings(settings, self.max_pixels)?;
        self.snapshot.lock(|s| s.set(snapshot));
        Ok(snapshot)
    }
}

impl SettingsListener for SharedConfig {
    fn on_settings_changed(&self, bus: &SettingsBus) {
        match self.publish(&bus.get()) {
            Ok(s) => debug!(
                "settings: {}x{} @ {} Hz",
                s.frame_width(),
                s.frame_height(),
                s.frame_rate_hz()
            ),
            Err(e) => warn!("settings rejected: {}", e),
        }
    }
}
