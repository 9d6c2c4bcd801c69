//! Boot-time activation of the vision module from the hardware settings bitmap.

use crate::config::{ConfigError, SettingsBus, SettingsListener, SharedConfig};

/// Entries in the optional-modules bitmap.
pub const OPTIONAL_MODULES_LEN: usize = 8;

/// Raw value stored for an enabled module. Anything else reads as disabled,
/// including erased flash (0xFF).
pub const MODULE_ENABLED_RAW: u8 = 1;

/// Slot of each optional module in the bitmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "board", derive(defmt::Format))]
pub enum OptionalModule {
    CameraStab = 0,
    Gps = 1,
    UsbBridge = 2,
    Altitude = 3,
    Airspeed = 4,
    TxPid = 5,
    Vision = 6,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "board", derive(defmt::Format))]
pub enum ModuleState {
    #[default]
    Disabled,
    Enabled,
}

impl ModuleState {
    pub fn from_raw(raw: u8) -> Self {
        if raw == MODULE_ENABLED_RAW {
            ModuleState::Enabled
        } else {
            ModuleState::Disabled
        }
    }
}

/// System-wide hardware settings, read once at boot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HwSettings {
    optional_modules: [ModuleState; OPTIONAL_MODULES_LEN],
}

impl HwSettings {
    pub const fn all_disabled() -> Self {
        Self {
            optional_modules: [ModuleState::Disabled; OPTIONAL_MODULES_LEN],
        }
    }

    /// Decode the raw bitmap. Missing trailing bytes read as disabled.
    pub fn from_bytes(raw: &[u8]) -> Self {
        let mut settings = Self::all_disabled();
        for (slot, &b) in settings.optional_modules.iter_mut().zip(raw) {
            *slot = ModuleState::from_raw(b);
        }
        settings
    }

    pub fn with(mut self, module: OptionalModule, state: ModuleState) -> Self {
        self.optional_modules[module as usize] = state;
        self
    }

    pub fn module(&self, module: OptionalModule) -> ModuleState {
        self.optional_modules[module as usize]
    }
}

/// Outcome of [`ActivationGate::start`].
#[derive(Debug, PartialEq, Eq)]
pub enum Activation<T> {
    Disabled,
    Started(T),
}

/// Decides once whether the perception task exists at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivationGate {
    enabled: bool,
}

impl ActivationGate {
    pub fn initialize(hw: &HwSettings) -> Self {
        Self {
            enabled: hw.module(OptionalModule::Vision) == ModuleState::Enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// When enabled: subscribe `config` to `settings`, refresh it once, then
    /// run `spawn`. When disabled nothing is touched and `spawn` never runs.
    pub fn start<T>(
        &self,
        settings: &'static SettingsBus,
        config: &'static SharedConfig,
        spawn: impl FnOnce() -> T,
    ) -> Result<Activation<T>, ConfigError> {
        if !self.enabled {
            info!("vision module disabled");
            return Ok(Activation::Disabled);
        }

        settings.connect(config)?;
        config.on_settings_changed(settings);
        info!("vision module enabled");
        Ok(Activation::Started(spawn()))
    }
}
