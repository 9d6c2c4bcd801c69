// tests/test_gate.rs: Boot-time activation of the vision module.

use std::cell::Cell;

use flight_vision::config::{SettingsBus, SharedConfig};
use flight_vision::gate::{
    Activation, ActivationGate, HwSettings, ModuleState, OptionalModule, OPTIONAL_MODULES_LEN,
};
use flight_vision::state::{Attitude, TelemetryBus};

fn leak<T>(value: T) -> &'static T {
    Box::leak(Box::new(value))
}

fn vision(state: ModuleState) -> HwSettings {
    HwSettings::all_disabled().with(OptionalModule::Vision, state)
}

#[test]
fn disabled_module_has_no_side_effects() {
    let settings = leak(SettingsBus::default());
    let config = leak(SharedConfig::new(160 * 120));
    let telemetry = TelemetryBus::new();
    settings.update(|s| s.frame_rate_hz = 10.0);

    let spawned = Cell::new(false);
    let gate = ActivationGate::initialize(&vision(ModuleState::Disabled));
    let outcome = gate
        .start(settings, config, || {
            spawned.set(true);
            telemetry.set_attitude(Attitude { pitch: 1.0, ..Attitude::ZERO });
        })
        .unwrap();

    assert_eq!(outcome, Activation::Disabled);
    assert!(!spawned.get());
    assert_eq!(telemetry.attitude(), Attitude::ZERO);

    // Never subscribed: neither the earlier nor later edits reach the snapshot.
    assert_eq!(config.load().frame_rate_hz(), 30.0);
    settings.update(|s| s.frame_rate_hz = 12.0);
    assert_eq!(config.load().frame_rate_hz(), 30.0);
}

#[test]
fn enabled_module_subscribes_refreshes_and_spawns() {
    let settings = leak(SettingsBus::default());
    let config = leak(SharedConfig::new(160 * 120));
    settings.update(|s| s.frame_rate_hz = 10.0);

    let gate = ActivationGate::initialize(&vision(ModuleState::Enabled));
    let spawns = Cell::new(0);
    let outcome = gate
        .start(settings, config, || {
            spawns.set(spawns.get() + 1);
            // The snapshot is current by the time the task is created.
            config.load().frame_rate_hz()
        })
        .unwrap();

    assert_eq!(outcome, Activation::Started(10.0));
    assert_eq!(spawns.get(), 1);

    settings.update(|s| s.frame_rate_hz = 12.0);
    assert_eq!(config.load().frame_rate_hz(), 12.0);
}

#[test]
fn flash_bitmap_decoding() {
    let erased = [0xFFu8; OPTIONAL_MODULES_LEN];
    assert!(!ActivationGate::initialize(&HwSettings::from_bytes(&erased)).is_enabled());

    let mut raw = [0u8; OPTIONAL_MODULES_LEN];
    raw[OptionalModule::Vision as usize] = 1;
    let hw = HwSettings::from_bytes(&raw);
    assert_eq!(hw.module(OptionalModule::Vision), ModuleState::Enabled);
    assert_eq!(hw.module(OptionalModule::Gps), ModuleState::Disabled);
    assert!(ActivationGate::initialize(&hw).is_enabled());
}
