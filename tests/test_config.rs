// tests/test_config.rs: Settings bus, snapshot publication and console hot reload.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use flight_vision::config::{
    ConfigError, SettingsBus, SettingsListener, SharedConfig, VisionSettings, MAX_LISTENERS,
};
use flight_vision::console::{execute, CommandError};

fn leak<T>(value: T) -> &'static T {
    Box::leak(Box::new(value))
}

#[derive(Default)]
struct CountingListener {
    calls: AtomicUsize,
}

impl SettingsListener for CountingListener {
    fn on_settings_changed(&self, _bus: &SettingsBus) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn every_update_notifies_every_listener() {
    let bus = leak(SettingsBus::default());
    let listeners: Vec<&'static CountingListener> =
        (0..MAX_LISTENERS).map(|_| leak(CountingListener::default())).collect();
    for &l in &listeners {
        bus.connect(l).unwrap();
    }
    assert_eq!(
        bus.connect(leak(CountingListener::default())),
        Err(ConfigError::TooManyListeners)
    );

    bus.update(|s| s.frame_rate_hz = 10.0);
    bus.set(VisionSettings::DEFAULT);
    for l in listeners {
        assert_eq!(l.calls.load(Ordering::SeqCst), 2);
    }
}

#[test]
fn listener_sees_the_new_object() {
    let bus = leak(SettingsBus::default());
    let config = leak(SharedConfig::new(160 * 120));
    bus.connect(config).unwrap();

    bus.update(|s| {
        s.frame_width = 80;
        s.frame_height = 60;
        s.frame_rate_hz = 12.0;
    });
    let snapshot = config.load();
    assert_eq!((snapshot.frame_width(), snapshot.frame_height()), (80, 60));
    assert_eq!(snapshot.period().as_millis(), 83);

    // Too large for the capture buffer: the old snapshot stays.
    bus.update(|s| s.frame_width = 640);
    assert_eq!(config.load(), snapshot);
}

/// Writers publish generation `g` as `g × g @ g Hz`; readers must never see a
/// mix of two generations.
#[test]
fn snapshots_are_never_torn() {
    let config = SharedConfig::new(usize::MAX);
    let first = VisionSettings { frame_width: 1, frame_height: 1, frame_rate_hz: 1.0, sync_timeout_ms: 1 };
    config.publish(&first).unwrap();
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        for _ in 0..2 {
            s.spawn(|| {
                for _ in 0..20 {
                    for g in 1..=1000u16 {
                        let settings = VisionSettings {
                            frame_width: g,
                            frame_height: g,
                            frame_rate_hz: g as f32,
                            sync_timeout_ms: g as u32,
                        };
                        config.publish(&settings).unwrap();
                    }
                }
            });
        }
        for _ in 0..2 {
            s.spawn(|| {
                let mut reads = 0u32;
                while !done.load(Ordering::Relaxed) || reads < 1000 {
                    let snap = config.load();
                    let g = snap.frame_width();
                    assert_eq!(snap.frame_height(), g);
                    assert_eq!(snap.frame_rate_hz(), g as f32);
                    assert_eq!(snap.sync_timeout().map(|d| d.as_millis()), Some(g as u64));
                    reads += 1;
                }
            });
        }
        // Writers finish first; readers then drain a last batch.
        thread::sleep(std::time::Duration::from_millis(50));
        done.store(true, Ordering::Relaxed);
    });
}

#[test]
fn console_edits_reach_the_snapshot() {
    let bus = leak(SettingsBus::default());
    let config = leak(SharedConfig::new(160 * 120));
    bus.connect(config).unwrap();

    let reply = execute(Ok("rate 15"), bus, config);
    assert_eq!(reply.as_str(), "[CFG] 160x120 @ 15.0 Hz, period 67 ms\r\n");
    assert_eq!(config.load().frame_rate_hz(), 15.0);

    let reply = execute(Ok("size 80 60"), bus, config);
    assert_eq!(reply.as_str(), "[CFG] 80x60 @ 15.0 Hz, period 67 ms\r\n");

    // Rejected by validation: reply shows the snapshot still in force.
    let reply = execute(Ok("rate 0"), bus, config);
    assert_eq!(reply.as_str(), "[CFG] 80x60 @ 15.0 Hz, period 67 ms\r\n");

    let reply = execute(Ok("show"), bus, config);
    assert_eq!(reply.as_str(), "[CFG] 80x60 @ 15.0 Hz, period 67 ms\r\n");

    let reply = execute(Ok("fps 10"), bus, config);
    assert_eq!(reply.as_str(), "[ERR] unknown command\r\n");
    let reply = execute(Err(CommandError::Overflow), bus, config);
    assert_eq!(reply.as_str(), "[ERR] line too long\r\n");
}
