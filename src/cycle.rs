//! One perception iteration: capture, telemetry, estimator, frame retention,
//! overlay.

use crate::config::ConfigSnapshot;
use crate::display::{DisplaySink, DEBUG_WINDOW};
use crate::estimator::{Estimator, EstimatorInput};
use crate::frame::{Frame, FrameChannel};
use crate::overlay::HorizonLine;
use crate::scheduler::Tick;
use crate::state::TelemetryBus;
use crate::video::VideoSource;

/// What happened during one iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleReport {
    pub tick: Tick,
    /// The source handed out a frame this iteration.
    pub had_frame: bool,
    pub estimated: bool,
    pub displayed: bool,
}

pub struct PerceptionCycle<V, E, D, const N: usize> {
    video: Option<V>,
    estimator: E,
    display: D,
    frames: FrameChannel<Frame<N>>,
    geometry: Option<(u16, u16)>,
}

impl<V, E, D, const N: usize> PerceptionCycle<V, E, D, N>
where
    V: VideoSource<Frame = Frame<N>>,
    E: Estimator<Frame<N>>,
    D: DisplaySink<Frame<N>>,
{
    pub fn new(video: Option<V>, estimator: E, display: D) -> Self {
        if video.is_none() {
            warn!("no video source, running on telemetry only");
        }
        Self {
            video,
            estimator,
            display,
            frames: FrameChannel::new(),
            geometry: None,
        }
    }

    pub fn frames(&self) -> &FrameChannel<Frame<N>> {
        &self.frames
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn video(&self) -> Option<&V> {
        self.video.as_ref()
    }

    /// Push the configured frame size to the source when it changed.
    pub fn apply_geometry(&mut self, config: &ConfigSnapshot) {
        let wanted = (config.frame_width(), config.frame_height());
        if self.geometry == Some(wanted) {
            return;
        }
        if let Some(video) = self.video.as_mut() {
            video.set_geometry(wanted.0, wanted.1);
            debug!("capture geometry {}x{}", wanted.0, wanted.1);
        }
        self.geometry = Some(wanted);
    }

    /// Run one iteration. Estimator and display failures are logged and
    /// absorbed here; they never reach the scheduler.
    pub async fn run_once(&mut self, config: &ConfigSnapshot, telemetry: &TelemetryBus, tick: Tick) -> CycleReport {
        self.apply_geometry(config);

        // ── 1. Capture ───────────────────────────────────────────────────────
        if let Some(video) = self.video.as_mut() {
            video.grab().await;
        }

        // ── 2. Telemetry ─────────────────────────────────────────────────────
        let sample = telemetry.sample();

        // ── 3. Current frame ─────────────────────────────────────────────────
        let current = FrameChannel::acquire_current(self.video.as_ref());
        let had_frame = current.is_some();

        // ── 4. Estimator ─────────────────────────────────────────────────────
        let input = EstimatorInput {
            frame_number: tick.frame,
            dt: tick.dt_secs(),
            frame: current,
            telemetry: sample,
        };
        let estimated = match self.estimator.run(&input) {
            Ok(_) => true,
            Err(e) => {
                warn!("frame {}: estimator {}", tick.frame, e);
                false
            }
        };

        // ── 5. Retain ────────────────────────────────────────────────────────
        self.frames.commit(current);

        // ── 6. Overlay + display ─────────────────────────────────────────────
        // Horizon only on a newly retained copy: one line per shown frame.
        let mut displayed = false;
        if let Some(previous) = self.frames.previous_mut() {
            if had_frame {
                HorizonLine::from_attitude(&sample.attitude, previous.width(), previous.height()).draw(previous);
            }
            match self.display.show(DEBUG_WINDOW, previous) {
                Ok(()) => displayed = true,
                Err(e) => debug!("frame {}: display {}", tick.frame, e),
            }
        }

        CycleReport {
            tick,
            had_frame,
            estimated,
            displayed,
        }
    }
}
