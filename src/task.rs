//! The perception task: startup rendezvous followed by the periodic loop.

use embassy_time::Instant;

use crate::config::SharedConfig;
use crate::cycle::{CycleReport, PerceptionCycle};
use crate::display::DisplaySink;
use crate::estimator::Estimator;
use crate::frame::Frame;
use crate::rendezvous::StartupRendezvous;
use crate::scheduler::{CycleState, PeriodicScheduler};
use crate::state::TelemetryBus;
use crate::video::VideoSource;

/// Everything the task owns or borrows, before it runs.
pub struct PerceptionTask<'a, V, E, D, const N: usize> {
    config: &'a SharedConfig,
    telemetry: &'a TelemetryBus,
    cycle: PerceptionCycle<V, E, D, N>,
}

impl<'a, V, E, D, const N: usize> PerceptionTask<'a, V, E, D, N>
where
    V: VideoSource<Frame = Frame<N>>,
    E: Estimator<Frame<N>>,
    D: DisplaySink<Frame<N>>,
{
    pub fn new(config: &'a SharedConfig, telemetry: &'a TelemetryBus, video: Option<V>, estimator: E, display: D) -> Self {
        Self {
            config,
            telemetry,
            cycle: PerceptionCycle::new(video, estimator, display),
        }
    }

    /// Size the capture, wait for telemetry, then fix the scheduler origin.
    ///
    /// A rendezvous timeout is logged and the loop starts anyway.
    pub async fn start(mut self) -> RunningPerception<'a, V, E, D, N> {
        let config = self.config.load();
        self.cycle.apply_geometry(&config);

        if let Err(e) = StartupRendezvous::new(self.telemetry, config.sync_timeout()).wait().await {
            error!("starting without telemetry: {}", e);
        }

        let period = self.config.load().period();
        let origin = Instant::now();
        info!("perception loop running, period {} ms", period.as_millis());

        RunningPerception {
            config: self.config,
            telemetry: self.telemetry,
            cycle: self.cycle,
            scheduler: PeriodicScheduler::start(origin, period),
        }
    }
}

pub struct RunningPerception<'a, V, E, D, const N: usize> {
    config: &'a SharedConfig,
    telemetry: &'a TelemetryBus,
    cycle: PerceptionCycle<V, E, D, N>,
    scheduler: PeriodicScheduler,
}

impl<'a, V, E, D, const N: usize> RunningPerception<'a, V, E, D, N>
where
    V: VideoSource<Frame = Frame<N>>,
    E: Estimator<Frame<N>>,
    D: DisplaySink<Frame<N>>,
{
    pub fn cycle_state(&self) -> CycleState {
        self.scheduler.state()
    }

    pub fn cycle(&self) -> &PerceptionCycle<V, E, D, N> {
        &self.cycle
    }

    /// Wait for the next deadline and run one iteration.
    ///
    /// The snapshot is read after the wake-up; a new rate takes effect from
    /// the following deadline.
    pub async fn step(&mut self) -> CycleReport {
        let tick = self.scheduler.wait_next().await;

        let config = self.config.load();
        self.scheduler.set_period(config.period());
        let report = self.cycle.run_once(&config, self.telemetry, tick).await;

        let late = report.tick.lateness();
        if late >= self.scheduler.period() {
            debug!("frame {} overran by {} us", tick.frame, late.as_micros());
        }
        trace!("frame {} at {} ms", tick.frame, tick.woke_at.as_millis());
        report
    }

    pub async fn run(mut self) -> ! {
        loop {
            self.step().await;
        }
    }
}
