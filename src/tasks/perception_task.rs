use embassy_executor::task;

use flight_vision::config::SharedConfig;
use flight_vision::drivers::camera_link::FrameAssembler;
use flight_vision::estimator::NullEstimator;
use flight_vision::state::TelemetryBus;
use flight_vision::task::PerceptionTask;

use crate::camera::{CameraUart, UartCamera, FRAME_CAPACITY};
use crate::tasks::console_task::ConsoleDisplay;

/// Vision task: opens the camera, waits for telemetry, then runs forever at
/// the configured frame rate.
#[task]
pub async fn perception_task(
    camera_uart: CameraUart,
    assembler: &'static mut FrameAssembler<FRAME_CAPACITY>,
    config: &'static SharedConfig,
    telemetry: &'static TelemetryBus,
    display: ConsoleDisplay,
) -> ! {
    let camera = UartCamera::open(camera_uart, assembler).await;
    let task = PerceptionTask::new(config, telemetry, camera, NullEstimator, display);
    task.start().await.run().await
}
