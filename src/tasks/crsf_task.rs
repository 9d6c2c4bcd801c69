use embassy_executor::task;
use embassy_stm32::peripherals::{DMA1_CH2, UART4};
use embassy_stm32::usart::UartRx;

use flight_vision::drivers::crsf::CrsfParser;
use flight_vision::link::TelemetryLink;
use flight_vision::state::TelemetryBus;

/// CRSF telemetry task: reads UART4 RX and publishes every decoded frame.
#[task]
pub async fn crsf_task(mut crsf_rx: UartRx<'static, UART4, DMA1_CH2>, telemetry: &'static TelemetryBus) {
    let mut parser = CrsfParser::new();
    let mut link = TelemetryLink::new();
    let mut buf = [0u8; 64];

    loop {
        // Frames are at most 64 bytes; the FC idles the line between bursts.
        match crsf_rx.read_until_idle(&mut buf).await {
            Ok(n) => {
                for &b in &buf[..n] {
                    if let Some(msg) = parser.push_byte(b) {
                        link.apply(msg, telemetry);
                    }
                }
            }
            Err(_) => {
                // Overrun or noise: the parser resyncs on the next sync byte
            }
        }
    }
}
