use embassy_futures::select::{select, Either};
use embassy_stm32::peripherals::{DMA1_CH1, DMA1_CH3, USART3};
use embassy_stm32::usart::Uart;
use embassy_time::{Duration, Instant, Timer};

use flight_vision::drivers::camera_link::{encode_geometry_request, FrameAssembler};
use flight_vision::frame::Frame;
use flight_vision::video::VideoSource;

/// Largest frame the capture buffer holds (QQVGA).
pub const FRAME_CAPACITY: usize = 160 * 120;

pub type CameraUart = Uart<'static, USART3, DMA1_CH3, DMA1_CH1>;

/// A silent line for this long at boot means no camera is fitted.
const OPEN_TIMEOUT: Duration = Duration::from_millis(500);
/// Longest a single grab may take; a QQVGA frame at 2 Mbaud needs ~100 ms.
const GRAB_TIMEOUT: Duration = Duration::from_millis(150);
const RX_CHUNK: usize = 256;

/// Camera streaming framed luma images over USART3.
pub struct UartCamera {
    uart: CameraUart,
    assembler: &'static mut FrameAssembler<FRAME_CAPACITY>,
    rx: [u8; RX_CHUNK],
}

impl UartCamera {
    /// Listen for the camera's stream. `None` if nothing arrives.
    pub async fn open(mut uart: CameraUart, assembler: &'static mut FrameAssembler<FRAME_CAPACITY>) -> Option<Self> {
        let mut rx = [0u8; RX_CHUNK];
        let handshake = select(uart.read_until_idle(&mut rx), Timer::after(OPEN_TIMEOUT)).await;
        match handshake {
            Either::First(Ok(n)) if n > 0 => {
                defmt::info!("camera detected");
                Some(Self { uart, assembler, rx })
            }
            _ => {
                defmt::warn!("no camera on USART3");
                None
            }
        }
    }
}

impl VideoSource for UartCamera {
    type Frame = Frame<FRAME_CAPACITY>;

    fn set_geometry(&mut self, width: u16, height: u16) {
        let request = encode_geometry_request(width, height);
        if self.uart.blocking_write(&request).is_err() {
            defmt::warn!("camera geometry request failed");
        }
    }

    async fn grab(&mut self) -> bool {
        // A grab that times out reports no frame, not the previous one.
        self.assembler.invalidate();
        let deadline = Instant::now() + GRAB_TIMEOUT;
        loop {
            let read = select(self.uart.read_until_idle(&mut self.rx), Timer::at(deadline)).await;
            match read {
                Either::First(Ok(n)) => {
                    if self.assembler.push(&self.rx[..n]) {
                        return true;
                    }
                }
                // Overrun/framing error: keep reading, the assembler resyncs.
                Either::First(Err(_)) => {}
                Either::Second(()) => return false,
            }
        }
    }

    fn retrieve(&self) -> Option<&Self::Frame> {
        self.assembler.frame()
    }
}
