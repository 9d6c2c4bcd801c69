use core::fmt::Write;

use embassy_executor::task;
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Receiver, Sender};
use embassy_usb::driver::EndpointError;

use flight_vision::config::{SettingsBus, SharedConfig};
use flight_vision::console::{execute, LineAssembler};
use flight_vision::display::{DisplayError, DisplaySink};
use flight_vision::frame::Frame;

use crate::usb::{UsbSerial, MAX_PACKET};

/// What the console prints for each frame the perception loop displays.
#[derive(Clone, Copy)]
pub struct DisplaySummary {
    pub count: u32,
    pub width: u16,
    pub height: u16,
    pub mean_luma: u8,
}

/// Display sink that forwards a summary of each overlay frame to the console.
/// A summary not yet printed is never queued behind: the sink reports `Busy`.
pub struct ConsoleDisplay {
    tx: Sender<'static, CriticalSectionRawMutex, DisplaySummary, 1>,
    count: u32,
}

impl ConsoleDisplay {
    pub fn new(tx: Sender<'static, CriticalSectionRawMutex, DisplaySummary, 1>) -> Self {
        Self { tx, count: 0 }
    }
}

impl<const N: usize> DisplaySink<Frame<N>> for ConsoleDisplay {
    fn show(&mut self, _window: &str, frame: &Frame<N>) -> Result<(), DisplayError> {
        self.count = self.count.wrapping_add(1);
        let summary = DisplaySummary {
            count: self.count,
            width: frame.width(),
            height: frame.height(),
            mean_luma: frame.mean_luma(),
        };
        self.tx.try_send(summary).map_err(|_| DisplayError::Busy)
    }
}

/// Console task: settings commands in, config replies and display summaries out.
#[task]
pub async fn console_task(
    mut serial: UsbSerial,
    settings: &'static SettingsBus,
    config: &'static SharedConfig,
    display_rx: Receiver<'static, CriticalSectionRawMutex, DisplaySummary, 1>,
) {
    let mut lines = LineAssembler::new();
    let mut buf = [0u8; MAX_PACKET];

    loop {
        serial.wait_connection().await;
        defmt::info!("console connected");

        'session: loop {
            let event = select(serial.read_packet(&mut buf), display_rx.receive()).await;
            match event {
                Either::First(Ok(n)) => {
                    for &b in &buf[..n] {
                        let Some(line) = lines.push(b) else { continue };
                        let reply = execute(line.as_deref().map_err(|e| *e), settings, config);
                        if write_all(&mut serial, reply.as_bytes()).await.is_err() {
                            break 'session;
                        }
                    }
                }
                Either::First(Err(_)) => break 'session,
                Either::Second(summary) => {
                    let mut m = heapless::String::<64>::new();
                    let _ = write!(
                        m,
                        "[VIS] #{} {}x{} luma={}\r\n",
                        summary.count, summary.width, summary.height, summary.mean_luma
                    );
                    if write_all(&mut serial, m.as_bytes()).await.is_err() {
                        break 'session;
                    }
                }
            }
        }
        defmt::info!("console disconnected");
    }
}

async fn write_all(serial: &mut UsbSerial, bytes: &[u8]) -> Result<(), EndpointError> {
    for chunk in bytes.chunks(MAX_PACKET) {
        serial.write_packet(chunk).await?;
    }
    Ok(())
}
