#![no_std]
#![no_main]

mod board;
mod camera;
mod tasks;
mod usb;

use embassy_executor::Spawner;
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::usart::{Config as UsartConfig, Uart, UartRx};
use embassy_stm32::{bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Timer};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use flight_vision::config::{SettingsBus, SharedConfig, VisionSettings};
use flight_vision::drivers::camera_link::FrameAssembler;
use flight_vision::gate::{Activation, ActivationGate};
use flight_vision::state::TelemetryBus;

use crate::board::Board;
use crate::camera::FRAME_CAPACITY;
use crate::tasks::console_task::{ConsoleDisplay, DisplaySummary};

// ── Process-wide state ────────────────────────────────────────────────────────
static SETTINGS: SettingsBus = SettingsBus::new(VisionSettings::DEFAULT);
static CONFIG: SharedConfig = SharedConfig::new(FRAME_CAPACITY);
static TELEMETRY: TelemetryBus = TelemetryBus::new();

//  Cap=1: the console only ever prints the latest overlay frame.
static DISPLAY_CHAN: Channel<CriticalSectionRawMutex, DisplaySummary, 1> = Channel::new();

// Capture buffer lives outside the task arena.
static FRAME_ASSEMBLER: StaticCell<FrameAssembler<FRAME_CAPACITY>> = StaticCell::new();

// ── Interrupt bindings ────────────────────────────────────────────────────────
bind_interrupts!(struct Irqs {
    UART4  => embassy_stm32::usart::InterruptHandler<peripherals::UART4>;
    USART3 => embassy_stm32::usart::InterruptHandler<peripherals::USART3>;
});

// ── Main ──────────────────────────────────────────────────────────────────────
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // 1. Board init (168 MHz PLL)
    let board = Board::init();
    let p = board.p;

    // 2. Hardware settings → activation gate (read once)
    let gate = ActivationGate::initialize(&board::read_hw_settings(p.FLASH));

    // 3. USB CDC-ACM console (settings commands + debug display)
    let (usb_dev, usb_serial) = usb::init(p.USB_OTG_FS, p.PA12, p.PA11);
    spawner.spawn(usb::usb_task(usb_dev)).unwrap();
    spawner
        .spawn(tasks::console_task::console_task(
            usb_serial,
            &SETTINGS,
            &CONFIG,
            DISPLAY_CHAN.receiver(),
        ))
        .unwrap();

    // 4. CRSF telemetry from the flight controller, UART4 RX @ 420000 (PA1)
    let mut crsf_config = UsartConfig::default();
    crsf_config.baudrate = 420_000;
    let crsf_rx = UartRx::new(p.UART4, Irqs, p.PA1, p.DMA1_CH2, crsf_config).unwrap();
    spawner.spawn(tasks::crsf_task::crsf_task(crsf_rx, &TELEMETRY)).unwrap();

    // 5. Vision module: camera on USART3 @ 2 Mbaud (TX=PB10, RX=PB11).
    //    Nothing below runs unless the module is enabled.
    let activation = gate
        .start(&SETTINGS, &CONFIG, || {
            let mut cam_config = UsartConfig::default();
            cam_config.baudrate = 2_000_000;
            let cam_uart = Uart::new(
                p.USART3, p.PB11, p.PB10,
                Irqs,
                p.DMA1_CH3, p.DMA1_CH1,
                cam_config,
            )
            .unwrap();

            spawner
                .spawn(tasks::perception_task::perception_task(
                    cam_uart,
                    FRAME_ASSEMBLER.init(FrameAssembler::new()),
                    &CONFIG,
                    &TELEMETRY,
                    ConsoleDisplay::new(DISPLAY_CHAN.sender()),
                ))
                .unwrap();
        })
        .unwrap();
    if activation == Activation::Disabled {
        defmt::info!("vision disabled in hw settings");
    }

    // 6. Heartbeat LED (PC13) @ 1 Hz
    let mut led = Output::new(p.PC13, Level::High, Speed::Low);
    loop {
        led.toggle();
        Timer::after(Duration::from_millis(500)).await;
    }
}
