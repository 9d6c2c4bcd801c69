use embassy_stm32::flash::Flash;
use embassy_stm32::peripherals::FLASH;
use embassy_stm32::rcc::*;
use embassy_stm32::time::Hertz as TimeHertz;
use embassy_stm32::Config;

use flight_vision::gate::{HwSettings, OPTIONAL_MODULES_LEN};

/// Start of the last 128 KiB sector of the 1 MiB part, reserved for the
/// hardware settings block.
const HW_SETTINGS_OFFSET: u32 = 0x000E_0000;

pub struct Board {
    pub p: embassy_stm32::Peripherals,
}

impl Board {
    /// 8 MHz HSE → 168 MHz SYSCLK, 48 MHz for USB.
    pub fn init() -> Self {
        let mut config = Config::default();
        config.rcc.hse = Some(Hse {
            freq: TimeHertz(8_000_000),
            mode: HseMode::Oscillator,
        });
        config.rcc.pll_src = PllSource::HSE;
        config.rcc.pll = Some(Pll {
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL168,
            divp: Some(PllPDiv::DIV2),
            divq: Some(PllQDiv::DIV7),
            divr: None,
        });
        config.rcc.sys = Sysclk::PLL1_P;
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV4;
        config.rcc.apb2_pre = APBPrescaler::DIV2;

        Self {
            p: embassy_stm32::init(config),
        }
    }
}

/// Read the optional-modules bitmap. An unreadable block leaves every module off.
pub fn read_hw_settings(flash: FLASH) -> HwSettings {
    let mut flash = Flash::new_blocking(flash);
    let mut raw = [0u8; OPTIONAL_MODULES_LEN];
    match flash.blocking_read(HW_SETTINGS_OFFSET, &mut raw) {
        Ok(()) => HwSettings::from_bytes(&raw),
        Err(_) => {
            defmt::warn!("hw settings unreadable, all optional modules off");
            HwSettings::all_disabled()
        }
    }
}
