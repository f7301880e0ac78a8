// ProxAlarm - ESP-IDF Platform Bindings
//
// Wires the Xiao ESP32-C3 peripherals to the hardware seams and hands them to
// the monitor. Only built for the espidf target.

use std::borrow::Borrow;
use std::time::Duration;

use esp_idf_hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{ADCPin, PinDriver};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::prelude::*;
use esp_idf_sys::EspError;

use crate::config::*;
use crate::drivers::ranger::Vl53l0x;
use crate::hal::{AnalogChannel, LowPowerSleep};
use crate::tasks::monitor::Monitor;
use crate::tasks::power::halt;
use crate::tasks::sensor::boot_ranger;

// ---------------------------------------------------------------------------
// Analog inputs
// ---------------------------------------------------------------------------
impl<'d, T, M> AnalogChannel for AdcChannelDriver<'d, T, M>
where
    T: ADCPin,
    M: Borrow<AdcDriver<'d, T::Adc>>,
{
    type Error = EspError;

    /// One-shot raw read, scaled down from the 12-bit native width.
    fn read_counts(&mut self) -> Result<u16, EspError> {
        let raw = self.read_raw()?;
        Ok(raw >> (ADC_NATIVE_BITS - ADC_COUNT_BITS))
    }
}

// ---------------------------------------------------------------------------
// Low-power sleep
// ---------------------------------------------------------------------------

/// Timer-woken light sleep. CPU, RF and the ADC are powered down while
/// asleep; GPIO levels (buzzer/LED off) are held.
///
/// Brown-out detection is left as ESP-IDF configures it
/// (`CONFIG_ESP_BROWNOUT_DET`). Light sleep keeps the detector armed and it
/// only trips near the regulator dropout, well below the 3500 mV latch, so
/// nothing is toggled around the sleep.
pub struct LightSleep;

impl LowPowerSleep for LightSleep {
    type Error = EspError;

    fn sleep(&mut self, quantum: Duration) -> Result<(), EspError> {
        unsafe {
            EspError::convert(esp_idf_sys::esp_sleep_enable_timer_wakeup(
                quantum.as_micros() as u64,
            ))?;
            EspError::convert(esp_idf_sys::esp_light_sleep_start())
        }
    }
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// Take the peripherals, bring the ranger up and run the monitor forever.
///
/// A ranger that fails to boot halts the firmware: without it there is
/// nothing meaningful to alarm on.
pub fn run() -> anyhow::Result<()> {
    let peripherals = Peripherals::take()?;

    // Outputs first so the buzzer is silenced before anything can fail.
    let buzzer = PinDriver::output(peripherals.pins.gpio4)?;
    let power_led = PinDriver::output(peripherals.pins.gpio5)?;

    // Battery divider sits in the low millivolt range; the pot spans the rail.
    let adc = AdcDriver::new(peripherals.adc1)?;
    let battery_cfg = AdcChannelConfig {
        attenuation: esp_idf_sys::adc_atten_t_ADC_ATTEN_DB_0,
        ..Default::default()
    };
    let pot_cfg = AdcChannelConfig {
        attenuation: esp_idf_sys::adc_atten_t_ADC_ATTEN_DB_11,
        ..Default::default()
    };
    let battery = AdcChannelDriver::new(&adc, peripherals.pins.gpio2, &battery_cfg)?;
    let range_pot = AdcChannelDriver::new(&adc, peripherals.pins.gpio3, &pot_cfg)?;
    log::info!(
        "ADC ready - battery GPIO{}, range pot GPIO{}",
        PIN_BATTERY_ADC,
        PIN_RANGE_POT
    );

    let i2c_config = I2cConfig::new().baudrate(I2C_BAUDRATE_KHZ.kHz().into());
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio6, // SDA
        peripherals.pins.gpio7, // SCL
        &i2c_config,
    )?;
    log::info!(
        "I2C ready - SDA GPIO{}, SCL GPIO{} @ {} kHz",
        PIN_I2C_SDA,
        PIN_I2C_SCL,
        I2C_BAUDRATE_KHZ
    );

    let mut ranger = Vl53l0x::new(i2c, FreeRtos);
    if !boot_ranger(&mut ranger) {
        halt();
    }

    log::info!(
        "Sensor ready - buzzer GPIO{}, power LED GPIO{}",
        PIN_BUZZER,
        PIN_POWER_LED
    );

    Monitor::new(ranger, range_pot, battery, buzzer, power_led, LightSleep, FreeRtos).run()
}
