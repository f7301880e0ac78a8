// ProxAlarm - Indicator Output Driver
//
// Simple GPIO-driven buzzer or LED.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

pub struct Indicator<P> {
    pin: P,
}

impl<P: OutputPin> Indicator<P> {
    /// Takes the pin and drives it low so the output starts silent.
    pub fn new(mut pin: P) -> Self {
        let _ = pin.set_low();
        Self { pin }
    }

    pub fn on(&mut self) {
        let _ = self.pin.set_high();
    }

    pub fn off(&mut self) {
        let _ = self.pin.set_low();
    }

    /// Drive the output for `on_ms` (blocks the caller).
    pub fn pulse<D: DelayNs>(&mut self, delay: &mut D, on_ms: u32) {
        self.on();
        delay.delay_ms(on_ms);
        self.off();
    }
}
