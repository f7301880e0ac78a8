// ProxAlarm - Monitor Task
//
// The duty-cycled control loop. Each cycle sleeps one quantum, samples the
// range pot, the ranger and the battery, then buzzes if something is inside
// the alarm range. A drained battery latches the device into a chirp loop
// that never sleeps or samples again; only a power cycle clears it.

use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::*;
use crate::drivers::indicator::Indicator;
use crate::events::CycleReport;
use crate::hal::{AnalogChannel, LowPowerSleep, RangeSensor};
use crate::tasks::power::{battery_millivolts, is_battery_low};
use crate::tasks::sensor::check_for_object;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Sleeping,
    Sampling,
    Evaluating,
    Alarming,
    IndicatingPower,
    /// Terminal. Chirps forever.
    LowBatteryLatch,
}

pub struct Monitor<S, T, B, Z, L, P, D> {
    ranger: S,
    range_pot: T,
    battery: B,
    buzzer: Indicator<Z>,
    power_led: Indicator<L>,
    sleeper: P,
    delay: D,

    state: State,
    flash_countdown: u32,
    report: CycleReport,
}

impl<S, T, B, Z, L, P, D> Monitor<S, T, B, Z, L, P, D>
where
    S: RangeSensor,
    T: AnalogChannel,
    B: AnalogChannel,
    Z: OutputPin,
    L: OutputPin,
    P: LowPowerSleep,
    D: DelayNs,
{
    pub fn new(
        ranger: S,
        range_pot: T,
        battery: B,
        buzzer: Z,
        power_led: L,
        sleeper: P,
        delay: D,
    ) -> Self {
        Self {
            ranger,
            range_pot,
            battery,
            buzzer: Indicator::new(buzzer),
            power_led: Indicator::new(power_led),
            sleeper,
            delay,
            state: State::Sleeping,
            flash_countdown: POWER_FLASH_EVERY_CYCLES,
            report: CycleReport::default(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_latched(&self) -> bool {
        self.state == State::LowBatteryLatch
    }

    /// Run the state machine forever.
    pub fn run(mut self) -> ! {
        log::info!("Monitor running - sleep quantum {} ms", SLEEP_QUANTUM_MS);
        loop {
            self.step();
        }
    }

    /// Step until the loop is back at `Sleeping` (or latched) and report what
    /// the cycle saw.
    pub fn run_cycle(&mut self) -> CycleReport {
        while self.step() != State::Sleeping && !self.is_latched() {}
        self.report.latched = self.is_latched();
        self.report
    }

    /// Advance exactly one state and return the new one.
    pub fn step(&mut self) -> State {
        self.state = match self.state {
            State::Sleeping => {
                let quantum = Duration::from_millis(u64::from(SLEEP_QUANTUM_MS));
                if let Err(e) = self.sleeper.sleep(quantum) {
                    // Still spend the full quantum, awake.
                    log::warn!("Low-power sleep failed ({:?}) - delaying instead", e);
                    self.delay.delay_ms(SLEEP_QUANTUM_MS);
                }
                State::Sampling
            }
            State::Sampling => {
                self.sample();
                State::Evaluating
            }
            State::Evaluating => self.evaluate(),
            State::Alarming => {
                self.buzzer.pulse(&mut self.delay, WARNING_BUZZ_MS);
                self.report.alarmed = true;
                self.count_down_power_flash()
            }
            State::IndicatingPower => {
                self.power_led.pulse(&mut self.delay, POWER_FLASH_MS);
                self.report.power_flashed = true;
                State::Sleeping
            }
            State::LowBatteryLatch => {
                self.chirp();
                State::LowBatteryLatch
            }
        };
        self.state
    }

    fn sample(&mut self) {
        // Pot counts are used directly as the alarm range in mm.
        let threshold_mm = match self.range_pot.read_counts() {
            Ok(counts) => Some(counts),
            Err(e) => {
                log::warn!("Range pot read error: {:?}", e);
                None
            }
        };

        let distance_mm = check_for_object(&mut self.ranger, &mut self.delay);

        let battery_mv = match self.battery.read_counts() {
            Ok(counts) => Some(battery_millivolts(counts)),
            Err(e) => {
                log::warn!("Battery read error: {:?}", e);
                None
            }
        };

        self.report = CycleReport {
            threshold_mm,
            distance_mm,
            battery_mv,
            ..CycleReport::default()
        };
    }

    fn evaluate(&mut self) -> State {
        let CycleReport { threshold_mm, distance_mm, battery_mv, .. } = self.report;
        log::debug!(
            "alarm range {:?} mm, object {} mm, battery {:?} mV",
            threshold_mm,
            distance_mm,
            battery_mv
        );

        if let Some(mv) = battery_mv.filter(|mv| is_battery_low(*mv)) {
            log::warn!("Battery at {} mV - latching low-battery chirp", mv);
            return State::LowBatteryLatch;
        }

        if threshold_mm.is_some_and(|limit| distance_mm <= limit) {
            log::info!("Object at {} mm inside alarm range - buzzing", distance_mm);
            return State::Alarming;
        }

        self.count_down_power_flash()
    }

    fn count_down_power_flash(&mut self) -> State {
        self.flash_countdown = self.flash_countdown.saturating_sub(1);
        if self.flash_countdown == 0 {
            self.flash_countdown = POWER_FLASH_EVERY_CYCLES;
            State::IndicatingPower
        } else {
            State::Sleeping
        }
    }

    fn chirp(&mut self) {
        self.buzzer.on();
        self.power_led.on();
        self.delay.delay_ms(CHIRP_MS);
        self.buzzer.off();
        self.power_led.off();
        self.delay.delay_ms(CHIRP_INTERVAL_MS);
    }
}
