// Host fakes for the hardware seams. Every fake records into one shared
// trace so tests can assert on the order of sleeps, shots, pins and delays.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

use crate::events::{RangeStatus, RangingMeasurement};
use crate::hal::{AnalogChannel, LowPowerSleep, RangeSensor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Sleep(u32),
    Shot,
    Adc(&'static str),
    Pin(&'static str, bool),
    DelayMs(u32),
}

#[derive(Debug, Clone, Default)]
pub struct Trace(Rc<RefCell<Vec<Event>>>);

impl Trace {
    pub fn push(&self, event: Event) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }

    pub fn count(&self, event: Event) -> usize {
        self.0.borrow().iter().filter(|e| **e == event).count()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

#[derive(Debug)]
pub struct FakeError;

pub fn ok(distance_mm: u16) -> Result<RangingMeasurement, FakeError> {
    Ok(RangingMeasurement::new(distance_mm, RangeStatus::Valid))
}

pub fn far() -> Result<RangingMeasurement, FakeError> {
    Ok(RangingMeasurement::out_of_range())
}

/// Plays back a script of shots, then repeats `idle` forever.
pub struct FakeRanger {
    trace: Trace,
    script: VecDeque<Result<RangingMeasurement, FakeError>>,
    idle: RangingMeasurement,
}

impl FakeRanger {
    pub fn new(trace: &Trace) -> Self {
        Self {
            trace: trace.clone(),
            script: VecDeque::new(),
            idle: RangingMeasurement::out_of_range(),
        }
    }

    pub fn scripted<I>(trace: &Trace, shots: I) -> Self
    where
        I: IntoIterator<Item = Result<RangingMeasurement, FakeError>>,
    {
        let mut ranger = Self::new(trace);
        ranger.script.extend(shots);
        ranger
    }

    pub fn idle_at(mut self, distance_mm: u16) -> Self {
        self.idle = RangingMeasurement::new(distance_mm, RangeStatus::Valid);
        self
    }
}

impl RangeSensor for FakeRanger {
    type Error = FakeError;

    fn range_single(&mut self) -> Result<RangingMeasurement, FakeError> {
        self.trace.push(Event::Shot);
        self.script.pop_front().unwrap_or(Ok(self.idle))
    }
}

/// Returns queued readings, then keeps returning the last good one.
pub struct FakeAdc {
    name: &'static str,
    trace: Trace,
    queue: VecDeque<Result<u16, FakeError>>,
    steady: u16,
}

impl FakeAdc {
    pub fn new(name: &'static str, trace: &Trace, steady: u16) -> Self {
        Self {
            name,
            trace: trace.clone(),
            queue: VecDeque::new(),
            steady,
        }
    }

    pub fn then(mut self, reading: Result<u16, FakeError>) -> Self {
        self.queue.push_back(reading);
        self
    }
}

impl AnalogChannel for FakeAdc {
    type Error = FakeError;

    fn read_counts(&mut self) -> Result<u16, FakeError> {
        self.trace.push(Event::Adc(self.name));
        match self.queue.pop_front() {
            Some(Ok(counts)) => {
                self.steady = counts;
                Ok(counts)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.steady),
        }
    }
}

pub struct FakeSleeper {
    trace: Trace,
    reject: bool,
}

impl FakeSleeper {
    pub fn new(trace: &Trace) -> Self {
        Self { trace: trace.clone(), reject: false }
    }

    /// A sleeper whose power-down request is always refused.
    pub fn rejecting(trace: &Trace) -> Self {
        Self { trace: trace.clone(), reject: true }
    }
}

impl LowPowerSleep for FakeSleeper {
    type Error = FakeError;

    fn sleep(&mut self, quantum: Duration) -> Result<(), FakeError> {
        if self.reject {
            return Err(FakeError);
        }
        self.trace.push(Event::Sleep(quantum.as_millis() as u32));
        Ok(())
    }
}

pub struct FakePin {
    name: &'static str,
    trace: Trace,
}

impl FakePin {
    pub fn new(name: &'static str, trace: &Trace) -> Self {
        Self { name, trace: trace.clone() }
    }
}

impl ErrorType for FakePin {
    type Error = Infallible;
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.trace.push(Event::Pin(self.name, false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.trace.push(Event::Pin(self.name, true));
        Ok(())
    }
}

pub struct FakeDelay(pub Trace);

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.push(Event::DelayMs(ns / 1_000_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.push(Event::DelayMs(ms));
    }
}

/// Bus scripts for the VL53L0X driver, in `embedded-hal-mock` transactions.
pub mod i2c {
    use embedded_hal_mock::eh1::i2c::Transaction;

    use crate::config::I2C_ADDR_VL53L0X as ADDR;
    use crate::drivers::ranger::DEFAULT_TUNING;

    pub fn write(reg: u8, value: u8) -> Transaction {
        Transaction::write(ADDR, vec![reg, value])
    }

    pub fn read(reg: u8, response: Vec<u8>) -> Transaction {
        Transaction::write_read(ADDR, vec![reg], response)
    }

    fn enter_private_page() -> Vec<Transaction> {
        vec![write(0x80, 0x01), write(0xFF, 0x01), write(0x00, 0x00)]
    }

    fn leave_private_page() -> Vec<Transaction> {
        vec![write(0x00, 0x01), write(0xFF, 0x00), write(0x80, 0x00)]
    }

    fn calibration(vhv_init: u8) -> Vec<Transaction> {
        vec![
            write(0x00, 0x01 | vhv_init),
            read(0x13, vec![0x01]),
            write(0x0B, 0x01),
            write(0x00, 0x00),
        ]
    }

    /// Every transaction of a successful `init`, with the factory stop
    /// variable, SPAD info byte and reference map the device reports, and the
    /// map the driver is expected to write back.
    pub fn bring_up(stop: u8, spad_info: u8, map: [u8; 6], enabled: [u8; 6]) -> Vec<Transaction> {
        let mut t = vec![
            read(0xC0, vec![0xEE]),
            read(0x89, vec![0x00]),
            write(0x89, 0x01),
            write(0x88, 0x00),
        ];
        t.extend(enter_private_page());
        t.push(read(0x91, vec![stop]));
        t.extend(leave_private_page());
        t.extend([
            read(0x60, vec![0x00]),
            write(0x60, 0x12),
            Transaction::write(ADDR, vec![0x44, 0x00, 0x20]),
            write(0x01, 0xFF),
        ]);

        // SPAD info
        t.extend(enter_private_page());
        t.extend([
            write(0xFF, 0x06),
            read(0x83, vec![0x00]),
            write(0x83, 0x04),
            write(0xFF, 0x07),
            write(0x81, 0x01),
            write(0x80, 0x01),
            write(0x94, 0x6B),
            write(0x83, 0x00),
            read(0x83, vec![0x00]),
            read(0x83, vec![0x10]),
            write(0x83, 0x01),
            read(0x92, vec![spad_info]),
            write(0x81, 0x00),
            write(0xFF, 0x06),
            read(0x83, vec![0x04]),
            write(0x83, 0x00),
            write(0xFF, 0x01),
            write(0x00, 0x01),
            write(0xFF, 0x00),
            write(0x80, 0x00),
        ]);

        // Reference SPAD map
        t.extend([
            Transaction::write_read(ADDR, vec![0xB0], map.to_vec()),
            write(0xFF, 0x01),
            write(0x4F, 0x00),
            write(0x4E, 0x2C),
            write(0xFF, 0x00),
            write(0xB6, 0xB4),
        ]);
        let mut frame = vec![0xB0];
        frame.extend_from_slice(&enabled);
        t.push(Transaction::write(ADDR, frame));

        t.extend(DEFAULT_TUNING.iter().map(|&(reg, value)| write(reg, value)));

        t.extend([
            write(0x0A, 0x04),
            read(0x84, vec![0x11]),
            write(0x84, 0x01),
            write(0x0B, 0x01),
            write(0x01, 0x01),
        ]);
        t.extend(calibration(0x40));
        t.push(write(0x01, 0x02));
        t.extend(calibration(0x00));
        t.push(write(0x01, 0xE8));
        t
    }
}
