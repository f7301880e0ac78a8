// ProxAlarm - VL53L0X Time-of-Flight Ranger Driver
//
// Register-level driver over any embedded-hal I2C bus. Covers what the alarm
// needs: bring-up with ST's default tuning, and single-shot ranging.

use core::fmt::{self, Debug, Display};

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::config::*;
use crate::events::{RangeStatus, RangingMeasurement};
use crate::hal::RangeSensor;

// VL53L0X register addresses
const REG_SYSRANGE_START: u8 = 0x00;
const REG_SYSTEM_SEQUENCE_CONFIG: u8 = 0x01;
const REG_SYSTEM_INTERRUPT_CONFIG_GPIO: u8 = 0x0A;
const REG_SYSTEM_INTERRUPT_CLEAR: u8 = 0x0B;
const REG_RESULT_INTERRUPT_STATUS: u8 = 0x13;
const REG_RESULT_RANGE_STATUS: u8 = 0x14;
const REG_RESULT_RANGE_MM: u8 = REG_RESULT_RANGE_STATUS + 10;
const REG_FINAL_RANGE_MIN_COUNT_RATE_RTN_LIMIT: u8 = 0x44;
const REG_DYNAMIC_SPAD_NUM_REQUESTED_REF_SPAD: u8 = 0x4E;
const REG_DYNAMIC_SPAD_REF_EN_START_OFFSET: u8 = 0x4F;
const REG_MSRC_CONFIG_CONTROL: u8 = 0x60;
const REG_GPIO_HV_MUX_ACTIVE_HIGH: u8 = 0x84;
const REG_VHV_CONFIG_PAD_SCL_SDA_EXTSUP_HV: u8 = 0x89;
const REG_GLOBAL_CONFIG_SPAD_ENABLES_REF_0: u8 = 0xB0;
const REG_GLOBAL_CONFIG_REF_EN_START_SELECT: u8 = 0xB6;
const REG_IDENTIFICATION_MODEL_ID: u8 = 0xC0;
const MODEL_ID_EXPECTED: u8 = 0xEE;

// Private page registers used to reach the stop variable and SPAD info.
const REG_POWER_MANAGEMENT: u8 = 0x80;
const REG_PAGE_SELECT: u8 = 0xFF;
const REG_STOP_VARIABLE: u8 = 0x91;

/// Final-range signal rate limit, 0.25 MCPS in 9.7 fixed point.
const SIGNAL_RATE_LIMIT_Q9_7: u16 = 32;

/// Sequence steps enabled for normal ranging (DSS, pre-range, final-range).
const SEQUENCE_RANGING: u8 = 0xE8;

/// The ranger reports 8190/8191 mm when there is no target at all.
const NO_TARGET_MM: u16 = 8190;

/// ST "DefaultTuningSettings", written verbatim during bring-up.
#[rustfmt::skip]
pub(crate) const DEFAULT_TUNING: &[(u8, u8)] = &[
    (0xFF, 0x01), (0x00, 0x00),
    (0xFF, 0x00), (0x09, 0x00), (0x10, 0x00), (0x11, 0x00),
    (0x24, 0x01), (0x25, 0xFF), (0x75, 0x00),
    (0xFF, 0x01), (0x4E, 0x2C), (0x48, 0x00), (0x30, 0x20),
    (0xFF, 0x00), (0x30, 0x09), (0x54, 0x00), (0x31, 0x04), (0x32, 0x03),
    (0x40, 0x83), (0x46, 0x25), (0x60, 0x00), (0x27, 0x00), (0x50, 0x06),
    (0x51, 0x00), (0x52, 0x96), (0x56, 0x08), (0x57, 0x30), (0x61, 0x00),
    (0x62, 0x00), (0x64, 0x00), (0x65, 0x00), (0x66, 0xA0),
    (0xFF, 0x01), (0x22, 0x32), (0x47, 0x14), (0x49, 0xFF), (0x4A, 0x00),
    (0xFF, 0x00), (0x7A, 0x0A), (0x7B, 0x00), (0x78, 0x21),
    (0xFF, 0x01), (0x23, 0x34), (0x42, 0x00), (0x44, 0xFF), (0x45, 0x26),
    (0x46, 0x05), (0x40, 0x40), (0x0E, 0x06), (0x20, 0x1A), (0x43, 0x40),
    (0xFF, 0x00), (0x34, 0x03), (0x35, 0x44),
    (0xFF, 0x01), (0x31, 0x04), (0x4B, 0x09), (0x4C, 0x05), (0x4D, 0x04),
    (0xFF, 0x00), (0x44, 0x00), (0x45, 0x20), (0x47, 0x08), (0x48, 0x28),
    (0x67, 0x00), (0x70, 0x04), (0x71, 0x01), (0x72, 0xFE), (0x76, 0x00),
    (0x77, 0x00),
    (0xFF, 0x01), (0x0D, 0x01),
    (0xFF, 0x00), (0x80, 0x01), (0x01, 0xF8),
    (0xFF, 0x01), (0x8E, 0x01), (0x00, 0x01), (0xFF, 0x00), (0x80, 0x00),
];

#[derive(Debug)]
pub enum Error<E: Debug> {
    /// Bus error from the underlying I2C implementation.
    I2c(E),
    /// The device never signalled completion.
    Timeout,
    /// Something answered at the address, but it is not a VL53L0X.
    WrongDevice(u8),
}

impl<E: Debug> Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I2c(e) => write!(f, "I2C error: {:?}", e),
            Self::Timeout => write!(f, "timed out waiting for the ranger"),
            Self::WrongDevice(id) => write!(
                f,
                "unexpected model id 0x{:02X} (expected 0x{:02X})",
                id, MODEL_ID_EXPECTED
            ),
        }
    }
}

impl<E: Debug> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Error::I2c(error)
    }
}

pub struct Vl53l0x<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    stop_variable: u8,
}

impl<I2C, E, D> Vl53l0x<I2C, D>
where
    I2C: I2c<Error = E>,
    E: Debug,
    D: DelayNs,
{
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            i2c,
            delay,
            address: I2C_ADDR_VL53L0X,
            stop_variable: 0,
        }
    }

    /// Verify the device is reachable on the I2C bus.
    pub fn is_connected(&mut self) -> bool {
        matches!(
            self.read_reg(REG_IDENTIFICATION_MODEL_ID),
            Ok(MODEL_ID_EXPECTED)
        )
    }

    /// Bring the ranger up for single-shot measurements (2V8 I/O, default
    /// tuning, reference SPADs and VHV/phase calibration).
    pub fn init(&mut self) -> Result<(), Error<E>> {
        let id = self.read_reg(REG_IDENTIFICATION_MODEL_ID)?;
        if id != MODEL_ID_EXPECTED {
            return Err(Error::WrongDevice(id));
        }

        // 2V8 I/O pads, standard-mode I2C
        self.update_reg(REG_VHV_CONFIG_PAD_SCL_SDA_EXTSUP_HV, |v| v | 0x01)?;
        self.write_reg(0x88, 0x00)?;

        self.enter_private_page()?;
        self.stop_variable = self.read_reg(REG_STOP_VARIABLE)?;
        self.leave_private_page()?;

        // Disable the MSRC and pre-range signal rate limit checks
        self.update_reg(REG_MSRC_CONFIG_CONTROL, |v| v | 0x12)?;
        self.write_reg16(REG_FINAL_RANGE_MIN_COUNT_RATE_RTN_LIMIT, SIGNAL_RATE_LIMIT_Q9_7)?;
        self.write_reg(REG_SYSTEM_SEQUENCE_CONFIG, 0xFF)?;

        self.setup_reference_spads()?;

        for &(reg, value) in DEFAULT_TUNING {
            self.write_reg(reg, value)?;
        }

        // Interrupt on new sample ready, active low
        self.write_reg(REG_SYSTEM_INTERRUPT_CONFIG_GPIO, 0x04)?;
        self.update_reg(REG_GPIO_HV_MUX_ACTIVE_HIGH, |v| v & !0x10)?;
        self.write_reg(REG_SYSTEM_INTERRUPT_CLEAR, 0x01)?;

        self.write_reg(REG_SYSTEM_SEQUENCE_CONFIG, 0x01)?;
        self.single_ref_calibration(0x40)?; // VHV
        self.write_reg(REG_SYSTEM_SEQUENCE_CONFIG, 0x02)?;
        self.single_ref_calibration(0x00)?; // phase
        self.write_reg(REG_SYSTEM_SEQUENCE_CONFIG, SEQUENCE_RANGING)?;

        log::info!("VL53L0X initialised (stop variable 0x{:02X})", self.stop_variable);
        Ok(())
    }

    /// Take one single-shot ranging measurement.
    pub fn measure(&mut self) -> Result<RangingMeasurement, Error<E>> {
        self.enter_private_page()?;
        self.write_reg(REG_STOP_VARIABLE, self.stop_variable)?;
        self.leave_private_page()?;

        self.write_reg(REG_SYSRANGE_START, 0x01)?;
        self.poll_reg(REG_SYSRANGE_START, |v| v & 0x01 == 0)?;
        self.poll_reg(REG_RESULT_INTERRUPT_STATUS, |v| v & 0x07 != 0)?;

        let status = self.read_reg(REG_RESULT_RANGE_STATUS)?;
        let distance_mm = self.read_reg16(REG_RESULT_RANGE_MM)?;
        self.write_reg(REG_SYSTEM_INTERRUPT_CLEAR, 0x01)?;

        let m = decode_measurement(status, distance_mm);
        log::debug!("Range {} mm, status {}", m.distance_mm, m.status.code());
        Ok(m)
    }

    // -----------------------------------------------------------------------
    // Bring-up helpers
    // -----------------------------------------------------------------------

    /// Read the factory SPAD count/type and enable exactly that many
    /// reference SPADs.
    fn setup_reference_spads(&mut self) -> Result<(), Error<E>> {
        let (spad_count, aperture) = self.spad_info()?;

        let mut map = [0u8; 6];
        self.i2c.write_read(
            self.address,
            &[REG_GLOBAL_CONFIG_SPAD_ENABLES_REF_0],
            &mut map,
        )?;

        self.write_reg(REG_PAGE_SELECT, 0x01)?;
        self.write_reg(REG_DYNAMIC_SPAD_REF_EN_START_OFFSET, 0x00)?;
        self.write_reg(REG_DYNAMIC_SPAD_NUM_REQUESTED_REF_SPAD, 0x2C)?;
        self.write_reg(REG_PAGE_SELECT, 0x00)?;
        self.write_reg(REG_GLOBAL_CONFIG_REF_EN_START_SELECT, 0xB4)?;

        enable_reference_spads(&mut map, spad_count, aperture);

        let mut frame = [0u8; 7];
        frame[0] = REG_GLOBAL_CONFIG_SPAD_ENABLES_REF_0;
        frame[1..].copy_from_slice(&map);
        self.i2c.write(self.address, &frame)?;
        Ok(())
    }

    fn spad_info(&mut self) -> Result<(u8, bool), Error<E>> {
        self.enter_private_page()?;
        self.write_reg(REG_PAGE_SELECT, 0x06)?;
        self.update_reg(0x83, |v| v | 0x04)?;
        self.write_reg(REG_PAGE_SELECT, 0x07)?;
        self.write_reg(0x81, 0x01)?;
        self.write_reg(REG_POWER_MANAGEMENT, 0x01)?;
        self.write_reg(0x94, 0x6B)?;
        self.write_reg(0x83, 0x00)?;
        self.poll_reg(0x83, |v| v != 0x00)?;
        self.write_reg(0x83, 0x01)?;

        let info = self.read_reg(0x92)?;

        self.write_reg(0x81, 0x00)?;
        self.write_reg(REG_PAGE_SELECT, 0x06)?;
        self.update_reg(0x83, |v| v & !0x04)?;
        self.write_reg(REG_PAGE_SELECT, 0x01)?;
        self.write_reg(0x00, 0x01)?;
        self.write_reg(REG_PAGE_SELECT, 0x00)?;
        self.write_reg(REG_POWER_MANAGEMENT, 0x00)?;

        Ok((info & 0x7F, info & 0x80 != 0))
    }

    fn single_ref_calibration(&mut self, vhv_init: u8) -> Result<(), Error<E>> {
        self.write_reg(REG_SYSRANGE_START, 0x01 | vhv_init)?;
        self.poll_reg(REG_RESULT_INTERRUPT_STATUS, |v| v & 0x07 != 0)?;
        self.write_reg(REG_SYSTEM_INTERRUPT_CLEAR, 0x01)?;
        self.write_reg(REG_SYSRANGE_START, 0x00)?;
        Ok(())
    }

    fn enter_private_page(&mut self) -> Result<(), Error<E>> {
        self.write_reg(REG_POWER_MANAGEMENT, 0x01)?;
        self.write_reg(REG_PAGE_SELECT, 0x01)?;
        self.write_reg(REG_SYSRANGE_START, 0x00)
    }

    fn leave_private_page(&mut self) -> Result<(), Error<E>> {
        self.write_reg(REG_SYSRANGE_START, 0x01)?;
        self.write_reg(REG_PAGE_SELECT, 0x00)?;
        self.write_reg(REG_POWER_MANAGEMENT, 0x00)
    }

    // -----------------------------------------------------------------------
    // Register access
    // -----------------------------------------------------------------------

    fn read_reg(&mut self, reg: u8) -> Result<u8, Error<E>> {
        let mut buf = [0u8; 1];
        self.i2c.write_read(self.address, &[reg], &mut buf)?;
        Ok(buf[0])
    }

    fn read_reg16(&mut self, reg: u8) -> Result<u16, Error<E>> {
        let mut buf = [0u8; 2];
        self.i2c.write_read(self.address, &[reg], &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Error<E>> {
        self.i2c.write(self.address, &[reg, value])?;
        Ok(())
    }

    fn write_reg16(&mut self, reg: u8, value: u16) -> Result<(), Error<E>> {
        let [hi, lo] = value.to_be_bytes();
        self.i2c.write(self.address, &[reg, hi, lo])?;
        Ok(())
    }

    fn update_reg<F>(&mut self, reg: u8, f: F) -> Result<(), Error<E>>
    where
        F: FnOnce(u8) -> u8,
    {
        let value = self.read_reg(reg)?;
        self.write_reg(reg, f(value))
    }

    /// Re-read `reg` every [`RANGE_POLL_MS`] until `ready` accepts it, giving
    /// up after [`RANGE_TIMEOUT_MS`].
    fn poll_reg<F>(&mut self, reg: u8, ready: F) -> Result<u8, Error<E>>
    where
        F: Fn(u8) -> bool,
    {
        let mut waited_ms = 0;
        loop {
            let value = self.read_reg(reg)?;
            if ready(value) {
                return Ok(value);
            }
            if waited_ms >= RANGE_TIMEOUT_MS {
                return Err(Error::Timeout);
            }
            self.delay.delay_ms(RANGE_POLL_MS);
            waited_ms += RANGE_POLL_MS;
        }
    }
}

impl<I2C, E, D> RangeSensor for Vl53l0x<I2C, D>
where
    I2C: I2c<Error = E>,
    E: Debug,
    D: DelayNs,
{
    type Error = Error<E>;

    fn range_single(&mut self) -> Result<RangingMeasurement, Self::Error> {
        self.measure()
    }
}

/// Turn the raw RESULT_RANGE_STATUS byte and distance into a measurement.
fn decode_measurement(status: u8, distance_mm: u16) -> RangingMeasurement {
    let status = if distance_mm >= NO_TARGET_MM {
        RangeStatus::OutOfRange
    } else {
        RangeStatus::from_device((status >> 3) & 0x0F)
    };
    RangingMeasurement::new(distance_mm, status)
}

/// Keep the first `count` good SPADs of the 48-bit reference map, skipping
/// the first 12 when the factory calibration used aperture SPADs.
fn enable_reference_spads(map: &mut [u8; 6], count: u8, aperture: bool) {
    let first = if aperture { 12 } else { 0 };
    let mut enabled = 0u8;

    for i in 0..48usize {
        let (byte, bit) = (i / 8, i % 8);
        if i < first || enabled == count {
            map[byte] &= !(1 << bit);
        } else if (map[byte] >> bit) & 0x01 != 0 {
            enabled += 1;
        }
    }
}
