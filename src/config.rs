// ProxAlarm - Hardware & System Configuration
// Target: Seeed Studio Xiao ESP32-C3 (RISC-V)

// ---------------------------------------------------------------------------
// GPIO Pin Definitions (Xiao ESP32-C3 pinout)
// ---------------------------------------------------------------------------
pub const PIN_BATTERY_ADC: u32 = 2; // D0/A0 - Battery divider (ADC1 ch2)
pub const PIN_RANGE_POT: u32 = 3;   // D1/A1 - Alarm range potentiometer (ADC1 ch3)
pub const PIN_BUZZER: i32 = 4;      // D2    - Buzzer + pin
pub const PIN_POWER_LED: i32 = 5;   // D3    - Power / low-battery indicator LED
pub const PIN_I2C_SDA: i32 = 6;     // D4    - I2C data line
pub const PIN_I2C_SCL: i32 = 7;     // D5    - I2C clock line

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_ADDR_VL53L0X: u8 = 0x29;
pub const I2C_BAUDRATE_KHZ: u32 = 400;

// ---------------------------------------------------------------------------
// ADC
// ---------------------------------------------------------------------------
/// Every analog reading is normalised to this many bits before use, so the
/// potentiometer maps straight onto 0-1023 mm.
pub const ADC_COUNT_BITS: u32 = 10;
pub const ADC_NATIVE_BITS: u32 = 12;

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const SLEEP_QUANTUM_MS: u32 = 1000;        // Low-power sleep between checks
pub const SAMPLE_SETTLE_MS: u32 = 50;          // Let the ranger recover between shots
pub const WARNING_BUZZ_MS: u32 = 2000;         // Buzz on proximity violation
pub const CHIRP_MS: u32 = 100;                 // Low-battery chirp length
pub const CHIRP_INTERVAL_MS: u32 = 60_000;     // Gap between low-battery chirps
pub const POWER_FLASH_MS: u32 = 50;            // Heartbeat LED flash
pub const POWER_FLASH_EVERY_CYCLES: u32 = 30;  // ~30 s at one cycle per second
pub const RANGE_POLL_MS: u32 = 1;
pub const RANGE_TIMEOUT_MS: u32 = 500;         // Give up on a stuck measurement
pub const LOGGER_SETTLE_MS: u64 = 1000;        // Serial settle time after boot

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------
/// Reported distance when nothing valid is in range.
pub const OUT_OF_RANGE_MM: u16 = 5000;
pub const SAMPLES_PER_CHECK: usize = 3;
/// Largest jump from the running average still treated as the same object.
pub const MAX_SAMPLE_SPREAD_MM: u16 = 50;

// ---------------------------------------------------------------------------
// Battery
// ---------------------------------------------------------------------------
// vbat = ((ADC/1023) * Vref) / (R1/(R1+R2)). The divider drops 4.2 V onto the
// reference range, which works out to ~4.1 mV per count.
pub const BATTERY_MV_PER_COUNT: f32 = 4.1;
/// Measured battery vs. calculated value; corrects the reference voltage.
pub const ADC_REF_ADJUST: f32 = 1.08;
/// At or below this, the device latches into the low-battery chirp.
pub const BATTERY_LOW_LIMIT_MV: u16 = 3500;
