// ProxAlarm - Battery & Power
//
// Converts the battery divider reading to millivolts and decides when the
// cell is too low to keep running normally.

use std::thread;
use std::time::Duration;

use crate::config::*;

/// Battery voltage in millivolts from a 10-bit divider reading.
pub fn battery_millivolts(counts: u16) -> u16 {
    (f32::from(counts) * BATTERY_MV_PER_COUNT * ADC_REF_ADJUST) as u16
}

pub fn is_battery_low(millivolts: u16) -> bool {
    millivolts <= BATTERY_LOW_LIMIT_MV
}

/// Park the firmware forever. Used when there is nothing safe left to do.
pub fn halt() -> ! {
    loop {
        thread::sleep(Duration::from_secs(60));
    }
}
