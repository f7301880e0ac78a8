// ProxAlarm - Measurement & Cycle Data Types

use crate::config::OUT_OF_RANGE_MM;

// ---------------------------------------------------------------------------
// Range status (ST PAL range status codes)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeStatus {
    Valid,
    SigmaFail,
    SignalFail,
    MinRangeFail,
    /// Phase fail: nothing within range. The only status the filter rejects.
    OutOfRange,
    HardwareFail,
}

impl RangeStatus {
    /// Numeric code as reported by the ST API (`RangeStatus` field).
    pub fn code(&self) -> u8 {
        match self {
            Self::Valid        => 0,
            Self::SigmaFail    => 1,
            Self::SignalFail   => 2,
            Self::MinRangeFail => 3,
            Self::OutOfRange   => 4,
            Self::HardwareFail => 5,
        }
    }

    /// Map the device status field (bits 6:3 of RESULT_RANGE_STATUS).
    pub fn from_device(device_status: u8) -> Self {
        match device_status {
            1..=3  => Self::HardwareFail,
            4      => Self::SignalFail,
            6 | 9  => Self::OutOfRange,
            8 | 10 => Self::MinRangeFail,
            _      => Self::Valid,
        }
    }
}

// ---------------------------------------------------------------------------
// Ranging measurement
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangingMeasurement {
    pub distance_mm: u16,
    pub status: RangeStatus,
}

impl RangingMeasurement {
    pub fn new(distance_mm: u16, status: RangeStatus) -> Self {
        Self { distance_mm, status }
    }

    pub fn out_of_range() -> Self {
        Self::new(OUT_OF_RANGE_MM, RangeStatus::OutOfRange)
    }

    pub fn is_out_of_range(&self) -> bool {
        self.status == RangeStatus::OutOfRange
    }
}

// ---------------------------------------------------------------------------
// Cycle report - what one pass of the monitor saw and did
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Alarm range from the potentiometer (mm). `None` if the ADC read failed.
    pub threshold_mm: Option<u16>,
    pub distance_mm: u16,
    /// `None` if the battery ADC read failed.
    pub battery_mv: Option<u16>,
    pub alarmed: bool,
    pub power_flashed: bool,
    /// The low-battery latch is engaged; no further cycles will sample.
    pub latched: bool,
}
