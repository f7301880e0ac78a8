// ProxAlarm - Hardware seams
//
// GPIO and delays go through `embedded-hal` directly. The three collaborators
// embedded-hal has no trait for are defined here so the monitor can run on
// the board or against fakes on the host.

use core::fmt::Debug;
use core::time::Duration;

use crate::events::RangingMeasurement;

/// A distance sensor that can take one ranging shot on demand.
pub trait RangeSensor {
    type Error: Debug;

    fn range_single(&mut self) -> Result<RangingMeasurement, Self::Error>;
}

/// One analog input, reported in 10-bit counts (0-1023).
pub trait AnalogChannel {
    type Error: Debug;

    fn read_counts(&mut self) -> Result<u16, Self::Error>;
}

/// Power-down primitive. On `Ok` the quantum has elapsed; on `Err` the part
/// never went to sleep and the caller must wait the quantum out itself.
pub trait LowPowerSleep {
    type Error: Debug;

    fn sleep(&mut self, quantum: Duration) -> Result<(), Self::Error>;
}
