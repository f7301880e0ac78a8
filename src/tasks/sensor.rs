// ProxAlarm - Range Sampler
//
// Takes up to three shots from the ranger and only trusts them if they agree.
// Anything doubtful (out of range, a jump between shots, a bus error) is
// reported as `OUT_OF_RANGE_MM` so it can never raise the alarm.

use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::config::*;
use crate::drivers::ranger::Vl53l0x;
use crate::hal::RangeSensor;

/// Boot self-test and one bring-up attempt.
///
/// Returns `false` if the ranger could not be initialised. The failure is
/// logged here, once; there is no retry.
pub fn boot_ranger<I2C, E, D>(ranger: &mut Vl53l0x<I2C, D>) -> bool
where
    I2C: I2c<Error = E>,
    E: Debug,
    D: DelayNs,
{
    let connected = ranger.is_connected();
    log::info!("Boot check - VL53L0X:{}", if connected { "OK" } else { "MISSING" });

    match ranger.init() {
        Ok(()) => true,
        Err(e) => {
            log::error!("Failed to boot VL53L0X ranger: {}", e);
            false
        }
    }
}

/// Check for an object in front of the ranger.
///
/// Returns the running average (in mm) of [`SAMPLES_PER_CHECK`] consistent
/// shots, or [`OUT_OF_RANGE_MM`] as soon as one shot is out of range or
/// strays more than [`MAX_SAMPLE_SPREAD_MM`] from the average so far. No
/// further shots are taken once a sample is rejected.
///
/// The average is folded pairwise, `(avg + shot) / 2`, so later shots weigh
/// more than the first.
pub fn check_for_object<S, D>(ranger: &mut S, delay: &mut D) -> u16
where
    S: RangeSensor,
    D: DelayNs,
{
    let mut average: Option<u16> = None;

    for shot in 0..SAMPLES_PER_CHECK {
        if shot > 0 {
            delay.delay_ms(SAMPLE_SETTLE_MS);
        }

        let distance = match ranger.range_single() {
            Ok(m) if m.is_out_of_range() => return OUT_OF_RANGE_MM,
            Ok(m) => m.distance_mm,
            Err(e) => {
                log::warn!("Ranger read error: {:?}", e);
                return OUT_OF_RANGE_MM;
            }
        };

        average = Some(match average {
            None => distance,
            Some(avg) if avg.abs_diff(distance) > MAX_SAMPLE_SPREAD_MM => {
                log::debug!("Shot {} mm strays from average {} mm", distance, avg);
                return OUT_OF_RANGE_MM;
            }
            Some(avg) => ((u32::from(avg) + u32::from(distance)) / 2) as u16,
        });
    }

    average.unwrap_or(OUT_OF_RANGE_MM)
}
