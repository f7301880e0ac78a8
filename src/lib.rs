// ProxAlarm - Proximity alarm firmware
//
// Samples a VL53L0X time-of-flight ranger once a second and sounds a buzzer
// when something comes closer than the range set on the potentiometer.
// Everything except `esp` is hardware independent and runs on the host.

pub mod config;
pub mod drivers;
pub mod events;
pub mod hal;
pub mod tasks;

#[cfg(target_os = "espidf")]
pub mod esp;

#[cfg(test)]
mod testing;
