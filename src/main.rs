// ProxAlarm - Firmware Entry Point
//
// Boot sequence:
//   1. Install the ESP-IDF logger and give the serial console a moment.
//   2. Silence the buzzer/LED, set up both ADC channels and the I2C bus.
//   3. Boot the VL53L0X ranger. On failure, log once and halt for good.
//   4. Enter the monitor loop: sleep 1 s, sample, alarm, repeat.
//
// The monitor never returns. A drained battery latches it into a chirp loop
// until the device is power cycled.

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use std::thread;
    use std::time::Duration;

    // Link esp-idf-sys runtime patches and initialise logging.
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    thread::sleep(Duration::from_millis(proxalarm::config::LOGGER_SETTLE_MS));
    log::info!("ProxAlarm firmware starting...");

    proxalarm::esp::run()
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("proxalarm is ESP-IDF firmware; build it for an espidf target (e.g. riscv32imc-esp-espidf)");
}
