//! Hardware Abstraction Layer for OnionController.
//!
//! Thin wrappers around ESP-IDF peripherals.
//! Pipeline logic stays in core modules, HAL is just I/O.

pub mod adc;
pub mod mux;

pub use adc::AnalogInput;
pub use mux::{Mux, MUX_SETTLE_US};

/// Microseconds since boot, used to stamp log entries.
#[cfg(target_os = "espidf")]
#[inline]
pub fn uptime_us() -> i64 {
    // SAFETY: esp_timer_get_time has no preconditions
    unsafe { esp_idf_svc::sys::esp_timer_get_time() }
}

/// Host builds have no boot clock.
#[cfg(not(target_os = "espidf"))]
#[inline]
pub fn uptime_us() -> i64 {
    0
}
