//! Log drain to a TX-only UART.
//!
//! Log text goes out on UART1 so it never interleaves with the
//! configuration protocol on UART0.
//!
//! ```text
//! GPIO17 (UART1 TX) ──────▶ USB-UART RX ──▶ PC terminal
//! ```
//!
//! Besides the two log streams the drain periodically reports dropped log
//! entries and any fault recorded since the last report.

use core::fmt::Write;

use crate::fault::FaultSnapshot;
use crate::logging::{BufWriter, LogEntry, LogStream};

#[cfg(target_os = "espidf")]
use crate::fault::FaultState;
#[cfg(target_os = "espidf")]
use crate::log_globals::{COMMS_LOG_STREAM, SCAN_LOG_STREAM};
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::gpio;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::peripheral::Peripheral;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::uart::{self, UartTxDriver};

pub struct UartLoggerConfig {
    pub baud_rate: u32,
    pub tx_pin: u8,
    /// Interval between drop/fault status lines.
    pub status_interval_us: i64,
}

impl Default for UartLoggerConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115200,
            tx_pin: 17,
            status_interval_us: 10_000_000,
        }
    }
}

/// `[timestamp_us] LEVEL source: message\n`
pub fn format_log_entry(source: &str, entry: &LogEntry, buf: &mut [u8]) -> usize {
    let mut writer = BufWriter::new(buf);
    let _ = write!(
        writer,
        "[{:10}] {:<5} {}: {}\n",
        entry.timestamp_us(),
        entry.level().as_str(),
        source,
        entry.message()
    );
    writer.len()
}

/// Drop counters of both streams, reset once reported.
///
/// Writes nothing (returns 0) when neither stream dropped.
pub fn format_dropped_report<const N: usize>(
    scan: &LogStream<N>,
    comms: &LogStream<N>,
    buf: &mut [u8],
) -> usize {
    let (scan_dropped, comms_dropped) = (scan.dropped(), comms.dropped());
    if scan_dropped == 0 && comms_dropped == 0 {
        return 0;
    }
    let mut writer = BufWriter::new(buf);
    let _ = write!(writer, "[WARN] log overflow: scan={} comms={}\n", scan_dropped, comms_dropped);
    scan.reset_dropped();
    comms.reset_dropped();
    writer.len()
}

/// Fault line if `snapshot` holds faults newer than `reported`.
///
/// `reported` is the fault count at the previous report and is advanced.
pub fn format_fault_report(snapshot: &FaultSnapshot, reported: &mut u32, buf: &mut [u8]) -> usize {
    if snapshot.count == *reported {
        return 0;
    }
    let mut writer = BufWriter::new(buf);
    let _ = write!(writer, "[WARN] fault: {}\n", snapshot);
    *reported = snapshot.count;
    writer.len()
}

#[cfg(target_os = "espidf")]
pub fn init_uart_logger<'d>(
    uart: impl Peripheral<P = esp_idf_svc::hal::uart::UART1> + 'd,
    tx_pin: impl Peripheral<P = impl gpio::OutputPin> + 'd,
    config: &UartLoggerConfig,
) -> Result<UartTxDriver<'d>, esp_idf_svc::sys::EspError> {
    let uart_config = uart::config::Config::default()
        .baudrate(esp_idf_svc::hal::units::Hertz(config.baud_rate));

    UartTxDriver::new(
        uart,
        tx_pin,
        Option::<gpio::AnyIOPin>::None, // CTS
        Option::<gpio::AnyIOPin>::None, // RTS
        &uart_config,
    )
}

/// Drain loop: scan stream first, then comms, then the periodic status.
#[cfg(target_os = "espidf")]
pub fn uart_logger_task(
    uart: &mut UartTxDriver<'_>,
    config: &UartLoggerConfig,
    faults: &FaultState,
) -> ! {
    let mut line = [0u8; 256];
    let mut last_status = 0i64;
    let mut reported_faults = 0u32;

    loop {
        let mut idle = true;

        for (source, stream) in [("scan", &SCAN_LOG_STREAM), ("comms", &COMMS_LOG_STREAM)] {
            while let Some(entry) = stream.drain() {
                let len = format_log_entry(source, &entry, &mut line);
                let _ = uart.write(&line[..len]);
                idle = false;
            }
        }

        let now = crate::hal::uptime_us();
        if now - last_status > config.status_interval_us {
            let len = format_dropped_report(&SCAN_LOG_STREAM, &COMMS_LOG_STREAM, &mut line);
            let _ = uart.write(&line[..len]);
            let len = format_fault_report(&faults.snapshot(), &mut reported_faults, &mut line);
            let _ = uart.write(&line[..len]);
            last_status = now;
        }

        if idle {
            esp_idf_svc::hal::delay::FreeRtos::delay_ms(10);
        }
    }
}
