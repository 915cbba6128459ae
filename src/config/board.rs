//! Board wiring and fixed timing.

/// Pin assignment of the controller board.
///
/// `mux_pins` and `adc_channel` describe the wiring for the boot log only.
/// Peripherals are typed per pin in esp-idf-hal, so the firmware binds
/// GPIO18/19/21/22 and GPIO34 directly; keep both in step when rewiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardConfig {
    /// Multiplexer address lines S0..S3.
    pub mux_pins: [u8; 4],
    /// ADC1 channel carrying the multiplexer output.
    pub adc_channel: u8,
    /// Protocol serial baud rate (UART0).
    pub protocol_baud: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            mux_pins: [18, 19, 21, 22],
            adc_channel: 6, // GPIO34
            protocol_baud: 115_200,
        }
    }
}

/// Task stack size for the scan and protocol tasks.
pub const TASK_STACK_SIZE: usize = 4096;

/// FreeRTOS priority of the scan task (latency critical).
pub const SCAN_TASK_PRIORITY: u8 = 6;

/// FreeRTOS priority of the protocol task.
pub const COMMS_TASK_PRIORITY: u8 = 5;

/// Protocol read/emit cadence.
pub const COMMS_INTERVAL_MS: u32 = 50;
