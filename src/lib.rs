//! # OnionController
//!
//! 16 capacitive touch pads behind a 4-bit analog multiplexer, reported to
//! a host as a BLE HID keyboard, configurable over a serial line protocol.
//!
//! ## Architecture
//!
//! Two tasks share one [`ControllerState`]:
//! - **Scan** ([`scan::ScanScheduler`]): mux → averaged ADC reading →
//!   threshold → edge → one HID report per edge; 10 ms / 50 ms pacing.
//! - **Comms** ([`protocol::ProtocolHandler`]): `CONNECT` / `DISCONNECT` /
//!   `SET:` in, `CFG:` / `RAW:` out every 50 ms; every `SET` persists the
//!   keymap to NVS.
//!
//! Scan writes `pressed` and raw samples, comms writes thresholds and
//! keycodes. Whole-table reads and two-field writes take a critical section.

#![cfg_attr(not(test), no_std)]

pub mod channel;
pub mod config;
pub mod fault;
pub mod hal;
pub mod hid;
pub mod log_globals;
pub mod logging;
pub mod protocol;
pub mod scan;
pub mod state;
pub mod touch;
pub mod uart_logger;

pub use channel::{Channel, CHANNEL_COUNT};
pub use config::{KeyEntry, Keymap, KeymapStore, LoadResult, NvsError};
pub use fault::{FaultCode, FaultState};
pub use hid::{HidLink, HidTransport, KeyboardReport};
pub use log_globals::{COMMS_LOG_STREAM, SCAN_LOG_STREAM};
pub use protocol::ProtocolHandler;
pub use scan::{ScanConfig, ScanScheduler, SweepReport};
pub use state::ControllerState;
pub use touch::{is_touched, ChannelSampler, RawSamples, TouchScanner};
