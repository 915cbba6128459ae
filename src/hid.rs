//! HID keyboard boundary.
//!
//! The wireless stack is external; this module fixes what crosses the
//! boundary: the 8-byte boot keyboard report and the host link state.

use core::sync::atomic::{AtomicU16, Ordering};

/// Advertised device name.
pub const DEVICE_NAME: &str = "OnionController";

/// Appearance advertised by the device (HID keyboard).
pub const APPEARANCE_KEYBOARD: u16 = 0x03C1;

/// HID Information characteristic: bcdHID 1.11, country 0, RemoteWake.
pub const HID_INFO: [u8; 4] = [0x11, 0x01, 0x00, 0x01];

/// Report descriptor: modifiers, reserved byte, 6-key array, report ID 1.
pub const REPORT_MAP: [u8; 47] = [
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    0x85, 0x01, //   Report ID (1)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0xE0, //   Usage Minimum (224)
    0x29, 0xE7, //   Usage Maximum (231)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute): modifiers
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x01, //   Input (Constant): reserved
    0x95, 0x06, //   Report Count (6)
    0x75, 0x08, //   Report Size (8)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x65, //   Logical Maximum (101)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0x65, //   Usage Maximum (101)
    0x81, 0x00, //   Input (Data, Array): keys
    0xC0,       // End Collection
];

/// Keyboard input report: `[modifier, reserved, key1..key6]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyboardReport(pub [u8; 8]);

impl KeyboardReport {
    /// Offset of the first key slot.
    pub const KEY1: usize = 2;

    /// No keys down.
    pub const RELEASED: KeyboardReport = KeyboardReport([0; 8]);

    /// Single-key report: `keycode` in key1 when pressed, all zero on release.
    pub const fn key_event(keycode: u8, pressed: bool) -> Self {
        let mut report = [0u8; 8];
        if pressed {
            report[Self::KEY1] = keycode;
        }
        KeyboardReport(report)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

/// "Send this report to the bonded host."
pub trait HidTransport {
    type Error: core::fmt::Debug;

    fn send_report(&mut self, report: &KeyboardReport) -> Result<(), Self::Error>;
}

const NO_CONNECTION: u16 = 0xFFFF;

/// Host link state, driven by the transport's connect/disconnect events.
pub struct HidLink {
    conn_handle: AtomicU16,
}

impl HidLink {
    pub const fn new() -> Self {
        Self { conn_handle: AtomicU16::new(NO_CONNECTION) }
    }

    pub fn on_host_connected(&self, conn_handle: u16) {
        self.conn_handle.store(conn_handle, Ordering::Release);
    }

    pub fn on_host_disconnected(&self) {
        self.conn_handle.store(NO_CONNECTION, Ordering::Release);
    }

    /// Current connection handle, if a host is linked.
    pub fn conn_handle(&self) -> Option<u16> {
        match self.conn_handle.load(Ordering::Acquire) {
            NO_CONNECTION => None,
            handle => Some(handle),
        }
    }

    pub fn is_linked(&self) -> bool {
        self.conn_handle().is_some()
    }
}

impl Default for HidLink {
    fn default() -> Self {
        Self::new()
    }
}

/// Drops reports while no host is linked, forwards them otherwise.
pub struct LinkedTransport<'a, T> {
    link: &'a HidLink,
    inner: T,
}

impl<'a, T: HidTransport> LinkedTransport<'a, T> {
    pub fn new(link: &'a HidLink, inner: T) -> Self {
        Self { link, inner }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: HidTransport> HidTransport for LinkedTransport<'_, T> {
    type Error = T::Error;

    fn send_report(&mut self, report: &KeyboardReport) -> Result<(), Self::Error> {
        if !self.link.is_linked() {
            return Ok(());
        }
        self.inner.send_report(report)
    }
}
