//! Process-lifetime state shared by the scan and protocol tasks.
//!
//! | field      | written by          | read by          |
//! |------------|---------------------|------------------|
//! | `keymap`   | scan (`pressed`), protocol (`threshold`, `keycode`) | both |
//! | `raw`      | scan                | protocol (`RAW:`) |
//! | connected  | protocol            | protocol         |
//! | `faults`   | both                | diagnostics      |

use core::sync::atomic::{AtomicBool, Ordering};

use crate::config::Keymap;
use crate::fault::FaultState;
use crate::touch::RawSamples;

pub struct ControllerState {
    pub keymap: Keymap,
    pub raw: RawSamples,
    pub faults: FaultState,
    /// Configuration tool attached (`CONNECT` seen, no `DISCONNECT` since).
    connected: AtomicBool,
}

impl ControllerState {
    /// Defaults, released, tool detached.
    pub const fn new() -> Self {
        Self {
            keymap: Keymap::new(),
            raw: RawSamples::new(),
            faults: FaultState::new(),
            connected: AtomicBool::new(false),
        }
    }

    /// Gates `RAW:` telemetry only; key events do not depend on it.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::new()
    }
}
