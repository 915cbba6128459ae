//! Scan scheduler: sweep all channels, dispatch edges, pace adaptively.
//!
//! ```text
//! loop {
//!     for ch in 0..16 { if edge(ch) { send_report(keycode(ch), pressed) } }
//!     sleep(any edge ? 10ms : 50ms)
//! }
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::channel::Channel;
use crate::hal::{uptime_us, AnalogInput};
use crate::hid::{HidTransport, KeyboardReport};
use crate::fault::FaultCode;
use crate::log_globals::SCAN_LOG_STREAM;
use crate::touch::TouchScanner;
use crate::{rt_debug, rt_warn};

/// Sweep pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    /// Delay after a sweep that saw at least one transition.
    pub active_interval_ms: u32,
    /// Delay after a quiet sweep.
    pub idle_interval_ms: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            active_interval_ms: 10,
            idle_interval_ms: 50,
        }
    }
}

impl ScanConfig {
    /// Delay before the next sweep.
    #[inline]
    pub fn next_delay_ms(&self, transitions: u32) -> u32 {
        if transitions > 0 {
            self.active_interval_ms
        } else {
            self.idle_interval_ms
        }
    }
}

/// What one sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Edges detected.
    pub transitions: u32,
    /// Reports the transport refused.
    pub failed_reports: u32,
}

pub struct ScanScheduler<'a, P, A, D, H> {
    scanner: TouchScanner<'a, P, A, D>,
    hid: H,
    config: ScanConfig,
}

impl<'a, P, A, D, H> ScanScheduler<'a, P, A, D, H>
where
    P: OutputPin,
    A: AnalogInput,
    D: DelayNs,
    H: HidTransport,
{
    pub fn new(scanner: TouchScanner<'a, P, A, D>, hid: H, config: ScanConfig) -> Self {
        Self { scanner, hid, config }
    }

    /// Visit every channel once, ascending, dispatching one report per edge.
    pub fn sweep(&mut self) -> SweepReport {
        let mut report = SweepReport::default();

        for channel in Channel::all() {
            let Some(pressed) = self.scanner.has_changed(channel) else {
                continue;
            };
            report.transitions += 1;

            let state = self.scanner.state();
            let keycode = state.keymap.keycode(channel);
            rt_debug!(
                SCAN_LOG_STREAM,
                uptime_us(),
                "ch {}: {}",
                channel,
                if pressed { "pressed" } else { "released" }
            );

            if let Err(e) = self.hid.send_report(&KeyboardReport::key_event(keycode, pressed)) {
                report.failed_reports += 1;
                state.faults.set(FaultCode::ReportDropped, u32::from(channel.address()));
                rt_warn!(SCAN_LOG_STREAM, uptime_us(), "ch {}: report dropped: {:?}", channel, e);
            }
        }

        report
    }

    /// One sweep plus the delay it selects.
    pub fn step(&mut self) -> (SweepReport, u32) {
        let report = self.sweep();
        (report, self.config.next_delay_ms(report.transitions))
    }

    /// Scan forever, sleeping via `sleep_ms` between sweeps.
    pub fn run(&mut self, mut sleep_ms: impl FnMut(u32)) -> ! {
        loop {
            let (_, delay) = self.step();
            sleep_ms(delay);
        }
    }

    pub fn hid(&self) -> &H {
        &self.hid
    }
}
