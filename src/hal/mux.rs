//! 16:1 analog multiplexer address lines.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{OutputPin, PinState};

use crate::channel::Channel;

/// Settle time after changing the address before the analog output is valid.
pub const MUX_SETTLE_US: u32 = 100;

/// Four address outputs S0..S3 of the multiplexer.
pub struct Mux<P> {
    lines: [P; 4],
}

impl<P: OutputPin> Mux<P> {
    /// `lines[i]` drives address bit `i`.
    pub fn new(lines: [P; 4]) -> Self {
        Self { lines }
    }

    /// Route `channel` to the analog output and wait for it to settle.
    pub fn select(&mut self, channel: Channel, delay: &mut impl DelayNs) {
        let addr = channel.address();
        for (bit, line) in self.lines.iter_mut().enumerate() {
            let state = PinState::from((addr >> bit) & 0x01 != 0);
            // GPIO writes on configured outputs do not fail
            let _ = line.set_state(state);
        }
        delay.delay_us(MUX_SETTLE_US);
    }
}
