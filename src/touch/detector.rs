//! Touch classification and per-channel edge detection.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::channel::Channel;
use crate::hal::AnalogInput;
use crate::state::ControllerState;
use crate::touch::sampler::ChannelSampler;

/// Lower reading = more capacitance = touched.
///
/// One threshold for both directions; readings hovering at the threshold
/// can chatter.
#[inline]
pub const fn is_touched(raw: u16, threshold: u16) -> bool {
    raw < threshold
}

/// Sampler bound to the shared controller state.
///
/// The debounced state per channel lives in the keymap's `pressed` field,
/// which only this type writes.
pub struct TouchScanner<'a, P, A, D> {
    sampler: ChannelSampler<P, A, D>,
    state: &'a ControllerState,
}

impl<'a, P, A, D> TouchScanner<'a, P, A, D>
where
    P: OutputPin,
    A: AnalogInput,
    D: DelayNs,
{
    pub fn new(sampler: ChannelSampler<P, A, D>, state: &'a ControllerState) -> Self {
        Self { sampler, state }
    }

    /// Fresh reading of `channel` (also updates telemetry).
    pub fn sample(&mut self, channel: Channel) -> u16 {
        self.sampler.sample(channel, &self.state.raw)
    }

    /// Sample `channel` and classify it against its configured threshold.
    pub fn is_touched(&mut self, channel: Channel) -> bool {
        let raw = self.sample(channel);
        is_touched(raw, self.state.keymap.threshold(channel))
    }

    /// Sample once and compare with the stored state.
    ///
    /// On a transition the stored state is updated and the new state is
    /// returned; otherwise `None`. Call exactly once per channel per sweep.
    pub fn has_changed(&mut self, channel: Channel) -> Option<bool> {
        let touched = self.is_touched(channel);
        let keymap = &self.state.keymap;
        if touched != keymap.is_pressed(channel) {
            keymap.set_pressed(channel, touched);
            Some(touched)
        } else {
            None
        }
    }

    pub fn state(&self) -> &'a ControllerState {
        self.state
    }
}
