//! Averaged acquisition of one multiplexer channel.

use core::sync::atomic::{AtomicU16, Ordering};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::channel::{Channel, CHANNEL_COUNT};
use crate::hal::{AnalogInput, Mux};

/// Wait after the mux settled before the first conversion.
pub const ACQUISITION_DELAY_US: u32 = 20;

/// Conversions averaged per reading. Power of two: the mean is a shift.
pub const SAMPLES_PER_READING: u32 = 4;

/// Latest averaged reading per channel.
///
/// Written by the sampler only, read by telemetry.
pub struct RawSamples {
    values: [AtomicU16; CHANNEL_COUNT],
}

impl RawSamples {
    pub const fn new() -> Self {
        const ZERO: AtomicU16 = AtomicU16::new(0);
        Self { values: [ZERO; CHANNEL_COUNT] }
    }

    #[inline]
    pub fn get(&self, channel: Channel) -> u16 {
        self.values[channel.index()].load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record(&self, channel: Channel, raw: u16) {
        self.values[channel.index()].store(raw, Ordering::Relaxed);
    }

    /// All channels, ascending.
    pub fn snapshot(&self) -> [u16; CHANNEL_COUNT] {
        let mut out = [0u16; CHANNEL_COUNT];
        for (value, slot) in out.iter_mut().zip(self.values.iter()) {
            *value = slot.load(Ordering::Relaxed);
        }
        out
    }
}

impl Default for RawSamples {
    fn default() -> Self {
        Self::new()
    }
}

/// Mux + ADC + delay, producing one averaged reading per call.
pub struct ChannelSampler<P, A, D> {
    mux: Mux<P>,
    adc: A,
    delay: D,
}

impl<P, A, D> ChannelSampler<P, A, D>
where
    P: OutputPin,
    A: AnalogInput,
    D: DelayNs,
{
    pub fn new(mux: Mux<P>, adc: A, delay: D) -> Self {
        Self { mux, adc, delay }
    }

    /// Select `channel`, average [`SAMPLES_PER_READING`] conversions and
    /// record the result in `raw`.
    pub fn sample(&mut self, channel: Channel, raw: &RawSamples) -> u16 {
        self.mux.select(channel, &mut self.delay);
        self.delay.delay_us(ACQUISITION_DELAY_US);

        let sum: u32 = (0..SAMPLES_PER_READING)
            .map(|_| u32::from(self.adc.read_raw()))
            .sum();
        let reading = (sum / SAMPLES_PER_READING) as u16;

        raw.record(channel, reading);
        reading
    }
}
