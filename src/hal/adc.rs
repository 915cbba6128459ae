//! Analog input feeding the channel sampler.

/// One raw conversion of the multiplexer output.
///
/// Sampling is assumed to always succeed; bindings that can fail must map
/// the failure to a reading that classifies as "untouched".
pub trait AnalogInput {
    fn read_raw(&mut self) -> u16;
}

/// ADC full-scale reading at 12-bit width.
pub const ADC_FULL_SCALE: u16 = 4095;

#[cfg(target_os = "espidf")]
pub use esp::EspAnalogInput;

#[cfg(target_os = "espidf")]
mod esp {
    use super::{AnalogInput, ADC_FULL_SCALE};
    use esp_idf_svc::hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
    use esp_idf_svc::hal::adc::ADC1;
    use esp_idf_svc::hal::gpio::Gpio34;

    /// ADC1 channel 6 (GPIO34), one-shot mode.
    pub struct EspAnalogInput<'d> {
        channel: AdcChannelDriver<'d, Gpio34, &'d AdcDriver<'d, ADC1>>,
    }

    impl<'d> EspAnalogInput<'d> {
        pub fn new(channel: AdcChannelDriver<'d, Gpio34, &'d AdcDriver<'d, ADC1>>) -> Self {
            Self { channel }
        }
    }

    impl AnalogInput for EspAnalogInput<'_> {
        fn read_raw(&mut self) -> u16 {
            // Full scale is above every sane threshold: a failed read is "released"
            self.channel.read_raw().unwrap_or(ADC_FULL_SCALE)
        }
    }
}
