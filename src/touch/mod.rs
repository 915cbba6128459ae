//! Touch pipeline: mux channel → averaged raw reading → touched? → edge.
//!
//! The sampler records every reading in [`RawSamples`] so telemetry always
//! shows the latest scan.

pub mod detector;
pub mod sampler;

pub use detector::{is_touched, TouchScanner};
pub use sampler::{ChannelSampler, RawSamples, ACQUISITION_DELAY_US, SAMPLES_PER_READING};
