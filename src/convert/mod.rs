//! Format converter
//!
//! Normalizes channel count, sample width, and layout between a capture
//! stream configuration and the codec-facing configuration. Conversion is
//! dispatched through an ordered list of [`ConvertMethod`] candidates;
//! initialization binds the first one whose `can_handle` predicate
//! matches. No bundled method performs sample-rate conversion — rates
//! must already agree, or initialization fails.

mod passthrough;
mod repack;

pub use passthrough::PassthroughCopy;
pub use repack::LayoutRepack;

use crate::error::{PipelineError, Result};
use crate::types::StreamConfig;

/// One conversion strategy between two stream configurations.
///
/// Channel planes are borrowed per call: `src` holds one slice per input
/// plane, `dst` one mutable slice per output plane. `samples` is counted
/// per channel. Returns the number of samples actually produced; a count
/// smaller than requested is a backpressure signal, not an error.
pub trait ConvertMethod {
    fn name(&self) -> &'static str;

    /// Whether this method covers the given configuration pair.
    fn can_handle(&self, input: &StreamConfig, output: &StreamConfig) -> bool;

    fn convert(
        &self,
        input: &StreamConfig,
        output: &StreamConfig,
        src: &[&[u8]],
        dst: &mut [&mut [u8]],
        samples: usize,
    ) -> usize;
}

/// The ordered candidate list. First match wins, so the cheap byte-copy
/// passthrough is tried before the per-sample repack loop. A real
/// rate-conversion filter would slot in at the end without touching
/// initialization.
fn candidate_methods() -> Vec<Box<dyn ConvertMethod>> {
    vec![Box::new(PassthroughCopy), Box::new(LayoutRepack)]
}

/// Converts frames between an input and an output stream configuration.
///
/// Both configurations are mutable until [`initialize`](Self::initialize)
/// binds a strategy; afterwards they are frozen and only the per-call
/// channel planes change.
pub struct FormatConverter {
    input: StreamConfig,
    output: StreamConfig,
    method: Option<Box<dyn ConvertMethod>>,
}

impl Default for FormatConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatConverter {
    pub fn new() -> Self {
        FormatConverter {
            input: StreamConfig::default(),
            output: StreamConfig::default(),
            method: None,
        }
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.method.is_some() {
            return Err(PipelineError::Config(
                "converter configuration is frozen after initialization".into(),
            ));
        }
        Ok(())
    }

    /// Replace the input-side configuration.
    pub fn set_input_config(&mut self, config: StreamConfig) -> Result<()> {
        self.ensure_mutable()?;
        self.input = config;
        Ok(())
    }

    /// Replace the output-side configuration.
    pub fn set_output_config(&mut self, config: StreamConfig) -> Result<()> {
        self.ensure_mutable()?;
        self.output = config;
        Ok(())
    }

    /// Copy format, rate, and channel count from a capture stream
    /// configuration into the input side. The frame sample count is left
    /// alone; it is sized from the codec side.
    pub fn match_source(&mut self, config: &StreamConfig) -> Result<()> {
        self.ensure_mutable()?;
        self.input.format = config.format;
        self.input.sample_rate = config.sample_rate;
        self.input.channels = config.channels;
        Ok(())
    }

    /// Adopt an initialized codec driver's negotiated parameters as the
    /// output side, and size both frame sample counts to the codec's
    /// frame length.
    pub fn match_destination(&mut self, driver: &crate::codec::driver::CodecDriver) -> Result<()> {
        self.ensure_mutable()?;
        let frame_samples = driver.frame_length()?;
        self.output.format = driver.negotiated_format()?;
        self.output.sample_rate = driver.negotiated_sample_rate()?;
        self.output.channels = driver.channels();
        self.output.frame_samples = frame_samples;
        self.input.frame_samples = frame_samples;
        Ok(())
    }

    pub fn input_config(&self) -> &StreamConfig {
        &self.input
    }

    pub fn output_config(&self) -> &StreamConfig {
        &self.output
    }

    /// Bind the first candidate strategy that covers the configured pair.
    ///
    /// Fails without binding anything when the sample rates differ or no
    /// candidate matches; the instance is then unusable and a new one must
    /// be configured.
    pub fn initialize(&mut self) -> Result<()> {
        self.ensure_mutable()?;

        if self.input.sample_rate != self.output.sample_rate {
            return Err(PipelineError::Config(format!(
                "sample rate conversion is not supported ({} Hz -> {} Hz)",
                self.input.sample_rate, self.output.sample_rate
            )));
        }

        match candidate_methods()
            .into_iter()
            .find(|m| m.can_handle(&self.input, &self.output))
        {
            Some(method) => {
                tracing::debug!(
                    method = method.name(),
                    input = %self.input.format,
                    output = %self.output.format,
                    "converter strategy bound"
                );
                self.method = Some(method);
                Ok(())
            }
            None => Err(PipelineError::NoConversionPath(format!(
                "{} {}ch -> {} {}ch",
                self.input.format, self.input.channels, self.output.format, self.output.channels
            ))),
        }
    }

    /// Convert `sample_count` samples per channel from `src` into `dst`.
    ///
    /// A `sample_count` of 0 means "use the configured frame size".
    /// Returns the number of samples produced; treat a short count as
    /// end-of-data, not an error.
    pub fn convert(
        &self,
        src: &[&[u8]],
        dst: &mut [&mut [u8]],
        sample_count: usize,
    ) -> Result<usize> {
        let method = self.method.as_ref().ok_or_else(|| {
            PipelineError::Config("converter has not been initialized".into())
        })?;
        let samples = if sample_count == 0 {
            self.input.frame_samples
        } else {
            sample_count
        };
        Ok(method.convert(&self.input, &self.output, src, dst, samples))
    }
}
