//! Configuration file support
//!
//! Loads pipeline configuration from TOML files.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::codec::EncoderConfig;
use crate::error::{PipelineError, Result};
use crate::packet::adts::adts_rate_index;
use crate::types::SampleFormat;

/// Pipeline configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Encoder settings
    pub encoder: EncoderSettings,
    /// Capture-side stream settings
    pub capture: CaptureSettings,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderSettings {
    /// Target bitrate in bps
    pub bit_rate: u32,
    /// Target sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u16,
    /// Requested codec input format ("s16", "s16p", "f32", "f32p")
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Capture sample format ("s16", "s16p", "f32", "f32p")
    pub format: String,
    /// Capture channel count
    pub channels: u16,
    /// Capture sample rate in Hz
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            encoder: EncoderSettings {
                bit_rate: 128_000,
                sample_rate: 44100,
                channels: 2,
                format: None,
            },
            capture: CaptureSettings {
                format: "s16".to_string(),
                channels: 2,
                sample_rate: 44100,
            },
            logging: None,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(contents)
            .map_err(|e| PipelineError::Config(format!("invalid config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate settings that would otherwise only fail deep inside the
    /// pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.encoder.channels == 0 || self.encoder.channels > 8 {
            return Err(PipelineError::Config(format!(
                "encoder channel count {} out of range (1..=8)",
                self.encoder.channels
            )));
        }
        if self.capture.channels == 0 || self.capture.channels > 8 {
            return Err(PipelineError::Config(format!(
                "capture channel count {} out of range (1..=8)",
                self.capture.channels
            )));
        }
        if self.encoder.bit_rate == 0 {
            return Err(PipelineError::Config("bit rate must be non-zero".into()));
        }
        if adts_rate_index(self.encoder.sample_rate).is_none() {
            return Err(PipelineError::UnsupportedAdtsRate(self.encoder.sample_rate));
        }
        parse_format(&self.capture.format)?;
        if let Some(format) = &self.encoder.format {
            parse_format(format)?;
        }
        Ok(())
    }

    /// The capture-side sample format.
    pub fn capture_format(&self) -> Result<SampleFormat> {
        parse_format(&self.capture.format)
    }

    /// Build the codec driver configuration.
    pub fn encoder_config(&self) -> Result<EncoderConfig> {
        let format = match &self.encoder.format {
            Some(name) => parse_format(name)?,
            None => SampleFormat::S16,
        };
        Ok(EncoderConfig {
            bit_rate: self.encoder.bit_rate,
            sample_rate: self.encoder.sample_rate,
            channels: self.encoder.channels,
            format,
            ..EncoderConfig::default()
        })
    }
}

fn parse_format(name: &str) -> Result<SampleFormat> {
    match name {
        "s16" => Ok(SampleFormat::S16),
        "s16p" => Ok(SampleFormat::S16Planar),
        "f32" => Ok(SampleFormat::F32),
        "f32p" => Ok(SampleFormat::F32Planar),
        other => Err(PipelineError::Config(format!(
            "unknown sample format {:?} (expected s16, s16p, f32, f32p)",
            other
        ))),
    }
}
