//! Container handoff
//!
//! The pipeline's output is a timed sample table for a single audio
//! track: framed payloads, their durations, and the index of the codec
//! configuration that produced them. The table can be serialized to an
//! M4A file through the `mp4` crate.

use std::io::{Seek, Write};

use bytes::Bytes;

use crate::error::{PipelineError, Result};
use crate::packet::adts::adts_rate_index;
use crate::types::AacProfile;

/// One codec configuration referenced by samples in the table.
#[derive(Debug, Clone, Copy)]
pub struct SampleDescription {
    pub profile: AacProfile,
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_rate: u32,
}

/// One timed, framed sample.
#[derive(Debug, Clone)]
pub struct SampleEntry {
    pub bytes: Bytes,
    /// Duration in samples (track timescale = sample rate)
    pub duration: u32,
    /// Index into the description table
    pub description_index: u32,
}

/// Timed sample table for a single audio track.
#[derive(Debug, Default)]
pub struct SampleTable {
    descriptions: Vec<SampleDescription>,
    samples: Vec<SampleEntry>,
    total_duration: u64,
}

impl SampleTable {
    pub fn new() -> Self {
        SampleTable::default()
    }

    /// Register a codec configuration and return its index; samples
    /// reference configurations by this index.
    pub fn add_description(&mut self, description: SampleDescription) -> u32 {
        let index = self.descriptions.len() as u32;
        self.descriptions.push(description);
        index
    }

    pub fn push_sample(&mut self, bytes: Bytes, duration: u32, description_index: u32) {
        self.total_duration += u64::from(duration);
        self.samples.push(SampleEntry {
            bytes,
            duration,
            description_index,
        });
    }

    pub fn descriptions(&self) -> &[SampleDescription] {
        &self.descriptions
    }

    pub fn samples(&self) -> &[SampleEntry] {
        &self.samples
    }

    /// Sum of all sample durations, in track timescale units.
    pub fn total_duration(&self) -> u64 {
        self.total_duration
    }

    /// Serialize the table as a single-audio-track M4A file.
    ///
    /// The track timescale is the negotiated sample rate, so sample
    /// durations go in unchanged.
    pub fn write_m4a<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let description = self.descriptions.first().ok_or_else(|| {
            PipelineError::Container("sample table has no sample description".into())
        })?;

        let freq_index = adts_rate_index(description.sample_rate)
            .ok_or(PipelineError::UnsupportedAdtsRate(description.sample_rate))?;

        let config = mp4::Mp4Config {
            major_brand: str::parse("M4A ").map_err(container_err)?,
            minor_version: 512,
            compatible_brands: vec![
                str::parse("isom").map_err(container_err)?,
                str::parse("M4A ").map_err(container_err)?,
                str::parse("mp42").map_err(container_err)?,
            ],
            timescale: description.sample_rate,
        };

        let mut mp4_writer = mp4::Mp4Writer::write_start(writer, &config).map_err(container_err)?;

        let track = mp4::TrackConfig {
            track_type: mp4::TrackType::Audio,
            timescale: description.sample_rate,
            language: "eng".to_string(),
            media_conf: mp4::MediaConfig::AacConfig(mp4::AacConfig {
                bitrate: description.bit_rate,
                profile: object_type(description.profile),
                freq_index: mp4::SampleFreqIndex::try_from(freq_index).map_err(container_err)?,
                chan_conf: mp4::ChannelConfig::try_from(description.channels as u8)
                    .map_err(container_err)?,
            }),
        };
        mp4_writer.add_track(&track).map_err(container_err)?;

        let mut start_time: u64 = 0;
        for entry in &self.samples {
            let sample = mp4::Mp4Sample {
                start_time,
                duration: entry.duration,
                rendering_offset: 0,
                is_sync: true,
                bytes: entry.bytes.clone(),
            };
            mp4_writer.write_sample(1, &sample).map_err(container_err)?;
            start_time += u64::from(entry.duration);
        }

        mp4_writer.write_end().map_err(container_err)?;
        Ok(())
    }
}

fn object_type(profile: AacProfile) -> mp4::AudioObjectType {
    match profile {
        AacProfile::Main => mp4::AudioObjectType::AacMain,
        AacProfile::LowComplexity => mp4::AudioObjectType::AacLowComplexity,
        AacProfile::ScalableSampleRate => mp4::AudioObjectType::AacScalableSampleRate,
        AacProfile::LongTermPrediction => mp4::AudioObjectType::AacLongTermPrediction,
    }
}

fn container_err<E: std::fmt::Display>(e: E) -> PipelineError {
    PipelineError::Container(e.to_string())
}
