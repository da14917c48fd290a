//! Packetizer
//!
//! Wraps each compressed payload in its ADTS transport header and hands
//! the tagged, timed buffer to the container's sample table.

pub mod adts;

use bytes::{BufMut, Bytes, BytesMut};

use crate::container::SampleTable;
use crate::error::{PipelineError, Result};
use crate::packet::adts::{adts_rate_index, AdtsHeader, ADTS_HEADER_LEN};
use crate::types::AacProfile;

/// Builds ADTS-framed packets for one negotiated stream configuration.
///
/// The header template is fixed at construction; only the frame-length
/// field changes per packet. Construction fails for sample rates with no
/// ADTS table entry — reject those before packetization, the sentinel
/// index is never written.
#[derive(Debug)]
pub struct Packetizer {
    template: AdtsHeader,
    description_index: u32,
}

impl Packetizer {
    pub fn new(
        profile: AacProfile,
        sample_rate: u32,
        channels: u16,
        description_index: u32,
    ) -> Result<Self> {
        let rate_index = adts_rate_index(sample_rate)
            .ok_or(PipelineError::UnsupportedAdtsRate(sample_rate))?;

        let mut template = AdtsHeader::new();
        template.set_profile(profile);
        template.set_sample_rate_index(rate_index)?;
        template.set_channel_config(channels as u8)?;

        Ok(Packetizer {
            template,
            description_index,
        })
    }

    /// Index into the container's sample-description table that this
    /// packetizer tags samples with.
    pub fn description_index(&self) -> u32 {
        self.description_index
    }

    /// Prepend the ADTS header to `payload` and return the framed buffer.
    pub fn frame(&self, payload: &[u8]) -> Result<Bytes> {
        let mut header = self.template;
        header.set_payload_len(payload.len())?;

        let mut buf = BytesMut::with_capacity(ADTS_HEADER_LEN + payload.len());
        buf.put_slice(header.as_bytes());
        buf.put_slice(payload);
        Ok(buf.freeze())
    }

    /// Frame `payload` and append it to the sample table with its
    /// duration and this packetizer's sample-description index.
    pub fn push(
        &self,
        table: &mut SampleTable,
        payload: &[u8],
        duration_samples: u32,
    ) -> Result<()> {
        let framed = self.frame(payload)?;
        table.push_sample(framed, duration_samples, self.description_index);
        Ok(())
    }
}
