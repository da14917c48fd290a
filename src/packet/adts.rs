//! ADTS transport header
//!
//! A fixed 7-byte bit-packed header prefixed to every AAC payload for
//! stream framing. Built by named field setters over a fixed byte array
//! so no field can silently overflow; see
//! <https://wiki.multimedia.cx/index.php/ADTS> for the layout. CRC
//! protection is never used, so the header is always 7 bytes.

use crate::error::{PipelineError, Result};

/// ADTS header length in bytes (protection absent).
pub const ADTS_HEADER_LEN: usize = 7;

/// Maximum value of the 13-bit frame-length field (header + payload).
pub const ADTS_MAX_FRAME_LEN: usize = 0x1FFF;

/// The fixed ADTS sampling-frequency table. The 4-bit index into this
/// table goes into the header; rates outside it cannot be represented.
pub const ADTS_SAMPLE_RATES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

/// Look up the ADTS frequency-table index for a sample rate. `None` means
/// the rate has no ADTS representation and must be rejected before
/// packetization.
pub fn adts_rate_index(sample_rate: u32) -> Option<u8> {
    ADTS_SAMPLE_RATES
        .iter()
        .position(|&r| r == sample_rate)
        .map(|ix| ix as u8)
}

/// MPEG version bit in the ADTS header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    Mpeg4 = 0,
    Mpeg2 = 1,
}

/// A 7-byte ADTS header under construction.
///
/// Defaults: sync pattern set, MPEG-4, layer 0, protection absent,
/// AAC Main profile, variable-bitrate buffer-fullness sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdtsHeader {
    bytes: [u8; ADTS_HEADER_LEN],
}

impl Default for AdtsHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl AdtsHeader {
    pub fn new() -> Self {
        AdtsHeader {
            bytes: [
                0b1111_1111, // sync
                0b1111_0001, // sync | mpeg4 | layer 00 | no CRC
                0b0001_0000,
                0b1000_0000,
                0b0000_0000,
                0b0001_1111, // buffer fullness sentinel (high)
                0b1111_1100, // buffer fullness sentinel (low) | frames-1 = 0
            ],
        }
    }

    pub fn set_mpeg_version(&mut self, version: MpegVersion) {
        self.bytes[1] = (self.bytes[1] & 0b1111_0111) | ((version as u8) << 3);
    }

    /// 2-bit AAC profile field.
    pub fn set_profile(&mut self, profile: crate::types::AacProfile) {
        self.bytes[2] = (self.bytes[2] & 0b0011_1111) | ((profile as u8 & 0b11) << 6);
    }

    /// 4-bit sampling-frequency index. Values ≥ 15 are not valid table
    /// indices.
    pub fn set_sample_rate_index(&mut self, index: u8) -> Result<()> {
        if index >= 15 {
            return Err(PipelineError::Config(format!(
                "ADTS frequency index {} out of range",
                index
            )));
        }
        self.bytes[2] = (self.bytes[2] & 0b1100_0011) | ((index & 0b1111) << 2);
        Ok(())
    }

    /// 3-bit channel configuration, split across bytes 2 and 3.
    pub fn set_channel_config(&mut self, config: u8) -> Result<()> {
        if config >= 8 {
            return Err(PipelineError::Config(format!(
                "ADTS channel configuration {} out of range",
                config
            )));
        }
        self.bytes[2] = (self.bytes[2] & 0b1111_1110) | ((config & 0b0111) >> 2);
        self.bytes[3] = (self.bytes[3] & 0b0011_1111) | ((config & 0b0011) << 6);
        Ok(())
    }

    /// 13-bit frame length: payload bytes plus the 7 header bytes, split
    /// across bytes 3, 4, and 5.
    pub fn set_payload_len(&mut self, payload_len: usize) -> Result<()> {
        let total = payload_len + ADTS_HEADER_LEN;
        if total > ADTS_MAX_FRAME_LEN {
            return Err(PipelineError::PacketTooLarge(payload_len));
        }
        let total = total as u16;
        self.bytes[3] = (self.bytes[3] & 0b1111_1100) | ((total >> 11) as u8 & 0b11);
        self.bytes[4] = (total >> 3) as u8;
        self.bytes[5] = (self.bytes[5] & 0b0001_1111) | (((total & 0b111) as u8) << 5);
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8; ADTS_HEADER_LEN] {
        &self.bytes
    }

    /// Decode the framing fields back out of raw header bytes. Used to
    /// verify constructed headers and by anything that wants to walk an
    /// ADTS stream.
    pub fn decode(bytes: &[u8; ADTS_HEADER_LEN]) -> Result<DecodedAdtsHeader> {
        if bytes[0] != 0xFF || (bytes[1] & 0xF0) != 0xF0 {
            return Err(PipelineError::Config(
                "ADTS sync pattern missing".into(),
            ));
        }
        let profile = (bytes[2] >> 6) & 0b11;
        let sample_rate_index = (bytes[2] >> 2) & 0b1111;
        let channel_config = ((bytes[2] & 0b1) << 2) | ((bytes[3] >> 6) & 0b11);
        let frame_length = (u16::from(bytes[3] & 0b11) << 11)
            | (u16::from(bytes[4]) << 3)
            | u16::from(bytes[5] >> 5);
        Ok(DecodedAdtsHeader {
            mpeg2: (bytes[1] >> 3) & 0b1 == 1,
            profile,
            sample_rate_index,
            channel_config,
            frame_length,
        })
    }
}

/// Framing fields recovered from a 7-byte ADTS header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedAdtsHeader {
    pub mpeg2: bool,
    pub profile: u8,
    pub sample_rate_index: u8,
    pub channel_config: u8,
    /// Header + payload length in bytes.
    pub frame_length: u16,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AacProfile;

    #[test]
    fn test_rate_table_lookup() {
        assert_eq!(adts_rate_index(96000), Some(0));
        assert_eq!(adts_rate_index(44100), Some(4));
        assert_eq!(adts_rate_index(8000), Some(11));
        assert_eq!(adts_rate_index(7350), Some(12));
        assert_eq!(adts_rate_index(44101), None);
        assert_eq!(adts_rate_index(192000), None);
    }

    #[test]
    fn test_header_round_trip() {
        for (rate_ix, channels, payload) in
            [(4u8, 2u8, 317usize), (3, 1, 0), (11, 7, 8184)]
        {
            let mut header = AdtsHeader::new();
            header.set_profile(AacProfile::LowComplexity);
            header.set_sample_rate_index(rate_ix).unwrap();
            header.set_channel_config(channels).unwrap();
            header.set_payload_len(payload).unwrap();

            let decoded = AdtsHeader::decode(header.as_bytes()).unwrap();
            assert_eq!(decoded.profile, AacProfile::LowComplexity as u8);
            assert_eq!(decoded.sample_rate_index, rate_ix);
            assert_eq!(decoded.channel_config, channels);
            assert_eq!(decoded.frame_length as usize, payload + ADTS_HEADER_LEN);
            assert!(!decoded.mpeg2);
        }
    }

    #[test]
    fn test_fixed_bits() {
        let mut header = AdtsHeader::new();
        header.set_profile(AacProfile::LowComplexity);
        header.set_sample_rate_index(4).unwrap();
        header.set_channel_config(2).unwrap();
        header.set_payload_len(100).unwrap();

        let bytes = header.as_bytes();
        assert_eq!(bytes[0], 0xFF);
        assert_eq!(bytes[1], 0xF1); // MPEG-4, layer 00, protection absent
        assert_eq!(bytes[5] & 0b0001_1111, 0b0001_1111); // VBR sentinel
        assert_eq!(bytes[6], 0xFC);
    }

    #[test]
    fn test_mpeg2_bit() {
        let mut header = AdtsHeader::new();
        header.set_mpeg_version(MpegVersion::Mpeg2);
        assert!(AdtsHeader::decode(header.as_bytes()).unwrap().mpeg2);
        header.set_mpeg_version(MpegVersion::Mpeg4);
        assert!(!AdtsHeader::decode(header.as_bytes()).unwrap().mpeg2);
    }

    #[test]
    fn test_payload_length_limit() {
        let mut header = AdtsHeader::new();
        // 8191 - 7 = 8184 is the largest representable payload
        assert!(header.set_payload_len(8184).is_ok());
        assert!(matches!(
            header.set_payload_len(8185).unwrap_err(),
            PipelineError::PacketTooLarge(8185)
        ));
    }

    #[test]
    fn test_field_range_checks() {
        let mut header = AdtsHeader::new();
        assert!(header.set_sample_rate_index(15).is_err());
        assert!(header.set_channel_config(8).is_err());
    }

    #[test]
    fn test_decode_rejects_missing_sync() {
        let bytes = [0u8; ADTS_HEADER_LEN];
        assert!(AdtsHeader::decode(&bytes).is_err());
    }
}
