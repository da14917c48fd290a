//! Block codec boundary
//!
//! The compression algorithm itself lives outside this crate. A codec is
//! anything that consumes fixed-length PCM/float frames and produces
//! compressed payload chunks through a submit/drain protocol, modeled
//! after the send-frame / receive-packet shape of libavcodec-style
//! encoders: `receive_packet` returns `Ok(None)` both for "needs more
//! input" and for end-of-stream, and hard failures are [`CodecError`].

pub mod driver;

use crate::error::CodecError;
use crate::types::SampleFormat;

/// Parameters the driver negotiates before opening a codec.
#[derive(Debug, Clone, Copy)]
pub struct CodecRequest {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_rate: u32,
    pub format: SampleFormat,
}

/// What an opened codec reports about itself.
#[derive(Debug, Clone, Copy)]
pub struct CodecInfo {
    /// Samples per channel consumed by one encode call
    pub frame_length: usize,
    /// Warm-up samples (per channel) emitted before audio-aligned output
    pub priming_delay: u64,
    /// Upper bound on one packet's payload size in bytes
    pub max_packet_bytes: usize,
}

/// Metadata for one drained packet. The payload itself was written into
/// the buffer handed to [`BlockCodec::receive_packet`].
#[derive(Debug, Clone, Copy)]
pub struct PacketMeta {
    /// Payload length in bytes
    pub size: usize,
    /// Duration in samples per channel
    pub duration: u32,
}

/// A block-oriented audio codec collaborator.
pub trait BlockCodec {
    /// Codec name, for diagnostics.
    fn name(&self) -> &str;

    /// Sample rates the codec supports, in the codec's preference order.
    /// Empty means "any rate".
    fn supported_sample_rates(&self) -> &[u32];

    /// Sample formats the codec supports, in the codec's preference
    /// order. Never empty; the first entry is the fallback format.
    fn supported_formats(&self) -> &[SampleFormat];

    /// Open the codec with negotiated parameters.
    fn open(&mut self, request: &CodecRequest) -> Result<CodecInfo, CodecError>;

    /// Submit `samples` samples per channel from the input planes.
    /// Returns the number of samples (per channel) actually consumed;
    /// unconsumed samples stay the caller's responsibility.
    fn send_frame(&mut self, planes: &[&[u8]], samples: usize) -> Result<usize, CodecError>;

    /// Signal end-of-stream so remaining buffered packets can drain.
    fn send_eof(&mut self) -> Result<(), CodecError>;

    /// Drain one packet into `out`. `Ok(None)` means the codec has no
    /// more output for the current input batch (or has reached end of
    /// stream) — the normal termination of a drain loop.
    fn receive_packet(&mut self, out: &mut [u8]) -> Result<Option<PacketMeta>, CodecError>;
}

/// Encoder configuration owned by the codec driver.
///
/// The asynchronous-mode fields are carried for codecs that buffer output
/// frames internally; the synchronous driver itself never spawns anything
/// and leaves `async_supported` false.
#[derive(Debug, Clone, Copy)]
pub struct EncoderConfig {
    /// Target bit rate in bits per second
    pub bit_rate: u32,
    /// Requested sample rate in Hz (the codec may negotiate a neighbor)
    pub sample_rate: u32,
    /// Number of audio channels
    pub channels: u16,
    /// Requested input sample format (the codec may reject it)
    pub format: SampleFormat,
    /// Maximum output frames buffered in asynchronous mode
    pub max_buffered_frames: usize,
    /// Whether asynchronous encode/drain is requested
    pub async_supported: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig {
            bit_rate: 128_000,
            sample_rate: 44100,
            channels: 2,
            format: SampleFormat::S16,
            max_buffered_frames: 0,
            async_supported: false,
        }
    }
}
