//! Shared data types for the packaging pipeline.

/// Scalar sample type, independent of channel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleScalar {
    /// Signed 16-bit PCM
    S16,
    /// 32-bit float
    F32,
}

/// Sample format of a raw audio stream: scalar type plus channel layout.
///
/// Interleaved formats cycle all channels through one buffer; planar
/// formats keep one contiguous buffer per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Interleaved signed 16-bit PCM
    S16,
    /// Planar signed 16-bit PCM
    S16Planar,
    /// Interleaved 32-bit float
    F32,
    /// Planar 32-bit float
    F32Planar,
}

impl SampleFormat {
    /// Width of one sample of one channel, in bytes.
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::S16 | SampleFormat::S16Planar => 2,
            SampleFormat::F32 | SampleFormat::F32Planar => 4,
        }
    }

    /// Whether each channel lives in its own buffer.
    pub fn is_planar(self) -> bool {
        matches!(self, SampleFormat::S16Planar | SampleFormat::F32Planar)
    }

    /// The scalar type, ignoring layout.
    pub fn scalar(self) -> SampleScalar {
        match self {
            SampleFormat::S16 | SampleFormat::S16Planar => SampleScalar::S16,
            SampleFormat::F32 | SampleFormat::F32Planar => SampleScalar::F32,
        }
    }

    /// The same scalar type with the requested layout.
    pub fn with_planar(self, planar: bool) -> SampleFormat {
        match (self.scalar(), planar) {
            (SampleScalar::S16, false) => SampleFormat::S16,
            (SampleScalar::S16, true) => SampleFormat::S16Planar,
            (SampleScalar::F32, false) => SampleFormat::F32,
            (SampleScalar::F32, true) => SampleFormat::F32Planar,
        }
    }
}

impl std::fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SampleFormat::S16 => "s16",
            SampleFormat::S16Planar => "s16p",
            SampleFormat::F32 => "f32",
            SampleFormat::F32Planar => "f32p",
        };
        f.write_str(name)
    }
}

/// One side of a format conversion: everything needed to interpret a set
/// of channel planes, without owning them.
///
/// The channel planes themselves are passed to
/// [`FormatConverter::convert`](crate::convert::FormatConverter::convert)
/// at call time; a config only describes their shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Sample format (scalar type + layout)
    pub format: SampleFormat,
    /// Number of audio channels (1..=8)
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Samples per channel in one frame
    pub frame_samples: usize,
}

impl StreamConfig {
    /// Number of buffers this configuration spans: one per channel for
    /// planar layouts, one shared buffer for interleaved layouts.
    pub fn plane_count(&self) -> usize {
        if self.format.is_planar() {
            self.channels as usize
        } else {
            1
        }
    }

    /// Size in bytes of one plane holding `frame_samples` samples.
    pub fn plane_bytes(&self) -> usize {
        self.frame_samples * self.sample_stride()
    }

    /// Bytes occupied by one sample (per channel) within a single plane.
    pub fn sample_stride(&self) -> usize {
        let width = self.format.bytes_per_sample();
        if self.format.is_planar() {
            width
        } else {
            width * self.channels as usize
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            format: SampleFormat::F32Planar,
            channels: 2,
            sample_rate: 44100,
            frame_samples: 0,
        }
    }
}

/// AAC audio object profile, as encoded in the ADTS header's 2-bit field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AacProfile {
    Main = 0,
    LowComplexity = 1,
    ScalableSampleRate = 2,
    LongTermPrediction = 3,
}

impl Default for AacProfile {
    fn default() -> Self {
        AacProfile::LowComplexity
    }
}

/// One compressed payload drained from the codec.
///
/// Borrows the driver's output buffer, so it is only valid for the
/// duration of the delivery callback; copy the bytes to retain them.
#[derive(Debug)]
pub struct EncodedPacket<'a> {
    /// Compressed payload bytes
    pub data: &'a [u8],
    /// Duration of the packet in samples per channel
    pub duration: u32,
}
