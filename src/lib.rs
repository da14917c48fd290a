//! Capture-to-AAC packaging pipeline.
//!
//! Turns arbitrarily-sized capture chunks into fixed-size codec frames,
//! normalizes their channel layout and sample format, drives a block
//! codec through its submit/drain protocol (with startup-delay
//! suppression), and wraps each compressed payload in a 7-byte ADTS
//! header before handing it to an MP4 sample table.
//!
//! The codec itself is an external collaborator behind the [`BlockCodec`]
//! trait; this crate owns everything between the capture callback and the
//! container handoff.

pub mod assembler;
pub mod codec;
pub mod config;
pub mod container;
pub mod convert;
pub mod error;
pub mod packet;
pub mod pipeline;
pub mod types;

#[cfg(test)]
pub(crate) mod tests;

pub use assembler::FrameAssembler;
pub use codec::driver::CodecDriver;
pub use codec::{BlockCodec, CodecInfo, EncoderConfig, PacketMeta};
pub use config::PipelineConfig;
pub use container::{SampleDescription, SampleTable};
pub use convert::FormatConverter;
pub use error::{CodecError, PipelineError, Result};
pub use packet::adts::AdtsHeader;
pub use packet::Packetizer;
pub use pipeline::{AudioPipeline, CaptureSource};
pub use types::{AacProfile, EncodedPacket, SampleFormat, StreamConfig};
