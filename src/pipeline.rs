//! Recording pipeline
//!
//! Wires the stages together for a single audio track: capture chunks go
//! through a frame assembler, the format converter writes normalized
//! frames straight into the codec driver's input planes, and every
//! encoded packet is ADTS-framed and appended to the sample table.

use tracing::{debug, warn};

use crate::assembler::FrameAssembler;
use crate::codec::driver::CodecDriver;
use crate::codec::{BlockCodec, EncoderConfig};
use crate::config::PipelineConfig;
use crate::container::{SampleDescription, SampleTable};
use crate::convert::FormatConverter;
use crate::error::Result;
use crate::packet::Packetizer;
use crate::types::{AacProfile, StreamConfig};

/// A pull source of capture audio.
///
/// `poll` hands the next chunk to `sink` as borrowed channel planes plus
/// a byte length per plane, and returns `false` once the source is
/// exhausted. Implementations decide their own chunk sizes; the pipeline
/// accepts any length.
pub trait CaptureSource {
    /// The stream configuration of the delivered chunks.
    fn config(&self) -> StreamConfig;

    /// Deliver the next chunk, if any.
    fn poll(&mut self, sink: &mut dyn FnMut(&[&[u8]], usize) -> Result<()>) -> Result<bool>;
}

/// Drives capture data through convert → encode → packetize into a
/// sample table.
pub struct AudioPipeline {
    /// Capture-side accumulator, sized so one full buffer converts into
    /// exactly one codec frame.
    assembler: FrameAssembler,
    converter: FormatConverter,
    driver: CodecDriver,
    packetizer: Packetizer,
    table: SampleTable,
}

impl AudioPipeline {
    /// Build and initialize a pipeline around `codec`.
    ///
    /// Initializes the codec driver first so the converter and the
    /// capture assembler can be sized from the negotiated frame length.
    pub fn new(
        codec: Box<dyn BlockCodec>,
        capture: StreamConfig,
        encoder: EncoderConfig,
    ) -> Result<Self> {
        let mut driver = CodecDriver::new(codec, encoder);
        driver.initialize()?;
        let frame_length = driver.frame_length()?;

        let mut converter = FormatConverter::new();
        converter.match_source(&capture)?;
        converter.match_destination(&driver)?;
        converter.initialize()?;

        let mut table = SampleTable::new();
        let description_index = table.add_description(SampleDescription {
            profile: AacProfile::default(),
            sample_rate: driver.negotiated_sample_rate()?,
            channels: driver.channels(),
            bit_rate: driver.bit_rate(),
        });
        let packetizer = Packetizer::new(
            AacProfile::default(),
            driver.negotiated_sample_rate()?,
            driver.channels(),
            description_index,
        )?;

        // One capture-side buffer per input plane, holding exactly one
        // codec frame's worth of capture-format bytes.
        let mut input = capture;
        input.frame_samples = frame_length;
        let assembler = FrameAssembler::new(input.plane_count(), input.plane_bytes());

        debug!(
            frame_length,
            capture_format = %input.format,
            codec_format = %driver.negotiated_format()?,
            sample_rate = driver.negotiated_sample_rate()?,
            "pipeline initialized"
        );

        Ok(AudioPipeline {
            assembler,
            converter,
            driver,
            packetizer,
            table,
        })
    }

    /// Build a pipeline from a parsed configuration file.
    pub fn from_config(codec: Box<dyn BlockCodec>, config: &PipelineConfig) -> Result<Self> {
        let capture = StreamConfig {
            format: config.capture_format()?,
            channels: config.capture.channels,
            sample_rate: config.capture.sample_rate,
            frame_samples: 0,
        };
        Self::new(codec, capture, config.encoder_config()?)
    }

    /// Accept one capture chunk of `len` bytes per plane. Every codec
    /// frame completed by this chunk is converted, encoded, and appended
    /// to the sample table.
    pub fn push_chunk(&mut self, planes: &[&[u8]], len: usize) -> Result<()> {
        let Self {
            assembler,
            converter,
            driver,
            packetizer,
            table,
        } = self;

        let mut result = Ok(());
        assembler.feed(planes, len, |bufs| {
            if result.is_ok() {
                result = encode_frame(converter, driver, packetizer, table, bufs);
            }
        });
        result
    }

    /// Drain `source` until it reports end of stream.
    pub fn run(&mut self, source: &mut dyn CaptureSource) -> Result<()> {
        while source.poll(&mut |planes, len| self.push_chunk(planes, len))? {}
        Ok(())
    }

    /// Flush everything still in flight and hand over the finished
    /// sample table. A trailing partial frame is zero-padded, and the
    /// codec's end-of-stream drain runs to completion.
    pub fn finish(mut self) -> Result<SampleTable> {
        let Self {
            assembler,
            converter,
            driver,
            packetizer,
            table,
        } = &mut self;

        // Zero-length feed pushes any pending partial frame through.
        if assembler.has_pending_data() {
            let empties = vec![&[] as &[u8]; assembler.plane_count()];
            let mut result = Ok(());
            assembler.feed(&empties, 0, |bufs| {
                if result.is_ok() {
                    result = encode_frame(converter, driver, packetizer, table, bufs);
                }
            });
            result?;
        }

        let mut push_err = None;
        driver.flush(&mut |packet| {
            if push_err.is_none() {
                if let Err(e) = packetizer.push(table, packet.data, packet.duration) {
                    push_err = Some(e);
                }
            }
        })?;
        if let Some(e) = push_err {
            return Err(e);
        }

        debug!(
            samples = self.table.samples().len(),
            duration = self.table.total_duration(),
            "pipeline finished"
        );
        Ok(self.table)
    }

    /// The sample table accumulated so far.
    pub fn sample_table(&self) -> &SampleTable {
        &self.table
    }

    /// Total samples (per channel) the codec has consumed.
    pub fn total_samples_encoded(&self) -> u64 {
        self.driver.total_samples_encoded()
    }
}

/// Convert one full capture frame into the codec's input planes, submit
/// it, and packetize every packet it yields.
///
/// A codec may leave part of a submitted batch unconsumed; those samples
/// stay compacted at the front of the input planes, so conversion writes
/// after them and the capture frame may take several convert/submit
/// rounds to go through.
fn encode_frame(
    converter: &FormatConverter,
    driver: &mut CodecDriver,
    packetizer: &Packetizer,
    table: &mut SampleTable,
    capture_planes: &mut [Vec<u8>],
) -> Result<()> {
    let frame_samples = converter.output_config().frame_samples;
    let in_stride = converter.input_config().sample_stride();
    let out_stride = converter.output_config().sample_stride();

    let mut converted = 0;
    let mut stalled = false;
    while converted < frame_samples {
        let pending = driver.pending_samples();
        let space = frame_samples - pending;
        if space == 0 {
            // The codec refused a full buffer. One more submit attempt;
            // if it still takes nothing, the rest of this chunk is
            // dropped and the stream continues.
            encode_pending(driver, packetizer, table)?;
            if driver.pending_samples() == frame_samples {
                if stalled {
                    warn!(
                        dropped = frame_samples - converted,
                        "codec is not accepting input; dropping remainder of chunk"
                    );
                    return Ok(());
                }
                stalled = true;
            }
            continue;
        }
        stalled = false;

        let take = (frame_samples - converted).min(space);
        let produced = {
            let src: Vec<&[u8]> = capture_planes
                .iter()
                .map(|p| &p[converted * in_stride..])
                .collect();
            let planes = driver.input_planes_mut()?;
            let mut dst: Vec<&mut [u8]> = planes
                .iter_mut()
                .map(|p| &mut p[pending * out_stride..])
                .collect();
            converter.convert(&src, &mut dst, take)?
        };
        if produced == 0 {
            warn!(remaining = frame_samples - converted, "converter produced no samples");
            return Ok(());
        }
        converted += produced;
        driver.notify_samples_written(produced)?;
        encode_pending(driver, packetizer, table)?;
    }
    Ok(())
}

/// Submit whatever is pending in the driver's input planes and route the
/// resulting packets into the sample table.
fn encode_pending(
    driver: &mut CodecDriver,
    packetizer: &Packetizer,
    table: &mut SampleTable,
) -> Result<()> {
    let mut push_err = None;
    driver.encode_buffered(&mut |packet| {
        if push_err.is_none() {
            if let Err(e) = packetizer.push(table, packet.data, packet.duration) {
                push_err = Some(e);
            }
        }
    })?;
    match push_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
