//! Block codec driver
//!
//! Owns the fixed-size input/output buffers around a [`BlockCodec`] and
//! drives its submit/drain protocol: negotiate format and rate, submit a
//! batch, drain every packet the codec will give up, compact unconsumed
//! input, and suppress warm-up output that falls inside the codec's
//! priming window.

use tracing::{debug, warn};

use crate::assembler::FrameAssembler;
use crate::codec::{BlockCodec, CodecInfo, CodecRequest, EncoderConfig};
use crate::error::{CodecError, PipelineError, Result};
use crate::types::{EncodedPacket, SampleFormat};

/// Recommended output allowance per channel, in bytes. Generous enough
/// for one packet at any supported bitrate.
pub const OUT_BYTES_PER_CHANNEL: usize = 6144;

struct DriverState {
    info: CodecInfo,
    format: SampleFormat,
    sample_rate: u32,
    /// Input frame planes; the assembler's buffers are the codec's
    /// submission source, so external feeds and direct converter writes
    /// share the same memory.
    assembler: FrameAssembler,
    output: Vec<u8>,
    /// Samples (per channel) written into the input buffer but not yet
    /// submitted.
    pending_samples: usize,
    /// Running total of samples (per channel) the codec has consumed.
    /// Used to skip over the encoder's startup delay.
    total_samples: u64,
}

/// Drives one codec instance through initialize → encode* → flush.
///
/// No state permits re-initialization; configure a new driver instead.
pub struct CodecDriver {
    codec: Box<dyn BlockCodec>,
    config: EncoderConfig,
    state: Option<DriverState>,
    flushed: bool,
}

impl CodecDriver {
    pub fn new(codec: Box<dyn BlockCodec>, config: EncoderConfig) -> Self {
        CodecDriver {
            codec,
            config,
            state: None,
            flushed: false,
        }
    }

    /// Negotiate format and rate, open the codec, and allocate the input
    /// and output buffers. Failure here is fatal for the instance.
    pub fn initialize(&mut self) -> Result<()> {
        if self.state.is_some() || self.flushed {
            return Err(PipelineError::Config(
                "codec driver has already been initialized".into(),
            ));
        }

        let format = negotiate_format(self.codec.as_ref(), self.config.format);
        let sample_rate =
            select_nearest_rate(self.codec.supported_sample_rates(), self.config.sample_rate);
        if sample_rate != self.config.sample_rate {
            debug!(
                requested = self.config.sample_rate,
                negotiated = sample_rate,
                codec = self.codec.name(),
                "sample rate adjusted to nearest supported"
            );
        }

        let request = CodecRequest {
            sample_rate,
            channels: self.config.channels,
            bit_rate: self.config.bit_rate,
            format,
        };
        let info = self.codec.open(&request)?;

        let channels = self.config.channels as usize;
        let width = format.bytes_per_sample();
        let (plane_count, plane_bytes) = if format.is_planar() {
            (channels, info.frame_length * width)
        } else {
            (1, info.frame_length * width * channels)
        };
        let output_bytes = (channels * OUT_BYTES_PER_CHANNEL).max(info.max_packet_bytes);

        debug!(
            codec = self.codec.name(),
            frame_length = info.frame_length,
            priming_delay = info.priming_delay,
            format = %format,
            sample_rate,
            "codec driver initialized"
        );

        self.state = Some(DriverState {
            info,
            format,
            sample_rate,
            assembler: FrameAssembler::new(plane_count, plane_bytes),
            output: vec![0u8; output_bytes],
            pending_samples: 0,
            total_samples: 0,
        });
        Ok(())
    }

    fn state(&self) -> Result<&DriverState> {
        self.state
            .as_ref()
            .ok_or_else(|| PipelineError::Codec(CodecError::NotInitialized))
    }

    /// Samples per channel in one codec frame. Upstream components size
    /// their buffers from this.
    pub fn frame_length(&self) -> Result<usize> {
        Ok(self.state()?.info.frame_length)
    }

    /// The sample format actually accepted by the codec.
    pub fn negotiated_format(&self) -> Result<SampleFormat> {
        Ok(self.state()?.format)
    }

    /// The sample rate actually accepted by the codec.
    pub fn negotiated_sample_rate(&self) -> Result<u32> {
        Ok(self.state()?.sample_rate)
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    pub fn bit_rate(&self) -> u32 {
        self.config.bit_rate
    }

    /// Total samples (per channel) the codec has consumed so far.
    pub fn total_samples_encoded(&self) -> u64 {
        self.state.as_ref().map(|s| s.total_samples).unwrap_or(0)
    }

    /// Samples written into the input buffer but not yet submitted.
    pub fn pending_samples(&self) -> usize {
        self.state.as_ref().map(|s| s.pending_samples).unwrap_or(0)
    }

    /// Writable views into the pre-allocated input frame planes, so a
    /// converter can write one frame directly without an extra copy.
    pub fn input_planes_mut(&mut self) -> Result<&mut [Vec<u8>]> {
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| PipelineError::Codec(CodecError::NotInitialized))?;
        Ok(state.assembler.channel_buffers_mut())
    }

    /// Record that `samples` samples per channel were written into the
    /// input planes by an external writer. Returns the new pending total.
    ///
    /// The planes hold exactly one codec frame; a total beyond that would
    /// overrun them, so it is rejected. Writers must leave room for any
    /// samples a previous submit left unconsumed (see
    /// [`pending_samples`](Self::pending_samples)).
    pub fn notify_samples_written(&mut self, samples: usize) -> Result<usize> {
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| PipelineError::Codec(CodecError::NotInitialized))?;
        let total = state.pending_samples + samples;
        if total > state.info.frame_length {
            return Err(PipelineError::Config(format!(
                "input buffer overflow: {} pending + {} written exceeds the {}-sample frame",
                state.pending_samples, samples, state.info.frame_length
            )));
        }
        state.pending_samples = total;
        Ok(state.pending_samples)
    }

    fn ensure_encodable(&self) -> Result<()> {
        if self.flushed {
            return Err(PipelineError::Config(
                "codec driver has been flushed; no further encoding is possible".into(),
            ));
        }
        if self.state.is_none() {
            return Err(PipelineError::Codec(CodecError::NotInitialized));
        }
        Ok(())
    }

    /// Copy externally supplied data through the internal assembler into
    /// the input buffer, encoding every completed frame. `on_packet`
    /// receives one result per drained packet; the payload borrows the
    /// driver's output buffer and must be consumed before the callback
    /// returns.
    pub fn feed(
        &mut self,
        planes: &[&[u8]],
        len: usize,
        on_packet: &mut dyn FnMut(EncodedPacket),
    ) -> Result<()> {
        self.ensure_encodable()?;
        let codec = self.codec.as_mut();
        let DriverState {
            info,
            format,
            assembler,
            output,
            pending_samples,
            total_samples,
            ..
        } = self.state.as_mut().expect("checked above");

        let info = *info;
        let stride = plane_stride(*format, self.config.channels);

        assembler.feed(planes, len, |bufs| {
            run_encode_loop(
                codec,
                bufs,
                output,
                &info,
                stride,
                total_samples,
                info.frame_length,
                on_packet,
            );
        });

        *pending_samples = assembler.pending_bytes() / stride;
        Ok(())
    }

    /// Submit the samples already written into the input planes (via
    /// [`input_planes_mut`](Self::input_planes_mut) +
    /// [`notify_samples_written`](Self::notify_samples_written)) and
    /// drain everything the codec produces for them.
    pub fn encode_buffered(&mut self, on_packet: &mut dyn FnMut(EncodedPacket)) -> Result<()> {
        self.ensure_encodable()?;
        let state = self.state.as_mut().expect("checked above");
        if state.pending_samples == 0 {
            return Ok(());
        }
        let codec = self.codec.as_mut();

        let info = state.info;
        let stride = plane_stride(state.format, self.config.channels);
        let leftover = run_encode_loop(
            codec,
            state.assembler.channel_buffers_mut(),
            &mut state.output,
            &info,
            stride,
            &mut state.total_samples,
            state.pending_samples,
            on_packet,
        );
        state.pending_samples = leftover;
        Ok(())
    }

    /// Zero-pad and encode any pending partial frame, then signal
    /// end-of-stream and drain all remaining buffered packets. Call
    /// exactly once; the driver accepts no further input afterwards.
    pub fn flush(&mut self, on_packet: &mut dyn FnMut(EncodedPacket)) -> Result<()> {
        self.ensure_encodable()?;
        let state = self.state.as_mut().expect("checked above");
        let codec = self.codec.as_mut();

        let info = state.info;
        let stride = plane_stride(state.format, self.config.channels);

        // Complete whatever is left in the input buffer as one final
        // zero-padded frame.
        if state.assembler.has_pending_data() {
            state.assembler.flush();
            state.pending_samples = info.frame_length;
        }
        if state.pending_samples > 0 {
            let leftover = run_encode_loop(
                codec,
                state.assembler.channel_buffers_mut(),
                &mut state.output,
                &info,
                stride,
                &mut state.total_samples,
                state.pending_samples,
                on_packet,
            );
            state.pending_samples = leftover;
        }

        if let Err(e) = codec.send_eof() {
            warn!(error = %e, "end-of-stream submit failed; draining anyway");
        }
        loop {
            match codec.receive_packet(&mut state.output) {
                Ok(Some(meta)) => {
                    deliver(
                        &state.output,
                        meta.size,
                        meta.duration,
                        state.total_samples,
                        info.priming_delay,
                        on_packet,
                    );
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "drain failed during flush; dropping packet");
                    break;
                }
            }
        }

        self.flushed = true;
        Ok(())
    }
}

/// Bytes occupied by one sample (per channel) inside a single plane.
fn plane_stride(format: SampleFormat, channels: u16) -> usize {
    let width = format.bytes_per_sample();
    if format.is_planar() {
        width
    } else {
        width * channels as usize
    }
}

/// Pick the sample format the codec will actually accept: the requested
/// one if the codec's full supported list contains it, otherwise the
/// codec's first (default) format, with a warning.
fn negotiate_format(codec: &dyn BlockCodec, requested: SampleFormat) -> SampleFormat {
    let supported = codec.supported_formats();
    if supported.is_empty() || supported.contains(&requested) {
        return requested;
    }
    let fallback = supported[0];
    warn!(
        requested = %requested,
        fallback = %fallback,
        codec = codec.name(),
        "requested sample format unsupported by codec; falling back"
    );
    fallback
}

/// The supported rate with minimum absolute distance to `target`; ties
/// resolved by first occurrence in the codec's list. An empty list means
/// the codec takes any rate.
fn select_nearest_rate(supported: &[u32], target: u32) -> u32 {
    let mut best: Option<u32> = None;
    for &rate in supported {
        let better = match best {
            None => true,
            Some(b) => {
                (i64::from(rate) - i64::from(target)).abs()
                    < (i64::from(b) - i64::from(target)).abs()
            }
        };
        if better {
            best = Some(rate);
        }
    }
    best.unwrap_or(target)
}

fn deliver(
    output: &[u8],
    size: usize,
    duration: u32,
    total_samples: u64,
    priming_delay: u64,
    on_packet: &mut dyn FnMut(EncodedPacket),
) {
    // Packets inside the priming window are warm-up, not audio.
    if total_samples > priming_delay && size > 0 {
        on_packet(EncodedPacket {
            data: &output[..size],
            duration,
        });
    } else {
        debug!(
            total_samples,
            priming_delay, size, "suppressing startup-delay packet"
        );
    }
}

/// Submit/drain loop over one input batch. Submits the batch, drains
/// every packet the codec will emit for it, compacts unconsumed samples
/// to the front of the planes, and repeats until the codec stops
/// producing output. Codec hiccups are logged and the stream continues:
/// a failed drain drops the in-flight packet, a failed submit drops the
/// whole batch. Returns the number of samples left unconsumed.
#[allow(clippy::too_many_arguments)]
fn run_encode_loop(
    codec: &mut dyn BlockCodec,
    planes: &mut [Vec<u8>],
    output: &mut [u8],
    info: &CodecInfo,
    stride: usize,
    total_samples: &mut u64,
    mut samples: usize,
    on_packet: &mut dyn FnMut(EncodedPacket),
) -> usize {
    loop {
        let consumed = {
            let views: Vec<&[u8]> = planes.iter().map(|p| p.as_slice()).collect();
            match codec.send_frame(&views, samples) {
                Ok(consumed) => consumed,
                Err(e) => {
                    warn!(error = %e, "submit failed; abandoning batch");
                    return 0;
                }
            }
        };

        // Shift unconsumed samples to the front of each plane.
        if consumed > 0 && consumed < samples {
            let head = consumed * stride;
            let tail = (samples - consumed) * stride;
            for plane in planes.iter_mut() {
                plane.copy_within(head..head + tail, 0);
            }
        }
        samples -= consumed;
        *total_samples += consumed as u64;

        let mut drained = 0usize;
        loop {
            match codec.receive_packet(output) {
                Ok(Some(meta)) => {
                    drained += 1;
                    deliver(
                        output,
                        meta.size,
                        meta.duration,
                        *total_samples,
                        info.priming_delay,
                        on_packet,
                    );
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "drain failed; dropping in-flight packet");
                    break;
                }
            }
        }

        if drained == 0 || samples == 0 {
            return samples;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::StubCodec;

    #[test]
    fn test_select_nearest_rate_minimum_distance() {
        let rates = [96000, 88200, 64000, 48000, 44100, 32000];
        assert_eq!(select_nearest_rate(&rates, 44100), 44100);
        assert_eq!(select_nearest_rate(&rates, 46000), 44100);
        assert_eq!(select_nearest_rate(&rates, 47000), 48000);
        assert_eq!(select_nearest_rate(&rates, 500), 32000);
        assert_eq!(select_nearest_rate(&rates, 1_000_000), 96000);
    }

    #[test]
    fn test_select_nearest_rate_tie_takes_first_occurrence() {
        // 46050 is equidistant from 48000 and 44100
        assert_eq!(select_nearest_rate(&[48000, 44100], 46050), 48000);
        assert_eq!(select_nearest_rate(&[44100, 48000], 46050), 44100);
    }

    #[test]
    fn test_select_nearest_rate_empty_list_keeps_target() {
        assert_eq!(select_nearest_rate(&[], 22050), 22050);
    }

    #[test]
    fn test_negotiate_format_scans_entire_list() {
        // The requested format sits at the END of the supported list; a
        // scan that bails after the first entry would wrongly fall back.
        let codec = StubCodec::new(4, 0)
            .with_formats(vec![SampleFormat::F32Planar, SampleFormat::S16]);
        assert_eq!(
            negotiate_format(&codec, SampleFormat::S16),
            SampleFormat::S16
        );
    }

    #[test]
    fn test_negotiate_format_falls_back_to_first_supported() {
        let codec = StubCodec::new(4, 0)
            .with_formats(vec![SampleFormat::F32Planar, SampleFormat::S16Planar]);
        assert_eq!(
            negotiate_format(&codec, SampleFormat::F32),
            SampleFormat::F32Planar
        );
    }

    #[test]
    fn test_initialize_twice_fails() {
        let mut driver = CodecDriver::new(
            Box::new(StubCodec::new(8, 0)),
            EncoderConfig::default(),
        );
        driver.initialize().unwrap();
        assert!(matches!(
            driver.initialize().unwrap_err(),
            PipelineError::Config(_)
        ));
    }

    #[test]
    fn test_frame_length_exposed_after_initialize() {
        let mut driver = CodecDriver::new(
            Box::new(StubCodec::new(16, 0)),
            EncoderConfig::default(),
        );
        assert!(driver.frame_length().is_err());
        driver.initialize().unwrap();
        assert_eq!(driver.frame_length().unwrap(), 16);
    }

    #[test]
    fn test_encode_after_flush_fails() {
        let mut driver = CodecDriver::new(
            Box::new(StubCodec::new(8, 0)),
            EncoderConfig::default(),
        );
        driver.initialize().unwrap();
        driver.flush(&mut |_| {}).unwrap();
        let chunk = [0u8; 4];
        assert!(driver.feed(&[&chunk], 4, &mut |_| {}).is_err());
        assert!(driver.flush(&mut |_| {}).is_err());
    }
}
