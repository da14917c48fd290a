//! Exact passthrough: byte-for-byte copy when both sides already agree.

use super::ConvertMethod;
use crate::types::StreamConfig;

/// Selected when channel count, sample format, and sample rate are
/// identical on both sides. Copies `samples × channels × width` bytes —
/// one copy per plane for planar layouts, a single copy for interleaved.
pub struct PassthroughCopy;

impl ConvertMethod for PassthroughCopy {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn can_handle(&self, input: &StreamConfig, output: &StreamConfig) -> bool {
        input.format == output.format
            && input.channels == output.channels
            && input.sample_rate == output.sample_rate
    }

    fn convert(
        &self,
        input: &StreamConfig,
        output: &StreamConfig,
        src: &[&[u8]],
        dst: &mut [&mut [u8]],
        samples: usize,
    ) -> usize {
        // Clamp to the output frame capacity; a short count signals
        // backpressure to the caller.
        let samples = if output.frame_samples > 0 {
            samples.min(output.frame_samples)
        } else {
            samples
        };
        let width = input.format.bytes_per_sample();
        let bytes = if input.format.is_planar() {
            samples * width
        } else {
            samples * width * input.channels as usize
        };

        for (d, s) in dst.iter_mut().zip(src) {
            d[..bytes].copy_from_slice(&s[..bytes]);
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SampleFormat;

    fn config(format: SampleFormat, channels: u16) -> StreamConfig {
        StreamConfig {
            format,
            channels,
            sample_rate: 44100,
            frame_samples: 64,
        }
    }

    #[test]
    fn test_passthrough_fidelity_interleaved() {
        let c = config(SampleFormat::S16, 2);
        let src_data: Vec<u8> = (0..=255).collect();
        let src: [&[u8]; 1] = [&src_data];
        let mut out = vec![0u8; 256];
        let mut dst: [&mut [u8]; 1] = [&mut out];

        // 64 samples × 2 ch × 2 bytes = 256 bytes
        let produced = PassthroughCopy.convert(&c, &c, &src, &mut dst, 64);
        assert_eq!(produced, 64);
        assert_eq!(out, src_data);
    }

    #[test]
    fn test_passthrough_fidelity_planar_partial_frame() {
        let c = config(SampleFormat::F32Planar, 2);
        let left: Vec<u8> = (0..256u32).map(|i| i as u8).collect();
        let right: Vec<u8> = (0..256u32).map(|i| 255 - i as u8).collect();
        let src: [&[u8]; 2] = [&left, &right];
        let mut out_l = vec![0u8; 256];
        let mut out_r = vec![0u8; 256];
        let mut dst: [&mut [u8]; 2] = [&mut out_l, &mut out_r];

        // 10 samples < the 64-sample frame: only 40 bytes per plane move.
        let produced = PassthroughCopy.convert(&c, &c, &src, &mut dst, 10);
        assert_eq!(produced, 10);
        assert_eq!(&out_l[..40], &left[..40]);
        assert_eq!(&out_r[..40], &right[..40]);
        assert!(out_l[40..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_can_handle_rejects_layout_difference() {
        assert!(!PassthroughCopy.can_handle(
            &config(SampleFormat::F32, 2),
            &config(SampleFormat::F32Planar, 2)
        ));
    }
}
