//! Layout repack: per-sample gather between planar and interleaved.

use super::ConvertMethod;
use crate::types::StreamConfig;

/// Selected when scalar type, channel count, and sample rate match but
/// the channel layout differs. Performs an explicit per-sample,
/// per-channel gather loop in either direction.
pub struct LayoutRepack;

impl ConvertMethod for LayoutRepack {
    fn name(&self) -> &'static str {
        "layout-repack"
    }

    fn can_handle(&self, input: &StreamConfig, output: &StreamConfig) -> bool {
        input.format.scalar() == output.format.scalar()
            && input.format.is_planar() != output.format.is_planar()
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
        let samples = if output.frame_samples > 0 {
            samples.min(output.frame_samples)
        } else {
            samples
        };
        let width = input.format.bytes_per_sample();
        let channels = input.channels as usize;

        if input.format.is_planar() {
            // planar -> interleaved: cycle the channels into dst[0]
            let packed = &mut dst[0];
            for s in 0..samples {
                for (ch, plane) in src.iter().enumerate().take(channels) {
                    let from = s * width;
                    let to = (s * channels + ch) * width;
                    packed[to..to + width].copy_from_slice(&plane[from..from + width]);
                }
            }
        } else {
            // interleaved -> planar: scatter src[0] into one plane each
            let packed = src[0];
            for s in 0..samples {
                for (ch, plane) in dst.iter_mut().enumerate().take(channels) {
                    let from = (s * channels + ch) * width;
                    let to = s * width;
                    plane[to..to + width].copy_from_slice(&packed[from..from + width]);
                }
            }
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SampleFormat;

    fn config(format: SampleFormat, frame: usize) -> StreamConfig {
        StreamConfig {
            format,
            channels: 2,
            sample_rate: 44100,
            frame_samples: frame,
        }
    }

    #[test]
    fn test_planar_to_interleaved_s16() {
        let input = config(SampleFormat::S16Planar, 4);
        let output = config(SampleFormat::S16, 4);

        // L = 0x0100, 0x0302, ... ; R = 0x1110, 0x1312, ...
        let left: Vec<u8> = vec![0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let right: Vec<u8> = vec![0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17];
        let src: [&[u8]; 2] = [&left, &right];
        let mut out = vec![0u8; 16];
        let mut dst: [&mut [u8]; 1] = [&mut out];

        let produced = LayoutRepack.convert(&input, &output, &src, &mut dst, 4);
        assert_eq!(produced, 4);
        assert_eq!(
            out,
            vec![
                0x00, 0x01, 0x10, 0x11, // sample 0: L R
                0x02, 0x03, 0x12, 0x13, // sample 1
                0x04, 0x05, 0x14, 0x15, // sample 2
                0x06, 0x07, 0x16, 0x17, // sample 3
            ]
        );
    }

    #[test]
    fn test_interleaved_to_planar_roundtrips() {
        let interleaved = config(SampleFormat::F32, 8);
        let planar = config(SampleFormat::F32Planar, 8);

        let packed: Vec<u8> = (0..64u32).map(|i| i as u8).collect();
        let src: [&[u8]; 1] = [&packed];
        let mut left = vec![0u8; 32];
        let mut right = vec![0u8; 32];
        {
            let mut dst: [&mut [u8]; 2] = [&mut left, &mut right];
            assert_eq!(
                LayoutRepack.convert(&interleaved, &planar, &src, &mut dst, 8),
                8
            );
        }

        // Gather back and compare with the original interleaved bytes.
        let planes: [&[u8]; 2] = [&left, &right];
        let mut repacked = vec![0u8; 64];
        {
            let mut dst: [&mut [u8]; 1] = [&mut repacked];
            assert_eq!(
                LayoutRepack.convert(&planar, &interleaved, &planes, &mut dst, 8),
                8
            );
        }
        assert_eq!(repacked, packed);
    }

    #[test]
    fn test_can_handle_requires_layout_difference() {
        let planar = config(SampleFormat::S16Planar, 4);
        let packed = config(SampleFormat::S16, 4);
        assert!(LayoutRepack.can_handle(&planar, &packed));
        assert!(LayoutRepack.can_handle(&packed, &planar));
        assert!(!LayoutRepack.can_handle(&packed, &packed));
        // scalar change is not covered
        let f32p = config(SampleFormat::F32Planar, 4);
        assert!(!LayoutRepack.can_handle(&f32p, &packed));
    }
}
