//! Frame assembler
//!
//! Accumulates variable-length multi-channel byte chunks into fixed-size
//! per-channel buffers, firing a callback every time the buffers fill.
//! This is what turns arbitrarily-sized capture chunks into the exact
//! frame lengths a block codec demands.

/// Accumulates byte chunks into one or more fixed-capacity channel
/// buffers.
///
/// For planar data there is one buffer per channel; for interleaved data
/// a single buffer sized `channels × width × samples`. All planes share
/// one write offset — each `feed` call supplies the same byte length for
/// every plane.
pub struct FrameAssembler {
    buffers: Vec<Vec<u8>>,
    capacity: usize,
    offset: usize,
}

impl FrameAssembler {
    /// Create an assembler with `plane_count` buffers of `capacity` bytes
    /// each, zero-initialized.
    pub fn new(plane_count: usize, capacity: usize) -> Self {
        assert!(plane_count > 0, "assembler needs at least one plane");
        assert!(capacity > 0, "assembler capacity must be non-zero");
        FrameAssembler {
            buffers: vec![vec![0u8; capacity]; plane_count],
            capacity,
            offset: 0,
        }
    }

    /// Feed `len` bytes from each input plane, invoking `on_full` with the
    /// channel buffers every time they reach capacity.
    ///
    /// A zero-length feed is an explicit flush trigger: if a partial frame
    /// is pending it is zero-padded, delivered through `on_full`, and the
    /// offset reset.
    ///
    /// Mismatched plane counts are a programmer error, not a runtime
    /// condition.
    pub fn feed<F>(&mut self, planes: &[&[u8]], len: usize, mut on_full: F)
    where
        F: FnMut(&mut [Vec<u8>]),
    {
        assert_eq!(
            planes.len(),
            self.buffers.len(),
            "input plane count does not match assembler channel count"
        );

        if len == 0 {
            if self.offset > 0 {
                self.zero_fill_tail();
                on_full(&mut self.buffers);
                self.offset = 0;
            }
            return;
        }

        let mut remaining = len;
        let mut read = 0;

        // Complete a pending partial frame first.
        if self.offset > 0 {
            let count = (self.capacity - self.offset).min(len);
            for (buf, plane) in self.buffers.iter_mut().zip(planes) {
                buf[self.offset..self.offset + count].copy_from_slice(&plane[..count]);
            }
            if self.offset + count < self.capacity {
                self.offset += count;
                return;
            }
            on_full(&mut self.buffers);
            self.offset = 0;
            remaining -= count;
            read = count;
        }

        // Copy whole frames straight through.
        while remaining >= self.capacity {
            for (buf, plane) in self.buffers.iter_mut().zip(planes) {
                buf.copy_from_slice(&plane[read..read + self.capacity]);
            }
            on_full(&mut self.buffers);
            remaining -= self.capacity;
            read += self.capacity;
        }

        // Stash any leftover as the next partial frame.
        if remaining > 0 {
            for (buf, plane) in self.buffers.iter_mut().zip(planes) {
                buf[..remaining].copy_from_slice(&plane[read..read + remaining]);
            }
            self.offset = remaining;
        }
    }

    /// Zero-fill every buffer from the current write offset to capacity,
    /// without resetting the offset. The caller can then encode the
    /// zero-padded frame directly.
    pub fn flush(&mut self) {
        self.zero_fill_tail();
    }

    /// Whether a partial frame is pending.
    pub fn has_pending_data(&self) -> bool {
        self.offset > 0
    }

    /// Bytes of the pending partial frame (the current write offset).
    pub fn pending_bytes(&self) -> usize {
        self.offset
    }

    /// Capacity of each channel buffer in bytes.
    pub fn capacity_bytes(&self) -> usize {
        self.capacity
    }

    /// Number of channel buffers.
    pub fn plane_count(&self) -> usize {
        self.buffers.len()
    }

    /// The channel buffers.
    pub fn channel_buffers(&self) -> &[Vec<u8>] {
        &self.buffers
    }

    /// Mutable access to the channel buffers, for collaborators that
    /// write frames in place (the format converter writes converted
    /// samples directly into the codec driver's assembler).
    pub fn channel_buffers_mut(&mut self) -> &mut [Vec<u8>] {
        &mut self.buffers
    }

    fn zero_fill_tail(&mut self) {
        for buf in &mut self.buffers {
            buf[self.offset..].fill(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames_from_feed(assembler: &mut FrameAssembler, chunks: &[&[u8]]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        for chunk in chunks {
            assembler.feed(&[chunk], chunk.len(), |bufs| {
                frames.push(bufs[0].clone());
            });
        }
        frames
    }

    #[test]
    fn test_concrete_chunk_scenario() {
        // 100 + 50 + 150 bytes through a 128-byte frame: full frames at
        // cumulative bytes 128 and 256, 300 − 256 = 44 bytes left pending.
        let mut asm = FrameAssembler::new(1, 128);
        let data: Vec<u8> = (0..300u32).map(|i| (i % 251) as u8).collect();

        let mut full = 0;
        for chunk in [&data[..100], &data[100..150], &data[150..300]] {
            asm.feed(&[chunk], chunk.len(), |_| full += 1);
        }

        assert_eq!(full, 2);
        assert!(asm.has_pending_data());
        assert_eq!(asm.pending_bytes(), 44);
    }

    #[test]
    fn test_chunking_independence() {
        // Any partition of the stream must produce the same callback
        // sequence and contents as feeding it whole.
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 256) as u8).collect();

        let mut whole = FrameAssembler::new(1, 96);
        let expected = frames_from_feed(&mut whole, &[&data]);

        for split in [[137usize, 863], [96, 904], [1, 999]] {
            let mut asm = FrameAssembler::new(1, 96);
            let got = frames_from_feed(&mut asm, &[&data[..split[0]], &data[split[0]..]]);
            assert_eq!(got, expected, "split {:?} diverged", split);
            assert_eq!(asm.pending_bytes(), whole.pending_bytes());
        }
    }

    #[test]
    fn test_planar_channels_copied_independently() {
        let left: Vec<u8> = vec![0x11; 64];
        let right: Vec<u8> = vec![0x22; 64];
        let mut asm = FrameAssembler::new(2, 32);

        let mut frames = Vec::new();
        asm.feed(&[&left, &right], 64, |bufs| {
            frames.push((bufs[0].clone(), bufs[1].clone()));
        });

        assert_eq!(frames.len(), 2);
        for (l, r) in &frames {
            assert!(l.iter().all(|&b| b == 0x11));
            assert!(r.iter().all(|&b| b == 0x22));
        }
    }

    #[test]
    fn test_flush_zero_pads_tail() {
        let mut asm = FrameAssembler::new(1, 16);
        let chunk = [0xAAu8; 10];
        asm.feed(&[&chunk], 10, |_| panic!("no full frame expected"));

        asm.flush();

        let buf = &asm.channel_buffers()[0];
        assert_eq!(&buf[..10], &chunk);
        assert!(buf[10..].iter().all(|&b| b == 0));
        // flush does not reset the offset
        assert_eq!(asm.pending_bytes(), 10);
    }

    #[test]
    fn test_flush_leaves_no_residual_data() {
        let mut asm = FrameAssembler::new(1, 8);
        // Fill one whole frame with 0xFF, then 3 bytes of a second frame.
        let chunk = [0xFFu8; 11];
        let mut full = 0;
        asm.feed(&[&chunk], 11, |_| full += 1);
        assert_eq!(full, 1);

        asm.flush();
        let buf = &asm.channel_buffers()[0];
        assert_eq!(&buf[..3], &[0xFF, 0xFF, 0xFF]);
        assert!(buf[3..].iter().all(|&b| b == 0), "prior frame leaked into tail");
    }

    #[test]
    fn test_zero_length_feed_flushes_pending_frame() {
        let mut asm = FrameAssembler::new(1, 16);
        let chunk = [0x55u8; 6];
        asm.feed(&[&chunk], 6, |_| {});

        let mut delivered = Vec::new();
        asm.feed(&[&[]], 0, |bufs| delivered.push(bufs[0].clone()));

        assert_eq!(delivered.len(), 1);
        assert_eq!(&delivered[0][..6], &chunk);
        assert!(delivered[0][6..].iter().all(|&b| b == 0));
        assert!(!asm.has_pending_data());
    }

    #[test]
    fn test_zero_length_feed_without_pending_is_a_noop() {
        let mut asm = FrameAssembler::new(1, 16);
        asm.feed(&[&[]], 0, |_| panic!("nothing pending, no callback expected"));
        assert!(!asm.has_pending_data());
    }

    #[test]
    #[should_panic(expected = "plane count")]
    fn test_plane_count_mismatch_panics() {
        let mut asm = FrameAssembler::new(2, 16);
        let chunk = [0u8; 4];
        asm.feed(&[&chunk], 4, |_| {});
    }
}
