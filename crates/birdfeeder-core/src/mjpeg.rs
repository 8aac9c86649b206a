//! # MJPEG Module
//!
//! Splits a concatenated JPEG byte stream (ffmpeg `-f image2pipe -vcodec
//! mjpeg`) back into frames.
//!
//! Frames are delimited by SOI (`FF D8`) and EOI (`FF D9`). Entropy coded
//! data stuffs every `FF` as `FF 00`, so an EOI can only appear at the end of
//! a frame, provided frames carry no embedded thumbnails (encoder output
//! never does).

/// Default cap on a single buffered frame.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

/// Incremental JPEG stream splitter.
#[derive(Debug)]
pub struct MjpegSplitter {
    buffer: Vec<u8>,
    /// Offset up to which the buffer has been searched for EOI.
    scanned: usize,
    max_frame_bytes: usize,
    dropped: u64,
}

impl Default for MjpegSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES)
    }
}

impl MjpegSplitter {
    #[must_use]
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            max_frame_bytes: max_frame_bytes.max(4),
            dropped: 0,
        }
    }

    /// Feed bytes; returns every frame completed by them, in stream order.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(bytes);
        let mut frames = Vec::new();

        loop {
            if !self.align_to_soi() {
                break;
            }

            let from = self.scanned.max(2);
            match find_marker(&self.buffer[from..], 0xD9) {
                Some(offset) => {
                    let end = from + offset + 2;
                    frames.push(self.buffer.drain(..end).collect());
                    self.scanned = 0;
                }
                None => {
                    if self.buffer.len() > self.max_frame_bytes {
                        self.buffer.clear();
                        self.scanned = 0;
                        self.dropped = self.dropped.saturating_add(1);
                    } else {
                        // a trailing FF may be the first half of EOI
                        self.scanned = self.buffer.len().saturating_sub(1);
                    }
                    break;
                }
            }
        }

        frames
    }

    /// Frames discarded for exceeding the size cap.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Bytes held for an incomplete frame.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Forget any partial frame (e.g. after the producer restarted).
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }

    /// Discard bytes before the next SOI. False when no SOI is buffered.
    fn align_to_soi(&mut self) -> bool {
        if self.scanned > 0 {
            return true;
        }
        match find_marker(&self.buffer, 0xD8) {
            Some(0) => true,
            Some(start) => {
                self.buffer.drain(..start);
                true
            }
            None => {
                let keep_ff = self.buffer.last() == Some(&0xFF);
                self.buffer.clear();
                if keep_ff {
                    self.buffer.push(0xFF);
                }
                false
            }
        }
    }
}

fn find_marker(haystack: &[u8], marker: u8) -> Option<usize> {
    haystack.windows(2).position(|w| w[0] == 0xFF && w[1] == marker)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg(body: &[u8]) -> Vec<u8> {
        let mut frame = vec![0xFF, 0xD8];
        frame.extend_from_slice(body);
        frame.extend_from_slice(&[0xFF, 0xD9]);
        frame
    }

    #[test]
    fn splits_concatenated_frames() {
        let a = jpeg(&[1, 2, 3]);
        let b = jpeg(&[4, 0xFF, 0x00, 5]);
        let mut stream = a.clone();
        stream.extend_from_slice(&b);

        let mut splitter = MjpegSplitter::default();
        let frames = splitter.push(&stream);
        assert_eq!(frames, vec![a, b]);
        assert_eq!(splitter.pending(), 0);
    }

    #[test]
    fn reassembles_across_chunks() {
        let frame = jpeg(&[9; 100]);
        let mut splitter = MjpegSplitter::default();

        let mut out = Vec::new();
        for chunk in frame.chunks(7) {
            out.extend(splitter.push(chunk));
        }
        assert_eq!(out, vec![frame]);
    }

    #[test]
    fn eoi_split_between_chunks() {
        let frame = jpeg(&[1, 2]);
        let (head, tail) = frame.split_at(frame.len() - 1);
        let mut splitter = MjpegSplitter::default();
        assert!(splitter.push(head).is_empty());
        assert_eq!(splitter.push(tail), vec![frame]);
    }

    #[test]
    fn skips_leading_garbage() {
        let frame = jpeg(&[7]);
        let mut stream = vec![0x00, 0x12, 0xFF];
        stream.extend_from_slice(&frame);

        let mut splitter = MjpegSplitter::default();
        assert_eq!(splitter.push(&stream), vec![frame]);
    }

    #[test]
    fn soi_split_between_chunks() {
        let frame = jpeg(&[7, 8]);
        let mut splitter = MjpegSplitter::default();
        assert!(splitter.push(&[0x00, 0xFF]).is_empty());
        assert_eq!(splitter.push(&frame[1..]), vec![frame]);
    }

    #[test]
    fn oversized_frame_is_dropped() {
        let mut splitter = MjpegSplitter::new(16);
        let mut partial = vec![0xFF, 0xD8];
        partial.extend_from_slice(&[0u8; 32]);

        assert!(splitter.push(&partial).is_empty());
        assert_eq!(splitter.dropped(), 1);
        assert_eq!(splitter.pending(), 0);

        let next = jpeg(&[1]);
        assert_eq!(splitter.push(&next), vec![next]);
    }

    #[test]
    fn reset_discards_partial_frame() {
        let mut splitter = MjpegSplitter::default();
        let _ = splitter.push(&[0xFF, 0xD8, 1, 2, 3]);
        assert!(splitter.pending() > 0);
        splitter.reset();
        assert_eq!(splitter.pending(), 0);
    }
}
