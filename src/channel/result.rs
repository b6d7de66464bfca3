//! Results returned by `read` and `flush`.

use bytes::Bytes;

use crate::error::PipeError;

/// Snapshot of the readable bytes, as an ordered list of contiguous segments.
///
/// Segments are reference-counted views; holding a `ReadBuffer` does not copy
/// data, and the bytes stay counted against the channel until `advance`.
#[derive(Debug, Clone, Default)]
pub struct ReadBuffer {
    segments: Vec<Bytes>,
    len: usize,
}

impl ReadBuffer {
    pub(crate) fn new(segments: Vec<Bytes>, len: usize) -> Self {
        Self { segments, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when the buffer is one contiguous region.
    pub fn is_single_segment(&self) -> bool {
        self.segments.len() == 1
    }

    pub fn segments(&self) -> &[Bytes] {
        &self.segments
    }

    /// Copy the readable bytes into one `Vec`.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for segment in &self.segments {
            out.extend_from_slice(segment);
        }
        out
    }

    /// Copy up to `dst.len()` bytes from the front, returning how many were copied.
    pub fn copy_to_slice(&self, dst: &mut [u8]) -> usize {
        let mut copied = 0;
        for segment in &self.segments {
            if copied == dst.len() {
                break;
            }
            let n = segment.len().min(dst.len() - copied);
            dst[copied..copied + n].copy_from_slice(&segment[..n]);
            copied += n;
        }
        copied
    }
}

/// Outcome of a `read`.
#[derive(Debug, Clone, Default)]
pub struct ReadResult {
    /// Readable bytes at the time of the read.
    pub buffer: ReadBuffer,
    /// The writer completed and every byte has been drained.
    pub is_completed: bool,
    /// The read was woken by `cancel_pending_read`.
    pub is_canceled: bool,
    /// The writer's completion error, only set together with `is_completed`.
    pub error: Option<PipeError>,
}

impl ReadResult {
    pub(crate) fn data(buffer: ReadBuffer) -> Self {
        Self {
            buffer,
            ..Self::default()
        }
    }

    pub(crate) fn canceled(buffer: ReadBuffer) -> Self {
        Self {
            buffer,
            is_canceled: true,
            ..Self::default()
        }
    }

    pub(crate) fn completed(error: Option<PipeError>) -> Self {
        Self {
            is_completed: true,
            error,
            ..Self::default()
        }
    }
}

/// Outcome of a `flush`.
#[derive(Debug, Clone, Default)]
pub struct FlushResult {
    /// The reader completed; nothing written from now on will be read.
    pub is_completed: bool,
    /// The flush was woken by `cancel_pending_flush`.
    pub is_canceled: bool,
    /// The reader's completion error, if it gave one.
    pub error: Option<PipeError>,
}

impl FlushResult {
    pub(crate) fn completed(error: Option<PipeError>) -> Self {
        Self {
            is_completed: true,
            error,
            ..Self::default()
        }
    }

    pub(crate) fn canceled() -> Self {
        Self {
            is_canceled: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_to_slice_spans_segments() {
        let buffer = ReadBuffer::new(
            vec![Bytes::from_static(b"ab"), Bytes::from_static(b"cde")],
            5,
        );
        let mut dst = [0u8; 4];
        assert_eq!(buffer.copy_to_slice(&mut dst), 4);
        assert_eq!(&dst, b"abcd");
        assert!(!buffer.is_single_segment());
    }
}
