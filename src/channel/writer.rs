//! Producer half of a channel.

use bytes::BytesMut;
use std::future::poll_fn;
use std::sync::Arc;
use std::task::{Context, Poll};

use super::result::FlushResult;
use super::state::Shared;
use super::ChannelHandle;
use crate::error::{PipeError, Side};

/// Writing end of a channel.
///
/// Bytes go through three stages: reserved (`writable_segment`), committed
/// (`commit`, private to the writer) and published (`flush`, visible to the
/// reader). Dropping the writer completes it without error.
pub struct ChannelWriter {
    shared: Arc<Shared>,
    /// `buf[..committed]` is committed; anything past it is the offered segment.
    buf: BytesMut,
    committed: usize,
    completed: bool,
}

impl ChannelWriter {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            buf: BytesMut::new(),
            committed: 0,
            completed: false,
        }
    }

    fn ensure_open(&self) -> Result<(), PipeError> {
        if self.completed || self.shared.writer_completed() {
            return Err(PipeError::AlreadyCompleted { side: Side::Writer });
        }
        Ok(())
    }

    /// Offer a writable region of at least `min_size` bytes (at least one).
    pub fn writable_segment(&mut self, min_size: usize) -> Result<&mut [u8], PipeError> {
        self.ensure_open()?;
        self.buf.resize(self.committed + min_size.max(1), 0);
        Ok(&mut self.buf[self.committed..])
    }

    /// Mark `n` bytes of the last offered segment as written.
    ///
    /// # Panics
    /// If `n` exceeds the segment handed out by `writable_segment`.
    pub fn commit(&mut self, n: usize) {
        assert!(
            self.committed + n <= self.buf.len(),
            "committed {} bytes past the offered segment",
            self.committed + n - self.buf.len()
        );
        self.committed += n;
    }

    /// Copy `data` in and commit it.
    pub fn write(&mut self, data: &[u8]) -> Result<(), PipeError> {
        if data.is_empty() {
            return self.ensure_open();
        }
        let segment = self.writable_segment(data.len())?;
        segment[..data.len()].copy_from_slice(data);
        self.commit(data.len());
        Ok(())
    }

    /// Bytes committed but not yet flushed.
    pub fn unflushed(&self) -> usize {
        self.committed
    }

    pub(crate) fn publish(&mut self) {
        if self.committed == 0 {
            self.buf.clear();
            return;
        }
        self.buf.truncate(self.committed);
        self.committed = 0;
        let segment = self.buf.split().freeze();
        self.shared.publish(segment);
    }

    /// Publish committed bytes, then wait out backpressure.
    pub(crate) fn poll_flush(&mut self, cx: &mut Context<'_>) -> Poll<Result<FlushResult, PipeError>> {
        self.ensure_open()?;
        self.publish();
        self.shared.poll_flush(cx).map(Ok)
    }

    /// Make committed bytes visible to the reader.
    ///
    /// Suspends while the channel holds at least the pause threshold, until
    /// the reader drains below the resume threshold, the reader completes or
    /// the flush is canceled.
    pub async fn flush(&mut self) -> Result<FlushResult, PipeError> {
        poll_fn(|cx| self.poll_flush(cx)).await
    }

    /// Complete the writer. Committed bytes are published first.
    pub fn complete(&mut self, error: Option<PipeError>) {
        if self.completed {
            return;
        }
        self.completed = true;
        if !self.shared.writer_completed() {
            self.publish();
        }
        self.shared.complete_writer(error);
    }

    /// True once the writer completed itself or was force-completed.
    pub fn is_completed(&self) -> bool {
        self.completed || self.shared.writer_completed()
    }

    /// True once the reader has completed; further writes are discarded.
    pub fn is_reader_completed(&self) -> bool {
        self.shared.reader_completed()
    }

    pub fn cancel_pending_flush(&self) {
        self.shared.cancel_pending_flush();
    }

    pub fn handle(&self) -> ChannelHandle {
        ChannelHandle::new(Arc::clone(&self.shared))
    }
}

impl Drop for ChannelWriter {
    fn drop(&mut self) {
        self.complete(None);
    }
}

impl std::fmt::Debug for ChannelWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelWriter")
            .field("unflushed", &self.committed)
            .field("completed", &self.completed)
            .finish()
    }
}
