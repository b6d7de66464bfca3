//! Consumer half of a channel.

use std::future::poll_fn;
use std::sync::Arc;
use std::task::{Context, Poll};

use super::result::ReadResult;
use super::state::Shared;
use super::ChannelHandle;
use crate::error::PipeError;

/// Reading end of a channel. Dropping the reader completes it without error.
pub struct ChannelReader {
    shared: Arc<Shared>,
    completed: bool,
}

impl ChannelReader {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            completed: false,
        }
    }

    pub(crate) fn poll_read(&mut self, cx: &mut Context<'_>) -> Poll<Result<ReadResult, PipeError>> {
        self.shared.poll_read(cx)
    }

    /// Wait for readable bytes, writer completion or a read cancellation.
    ///
    /// Bytes are reported until none remain; only then does a result carry
    /// `is_completed` and the writer's error.
    pub async fn read(&mut self) -> Result<ReadResult, PipeError> {
        poll_fn(|cx| self.poll_read(cx)).await
    }

    /// Release `consumed` bytes from the front of the readable data.
    ///
    /// # Panics
    /// If more bytes are released than are readable.
    pub fn advance(&mut self, consumed: usize) {
        if consumed > 0 {
            self.shared.advance(consumed);
        }
    }

    /// Bytes flushed by the writer and not yet advanced past.
    pub fn readable(&self) -> usize {
        self.shared.occupancy()
    }

    pub fn complete(&mut self, error: Option<PipeError>) {
        if self.completed {
            return;
        }
        self.completed = true;
        self.shared.complete_reader(error);
    }

    pub fn is_completed(&self) -> bool {
        self.completed || self.shared.reader_completed()
    }

    pub fn cancel_pending_read(&self) {
        self.shared.cancel_pending_read();
    }

    pub fn handle(&self) -> ChannelHandle {
        ChannelHandle::new(Arc::clone(&self.shared))
    }
}

impl Drop for ChannelReader {
    fn drop(&mut self) {
        self.complete(None);
    }
}

impl std::fmt::Debug for ChannelReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelReader")
            .field("readable", &self.readable())
            .field("completed", &self.completed)
            .finish()
    }
}
