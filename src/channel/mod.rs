//! Bounded single-producer/single-consumer byte channel.
//!
//! # Data Flow
//! ```text
//! ChannelWriter                                   ChannelReader
//!   writable_segment(n) → fill → commit(n)
//!   flush() ──publish──▶ [ seg | seg | seg ] ──▶ read() → advance(consumed)
//!      ▲                                                   │
//!      └──────────── wake when occupancy < resume ─────────┘
//! ```
//!
//! # States
//! ```text
//! Open → WriterClosed → Closed    (reader drained and saw completion)
//! Open → ReaderClosed             (reader gave up; writes are discarded)
//! ```
//!
//! # Design Decisions
//! - Committed bytes stay in the writer's private buffer until `flush`
//! - Backpressure is evaluated only in `flush`, never at commit
//! - A writer completion error is reported only once all data has drained
//! - Cancellation requests are one-shot: each wakes exactly one wait

mod reader;
mod result;
mod state;
mod writer;

use std::sync::Arc;

pub use reader::ChannelReader;
pub use result::{FlushResult, ReadBuffer, ReadResult};
pub use state::ChannelStatus;
pub use writer::ChannelWriter;

use crate::error::PipeError;
use state::Shared;

/// Default occupancy at which `flush` starts suspending.
pub const DEFAULT_PAUSE_THRESHOLD: usize = 64 * 1024;

/// Default occupancy below which a suspended `flush` resumes: the bound itself.
pub const DEFAULT_RESUME_THRESHOLD: usize = DEFAULT_PAUSE_THRESHOLD;

/// Backpressure configuration for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelOptions {
    /// Occupancy at which `flush` suspends. Zero disables backpressure.
    pub pause_threshold: usize,
    /// Occupancy the reader must drop below before a paused `flush` resumes.
    /// Equal to `pause_threshold` unless hysteresis is wanted. Clamped to
    /// `pause_threshold`.
    pub resume_threshold: usize,
}

impl ChannelOptions {
    /// Options with no backpressure at all.
    pub fn unbounded() -> Self {
        Self {
            pause_threshold: 0,
            resume_threshold: 0,
        }
    }

    /// Pause and resume at the same bound.
    pub fn bounded(bound: usize) -> Self {
        Self {
            pause_threshold: bound,
            resume_threshold: bound,
        }
    }
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            pause_threshold: DEFAULT_PAUSE_THRESHOLD,
            resume_threshold: DEFAULT_RESUME_THRESHOLD,
        }
    }
}

/// Create a new channel, returning its writer and reader halves.
pub fn channel(options: ChannelOptions) -> (ChannelWriter, ChannelReader) {
    let shared = Arc::new(Shared::new(options));
    (
        ChannelWriter::new(Arc::clone(&shared)),
        ChannelReader::new(shared),
    )
}

/// Cloneable control handle onto a channel.
///
/// Lets a party that owns neither half cancel pending waits or force a side
/// closed. Used by the pumps to signal each other and by `DuplexPipe` disposal.
#[derive(Clone)]
pub struct ChannelHandle {
    shared: Arc<Shared>,
}

impl ChannelHandle {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Wake one suspended (or the next) `read` with `is_canceled = true`.
    pub fn cancel_pending_read(&self) {
        self.shared.cancel_pending_read();
    }

    /// Wake one suspended (or the next) `flush` with `is_canceled = true`.
    pub fn cancel_pending_flush(&self) {
        self.shared.cancel_pending_flush();
    }

    /// Mark the reader side completed. No-op if already completed.
    pub fn complete_reader(&self, error: Option<PipeError>) {
        self.shared.complete_reader(error);
    }

    /// Mark the writer side completed. Bytes still in the writer's private
    /// buffer are not published. No-op if already completed.
    pub fn complete_writer(&self, error: Option<PipeError>) {
        self.shared.complete_writer(error);
    }

    /// Current lifecycle state.
    pub fn status(&self) -> ChannelStatus {
        self.shared.status()
    }

    /// Bytes flushed but not yet consumed.
    pub fn occupancy(&self) -> usize {
        self.shared.occupancy()
    }
}

impl std::fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("status", &self.status())
            .field("occupancy", &self.occupancy())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Side;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn flushed_bytes_arrive_in_order() {
        let (mut tx, mut rx) = channel(ChannelOptions::default());
        tx.write(b"hello").unwrap();
        tx.write(b" ").unwrap();
        tx.flush().await.unwrap();
        tx.write(b"world").unwrap();
        tx.flush().await.unwrap();

        let result = rx.read().await.unwrap();
        assert!(!result.is_completed);
        assert_eq!(result.buffer.to_vec(), b"hello world");
        assert_eq!(result.buffer.segments().len(), 2);
        rx.advance(result.buffer.len());
        assert_eq!(rx.handle().occupancy(), 0);
    }

    #[tokio::test]
    async fn committed_bytes_are_invisible_until_flush() {
        let (mut tx, mut rx) = channel(ChannelOptions::default());
        let segment = tx.writable_segment(4).unwrap();
        assert!(segment.len() >= 4);
        segment[..3].copy_from_slice(b"abc");
        tx.commit(3);

        assert!(timeout(Duration::from_millis(20), rx.read()).await.is_err());

        tx.flush().await.unwrap();
        let result = rx.read().await.unwrap();
        assert_eq!(result.buffer.to_vec(), b"abc");
    }

    #[tokio::test]
    async fn completion_follows_buffered_data() {
        let (mut tx, mut rx) = channel(ChannelOptions::default());
        tx.write(b"tail").unwrap();
        tx.flush().await.unwrap();
        tx.complete(Some(PipeError::Canceled));

        let first = rx.read().await.unwrap();
        assert!(!first.is_completed);
        assert!(first.error.is_none());
        assert_eq!(first.buffer.to_vec(), b"tail");
        rx.advance(4);

        let last = rx.read().await.unwrap();
        assert!(last.is_completed);
        assert!(last.buffer.is_empty());
        assert!(matches!(last.error, Some(PipeError::Canceled)));
        assert_eq!(rx.handle().status(), ChannelStatus::Closed);
    }

    #[tokio::test]
    async fn complete_publishes_committed_bytes() {
        let (mut tx, mut rx) = channel(ChannelOptions::default());
        tx.write(b"late").unwrap();
        tx.complete(None);

        let result = rx.read().await.unwrap();
        assert_eq!(result.buffer.to_vec(), b"late");
    }

    #[tokio::test]
    async fn writes_after_complete_are_rejected() {
        let (mut tx, _rx) = channel(ChannelOptions::default());
        tx.complete(None);
        tx.complete(None);

        assert!(matches!(
            tx.write(b"x"),
            Err(PipeError::AlreadyCompleted { side: Side::Writer })
        ));
        assert!(matches!(
            tx.flush().await,
            Err(PipeError::AlreadyCompleted { side: Side::Writer })
        ));
    }

    #[tokio::test]
    async fn flush_suspends_at_bound_and_resumes_after_advance() {
        let (mut tx, mut rx) = channel(ChannelOptions::bounded(8));
        tx.write(&[7u8; 8]).unwrap();

        let flush = tokio::spawn(async move {
            let result = tx.flush().await.unwrap();
            (tx, result)
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!flush.is_finished());

        let result = rx.read().await.unwrap();
        assert_eq!(result.buffer.len(), 8);
        rx.advance(1);

        let (_tx, result) = timeout(Duration::from_secs(1), flush)
            .await
            .expect("flush should resume")
            .unwrap();
        assert!(!result.is_completed);
        assert!(!result.is_canceled);
    }

    #[tokio::test]
    async fn default_flush_resumes_once_below_the_bound() {
        let (mut tx, mut rx) = channel(ChannelOptions::default());
        tx.write(&vec![0u8; DEFAULT_PAUSE_THRESHOLD]).unwrap();
        let flush = tokio::spawn(async move { tx.flush().await.unwrap() });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!flush.is_finished());

        rx.read().await.unwrap();
        rx.advance(24 * 1024);
        assert_eq!(rx.readable(), 40 * 1024);

        let result = timeout(Duration::from_millis(200), flush)
            .await
            .expect("flush should resume below the bound")
            .unwrap();
        assert!(!result.is_completed);
        assert!(!result.is_canceled);
    }

    #[tokio::test]
    async fn resume_threshold_adds_hysteresis() {
        let options = ChannelOptions {
            pause_threshold: 8,
            resume_threshold: 4,
        };
        let (mut tx, mut rx) = channel(options);
        tx.write(&[1u8; 8]).unwrap();
        let flush = tokio::spawn(async move { tx.flush().await.unwrap() });
        tokio::time::sleep(Duration::from_millis(10)).await;

        rx.read().await.unwrap();
        rx.advance(2);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!flush.is_finished(), "6 bytes is still above the resume mark");

        rx.advance(3);
        timeout(Duration::from_secs(1), flush).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn zero_bound_never_suspends() {
        let (mut tx, _rx) = channel(ChannelOptions::unbounded());
        for _ in 0..64 {
            tx.write(&[0u8; 1024]).unwrap();
            let result = tx.flush().await.unwrap();
            assert!(!result.is_completed);
        }
    }

    #[tokio::test]
    async fn cancel_pending_read_wakes_one_read_only() {
        let (mut tx, mut rx) = channel(ChannelOptions::default());
        let handle = rx.handle();

        let pending = tokio::spawn(async move {
            let result = rx.read().await.unwrap();
            (rx, result)
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel_pending_read();

        let (mut rx, result) = timeout(Duration::from_secs(1), pending).await.unwrap().unwrap();
        assert!(result.is_canceled);
        assert!(!result.is_completed);

        // The next read waits for real data again.
        assert!(timeout(Duration::from_millis(20), rx.read()).await.is_err());
        tx.write(b"ok").unwrap();
        tx.flush().await.unwrap();
        let result = rx.read().await.unwrap();
        assert!(!result.is_canceled);
        assert_eq!(result.buffer.to_vec(), b"ok");
    }

    #[tokio::test]
    async fn cancel_pending_flush_wakes_backpressured_writer() {
        let (mut tx, _rx) = channel(ChannelOptions::bounded(4));
        let handle = tx.handle();
        tx.write(b"full").unwrap();

        let pending = tokio::spawn(async move { tx.flush().await.unwrap() });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel_pending_flush();

        let result = timeout(Duration::from_secs(1), pending).await.unwrap().unwrap();
        assert!(result.is_canceled);
        assert_eq!(handle.status(), ChannelStatus::Open);
    }

    #[tokio::test]
    async fn cancel_before_any_wait_reaches_the_next_one() {
        let (_tx, mut rx) = channel(ChannelOptions::default());
        let handle = rx.handle();

        // Two requests with nothing suspended collapse into one.
        handle.cancel_pending_read();
        handle.cancel_pending_read();

        let result = timeout(Duration::from_secs(1), rx.read()).await.unwrap().unwrap();
        assert!(result.is_canceled);
        assert!(timeout(Duration::from_millis(20), rx.read()).await.is_err());
    }

    #[tokio::test]
    async fn reader_completion_releases_writer() {
        let (mut tx, mut rx) = channel(ChannelOptions::bounded(4));
        tx.write(b"full").unwrap();
        let pending = tokio::spawn(async move {
            let result = tx.flush().await.unwrap();
            (tx, result)
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        rx.complete(Some(PipeError::Aborted));

        let (mut tx, result) = timeout(Duration::from_secs(1), pending).await.unwrap().unwrap();
        assert!(result.is_completed);
        assert!(matches!(result.error, Some(PipeError::Aborted)));

        // Further writes are accepted but discarded.
        tx.write(b"more").unwrap();
        assert!(tx.flush().await.unwrap().is_completed);
        assert_eq!(tx.handle().occupancy(), 0);
        assert_eq!(tx.handle().status(), ChannelStatus::ReaderClosed);
    }

    #[tokio::test]
    async fn read_after_reader_complete_fails() {
        let (_tx, mut rx) = channel(ChannelOptions::default());
        rx.complete(None);
        assert!(matches!(
            rx.read().await,
            Err(PipeError::AlreadyCompleted { side: Side::Reader })
        ));
    }

    #[tokio::test]
    async fn dropping_writer_completes_cleanly() {
        let (tx, mut rx) = channel(ChannelOptions::default());
        drop(tx);
        let result = rx.read().await.unwrap();
        assert!(result.is_completed);
        assert!(result.error.is_none());
    }

    #[test]
    #[should_panic]
    fn over_commit_panics() {
        let (mut tx, _rx) = channel(ChannelOptions::default());
        let len = tx.writable_segment(4).unwrap().len();
        tx.commit(len + 1);
    }
}
