//! Shared channel state guarded by a mutex.

use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

use super::result::{FlushResult, ReadBuffer, ReadResult};
use super::ChannelOptions;
use crate::error::{PipeError, Side};

/// Lifecycle of a channel as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// Both sides active.
    Open,
    /// Writer completed; reader still draining.
    WriterClosed,
    /// Reader completed before the writer; writes are discarded.
    ReaderClosed,
    /// Reader observed writer completion, or both sides completed.
    Closed,
}

struct State {
    segments: VecDeque<Bytes>,
    occupancy: usize,
    pause_threshold: usize,
    resume_threshold: usize,
    /// Set while a flush is waiting for occupancy to fall below the resume mark.
    writer_paused: bool,

    writer_completed: bool,
    writer_error: Option<PipeError>,
    reader_completed: bool,
    reader_error: Option<PipeError>,
    completion_observed: bool,

    read_cancel_requested: bool,
    flush_cancel_requested: bool,
    reader_waker: Option<Waker>,
    writer_waker: Option<Waker>,
}

impl State {
    fn should_pause(&self) -> bool {
        if self.pause_threshold == 0 {
            return false;
        }
        if self.writer_paused {
            self.occupancy >= self.resume_threshold
        } else {
            self.occupancy >= self.pause_threshold
        }
    }

    fn snapshot(&self) -> ReadBuffer {
        ReadBuffer::new(self.segments.iter().cloned().collect(), self.occupancy)
    }
}

pub(crate) struct Shared {
    state: Mutex<State>,
}

/// Wake outside the lock so the woken task never contends on it immediately.
fn wake(waker: Option<Waker>) {
    if let Some(waker) = waker {
        waker.wake();
    }
}

impl Shared {
    pub(crate) fn new(options: ChannelOptions) -> Self {
        Self {
            state: Mutex::new(State {
                segments: VecDeque::new(),
                occupancy: 0,
                pause_threshold: options.pause_threshold,
                // A resume mark of zero could never be undercut.
                resume_threshold: options
                    .resume_threshold
                    .clamp(1, options.pause_threshold.max(1)),
                writer_paused: false,
                writer_completed: false,
                writer_error: None,
                reader_completed: false,
                reader_error: None,
                completion_observed: false,
                read_cancel_requested: false,
                flush_cancel_requested: false,
                reader_waker: None,
                writer_waker: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Invariant checks run before any mutation, so a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn writer_completed(&self) -> bool {
        self.lock().writer_completed
    }

    pub(crate) fn reader_completed(&self) -> bool {
        self.lock().reader_completed
    }

    /// Make a segment visible to the reader. Discarded once the reader is gone.
    pub(crate) fn publish(&self, segment: Bytes) {
        let waker = {
            let mut st = self.lock();
            if st.reader_completed {
                tracing::trace!(len = segment.len(), "Reader completed, discarding flushed bytes");
                return;
            }
            st.occupancy += segment.len();
            st.segments.push_back(segment);
            tracing::trace!(occupancy = st.occupancy, "Bytes published");
            st.reader_waker.take()
        };
        wake(waker);
    }

    pub(crate) fn poll_flush(&self, cx: &mut Context<'_>) -> Poll<FlushResult> {
        let mut st = self.lock();
        if st.reader_completed {
            st.writer_paused = false;
            return Poll::Ready(FlushResult::completed(st.reader_error.clone()));
        }
        if st.flush_cancel_requested {
            st.flush_cancel_requested = false;
            st.writer_paused = false;
            return Poll::Ready(FlushResult::canceled());
        }
        if st.should_pause() {
            if !st.writer_paused {
                tracing::trace!(occupancy = st.occupancy, "Flush paused by backpressure");
            }
            st.writer_paused = true;
            st.writer_waker = Some(cx.waker().clone());
            return Poll::Pending;
        }
        st.writer_paused = false;
        Poll::Ready(FlushResult::default())
    }

    pub(crate) fn poll_read(&self, cx: &mut Context<'_>) -> Poll<Result<ReadResult, PipeError>> {
        let mut st = self.lock();
        if st.reader_completed {
            return Poll::Ready(Err(PipeError::AlreadyCompleted { side: Side::Reader }));
        }
        if st.read_cancel_requested {
            st.read_cancel_requested = false;
            return Poll::Ready(Ok(ReadResult::canceled(st.snapshot())));
        }
        if st.occupancy > 0 {
            return Poll::Ready(Ok(ReadResult::data(st.snapshot())));
        }
        if st.writer_completed {
            st.completion_observed = true;
            return Poll::Ready(Ok(ReadResult::completed(st.writer_error.clone())));
        }
        st.reader_waker = Some(cx.waker().clone());
        Poll::Pending
    }

    /// Release `consumed` bytes from the front of the visible data.
    pub(crate) fn advance(&self, mut consumed: usize) {
        let waker = {
            let mut st = self.lock();
            if st.reader_completed {
                // Buffers were already released when the reader was force-completed.
                return;
            }
            assert!(
                consumed <= st.occupancy,
                "advanced {} bytes but only {} are readable",
                consumed,
                st.occupancy
            );
            st.occupancy -= consumed;
            while consumed > 0 {
                let Some(front) = st.segments.front_mut() else {
                    break;
                };
                if front.len() <= consumed {
                    consumed -= front.len();
                    st.segments.pop_front();
                } else {
                    let _ = front.split_to(consumed);
                    consumed = 0;
                }
            }
            if st.writer_waker.is_some() && !st.should_pause() {
                st.writer_waker.take()
            } else {
                None
            }
        };
        wake(waker);
    }

    pub(crate) fn complete_writer(&self, error: Option<PipeError>) {
        let wakers = {
            let mut st = self.lock();
            if st.writer_completed {
                return;
            }
            tracing::trace!(error = ?error, "Channel writer completed");
            st.writer_completed = true;
            st.writer_error = error;
            // A force-completed writer may itself be parked in flush.
            (st.reader_waker.take(), st.writer_waker.take())
        };
        wake(wakers.0);
        wake(wakers.1);
    }

    pub(crate) fn complete_reader(&self, error: Option<PipeError>) {
        let wakers = {
            let mut st = self.lock();
            if st.reader_completed {
                return;
            }
            tracing::trace!(error = ?error, discarded = st.occupancy, "Channel reader completed");
            st.reader_completed = true;
            st.reader_error = error;
            st.segments.clear();
            st.occupancy = 0;
            (st.writer_waker.take(), st.reader_waker.take())
        };
        wake(wakers.0);
        wake(wakers.1);
    }

    pub(crate) fn cancel_pending_read(&self) {
        let waker = {
            let mut st = self.lock();
            st.read_cancel_requested = true;
            st.reader_waker.take()
        };
        wake(waker);
    }

    pub(crate) fn cancel_pending_flush(&self) {
        let waker = {
            let mut st = self.lock();
            st.flush_cancel_requested = true;
            st.writer_waker.take()
        };
        wake(waker);
    }

    pub(crate) fn occupancy(&self) -> usize {
        self.lock().occupancy
    }

    pub(crate) fn status(&self) -> ChannelStatus {
        let st = self.lock();
        match (st.writer_completed, st.reader_completed) {
            (false, false) => ChannelStatus::Open,
            (true, false) if st.completion_observed => ChannelStatus::Closed,
            (true, false) => ChannelStatus::WriterClosed,
            (false, true) => ChannelStatus::ReaderClosed,
            (true, true) => ChannelStatus::Closed,
        }
    }
}
