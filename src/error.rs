//! Error types shared by the channel, duplex and pipeline layers.
//!
//! # Design Decisions
//! - Errors are `Clone`: a completion error is stored once and observed by
//!   every later read or flush on the opposite side
//! - Transport failures wrap the original `io::Error` in an `Arc`
//! - Cancellation is modelled here for the `AsyncRead`/`AsyncWrite` bridge only;
//!   the channel API reports it as a flag, never as an error

use std::fmt;
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Which end of a channel an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Reader,
    Writer,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Reader => write!(f, "reader"),
            Side::Writer => write!(f, "writer"),
        }
    }
}

/// Errors surfaced by channel operations and recorded as completion errors.
#[derive(Debug, Clone, Error)]
pub enum PipeError {
    /// Reading from the raw transport failed.
    #[error("transport read failed: {0}")]
    TransportRead(Arc<io::Error>),

    /// Writing to (or flushing) the raw transport failed.
    #[error("transport write failed: {0}")]
    TransportWrite(Arc<io::Error>),

    /// A pending wait was canceled by the opposite side.
    #[error("operation canceled")]
    Canceled,

    /// The operation was attempted after this side had completed.
    #[error("channel {side} already completed")]
    AlreadyCompleted { side: Side },

    /// The channel was force-closed by the owning pipeline being disposed.
    #[error("channel aborted by pipeline disposal")]
    Aborted,
}

impl PipeError {
    pub fn transport_read(err: io::Error) -> Self {
        PipeError::TransportRead(Arc::new(err))
    }

    pub fn transport_write(err: io::Error) -> Self {
        PipeError::TransportWrite(Arc::new(err))
    }

    /// Map onto the closest `io::ErrorKind` for the stream bridge.
    pub fn io_kind(&self) -> io::ErrorKind {
        match self {
            PipeError::TransportRead(e) | PipeError::TransportWrite(e) => e.kind(),
            PipeError::Canceled => io::ErrorKind::Interrupted,
            PipeError::AlreadyCompleted { .. } => io::ErrorKind::BrokenPipe,
            PipeError::Aborted => io::ErrorKind::ConnectionAborted,
        }
    }
}

impl From<PipeError> for io::Error {
    fn from(err: PipeError) -> Self {
        io::Error::new(err.io_kind(), err)
    }
}
