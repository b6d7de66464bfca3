//! Paired Input/Output channels with application- and adapter-facing views.
//!
//! # Data Flow
//! ```text
//!              Input channel
//! adapter ── writer ─────────▶ reader ── application
//! adapter ◀─ reader ────────── writer ── application
//!              Output channel
//! ```
//!
//! # Design Decisions
//! - Each view is handed out once; ownership enforces one producer and one
//!   consumer per channel
//! - Disposal reaches the application's ends through channel handles, so it
//!   works while the application still owns them
//! - The application view doubles as a tokio `AsyncRead + AsyncWrite` stream

mod stream;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::channel::{channel, ChannelHandle, ChannelOptions, ChannelReader, ChannelWriter};
use crate::error::PipeError;

/// Backpressure settings for both directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipeOptions {
    /// Stream → application.
    pub input: ChannelOptions,
    /// Application → stream.
    pub output: ChannelOptions,
}

/// One side's view of a duplex pipe: a reader from one channel and a writer
/// into the other.
#[derive(Debug)]
pub struct DuplexHalf {
    pub reader: ChannelReader,
    pub writer: ChannelWriter,
}

impl DuplexHalf {
    /// Split into the reading and writing ends.
    pub fn into_parts(self) -> (ChannelReader, ChannelWriter) {
        (self.reader, self.writer)
    }
}

/// Cloneable disposer for a `DuplexPipe`.
///
/// Lets a task that does not own the pipe, or runs while the pipe is
/// borrowed, close the application's ends.
#[derive(Clone)]
pub struct DisposeHandle {
    input: ChannelHandle,
    output: ChannelHandle,
    disposed: Arc<AtomicBool>,
}

impl DisposeHandle {
    /// Complete Input's reader and Output's writer. Safe to call repeatedly,
    /// from any clone.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::trace!("Disposing duplex pipe");
        self.input.complete_reader(Some(PipeError::Aborted));
        self.output.complete_writer(Some(PipeError::Aborted));
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for DisposeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisposeHandle")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Two independent channels, Input and Output, under one owner.
pub struct DuplexPipe {
    application: Option<DuplexHalf>,
    adapter: Option<DuplexHalf>,
    closer: DisposeHandle,
}

impl DuplexPipe {
    pub fn new(options: &PipeOptions) -> Self {
        let (input_writer, input_reader) = channel(options.input);
        let (output_writer, output_reader) = channel(options.output);
        let closer = DisposeHandle {
            input: input_reader.handle(),
            output: output_reader.handle(),
            disposed: Arc::new(AtomicBool::new(false)),
        };

        Self {
            application: Some(DuplexHalf {
                reader: input_reader,
                writer: output_writer,
            }),
            adapter: Some(DuplexHalf {
                reader: output_reader,
                writer: input_writer,
            }),
            closer,
        }
    }

    /// Input's reader and Output's writer. Returns `None` after the first call.
    pub fn application(&mut self) -> Option<DuplexHalf> {
        self.application.take()
    }

    /// Input's writer and Output's reader. Returns `None` after the first call.
    pub fn adapter(&mut self) -> Option<DuplexHalf> {
        self.adapter.take()
    }

    /// Control handle onto the Input (stream → application) channel.
    pub fn input(&self) -> &ChannelHandle {
        &self.closer.input
    }

    /// Control handle onto the Output (application → stream) channel.
    pub fn output(&self) -> &ChannelHandle {
        &self.closer.output
    }

    pub fn dispose_handle(&self) -> DisposeHandle {
        self.closer.clone()
    }

    /// Complete Input's reader and Output's writer. Safe to call repeatedly.
    pub fn dispose(&self) {
        self.closer.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.closer.is_disposed()
    }
}

impl Drop for DuplexPipe {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for DuplexPipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplexPipe")
            .field("input", self.input())
            .field("output", self.output())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
