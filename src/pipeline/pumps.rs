//! The two loops that move bytes between the transport and the channels.

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::report::{Direction, ErrorReporter};
use super::signals::TransportSignals;
use super::PipelineOptions;
use crate::channel::{ChannelHandle, ChannelReader, ChannelWriter, ReadBuffer};
use crate::error::PipeError;
use crate::observability::metrics;

/// What both pumps share for one run.
pub(crate) struct PumpContext<'a> {
    pub options: &'a PipelineOptions,
    pub reporter: &'a dyn ErrorReporter,
    pub signals: &'a TransportSignals,
}

/// Stream → Input.
pub(crate) async fn read_pump<R>(
    mut stream: R,
    mut input: ChannelWriter,
    output: ChannelHandle,
    ctx: &PumpContext<'_>,
) where
    R: AsyncRead + Unpin,
{
    let mut error = None;
    let mut total = 0u64;

    loop {
        let segment = match input.writable_segment(ctx.options.min_alloc_buffer_size) {
            Ok(segment) => segment,
            Err(_) => break,
        };
        let n = match stream.read(segment).await {
            Ok(n) => n,
            Err(e) => {
                error = Some(PipeError::transport_read(e));
                break;
            }
        };
        if n == 0 {
            tracing::debug!(total_bytes = total, "Peer closed its write side");
            break;
        }
        input.commit(n);
        total += n as u64;
        metrics::record_bytes(Direction::Inbound, n);

        match input.flush().await {
            Ok(result) if result.is_completed => {
                tracing::debug!("Application stopped reading input");
                break;
            }
            Ok(result) if result.is_canceled => {
                tracing::debug!("Input flush canceled by write side shutdown");
                break;
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }

    if let Some(err) = &error {
        ctx.reporter.report(Direction::Inbound, err);
    }
    input.complete(error);
    ctx.signals.close_reads();
    output.cancel_pending_read();
    tracing::trace!(total_bytes = total, "Read pump finished");
}

/// Output → stream.
pub(crate) async fn write_pump<W>(
    mut stream: W,
    mut output: ChannelReader,
    input: ChannelHandle,
    ctx: &PumpContext<'_>,
) where
    W: AsyncWrite + Unpin,
{
    let mut error = None;
    let mut total = 0u64;

    loop {
        let result = match output.read().await {
            Ok(result) => result,
            Err(_) => break,
        };
        if result.is_canceled {
            tracing::debug!("Output read canceled by read side shutdown");
            break;
        }

        let buffer = result.buffer;
        if buffer.is_empty() {
            if result.is_completed {
                tracing::debug!(total_bytes = total, "Application completed output");
                break;
            }
            if ctx.options.flush_on_idle_read {
                if let Err(e) = stream.flush().await {
                    error = Some(PipeError::transport_write(e));
                    break;
                }
            }
            continue;
        }

        let len = buffer.len();
        let written = {
            let _release = Release::new(&mut output, len);
            write_segments(&mut stream, &buffer).await
        };
        if let Err(e) = written {
            error = Some(PipeError::transport_write(e));
            break;
        }
        total += len as u64;
        metrics::record_bytes(Direction::Outbound, len);

        if ctx.options.flush_on_idle_read && output.readable() == 0 {
            if let Err(e) = stream.flush().await {
                error = Some(PipeError::transport_write(e));
                break;
            }
        }
    }

    if let Some(err) = &error {
        ctx.reporter.report(Direction::Outbound, err);
    }
    output.complete(error);
    ctx.signals.close_writes();
    input.cancel_pending_flush();
    tracing::trace!(total_bytes = total, "Write pump finished");
}

async fn write_segments<W>(stream: &mut W, buffer: &ReadBuffer) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if buffer.is_single_segment() {
        return stream.write_all(&buffer.segments()[0]).await;
    }
    for segment in buffer.segments() {
        stream.write_all(segment).await?;
    }
    Ok(())
}

/// Hands a read range back to the channel on every exit path, including
/// cancellation of the surrounding future.
struct Release<'a> {
    reader: &'a mut ChannelReader,
    len: usize,
}

impl<'a> Release<'a> {
    fn new(reader: &'a mut ChannelReader, len: usize) -> Self {
        Self { reader, len }
    }
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        self.reader.advance(self.len);
    }
}
