//! tokio stream bridge for `DuplexHalf`.
//!
//! Lets a protocol layer written against `AsyncRead + AsyncWrite` consume the
//! application view exactly as it would a socket.

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use super::DuplexHalf;
use crate::error::PipeError;

impl AsyncRead for DuplexHalf {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if buf.remaining() == 0 || this.reader.is_completed() {
            return Poll::Ready(Ok(()));
        }

        let result = ready!(this.reader.poll_read(cx))?;
        if result.is_canceled {
            return Poll::Ready(Err(PipeError::Canceled.into()));
        }
        if result.is_completed {
            return Poll::Ready(match result.error {
                Some(err) => Err(err.into()),
                None => Ok(()),
            });
        }

        let mut copied = 0;
        for segment in result.buffer.segments() {
            let n = segment.len().min(buf.remaining());
            buf.put_slice(&segment[..n]);
            copied += n;
            if buf.remaining() == 0 {
                break;
            }
        }
        this.reader.advance(copied);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for DuplexHalf {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if data.is_empty() {
            return Poll::Ready(Ok(0));
        }

        // Wait out backpressure from earlier writes before accepting more.
        let flush = ready!(this.writer.poll_flush(cx))?;
        if flush.is_completed {
            let err = flush
                .error
                .map(io::Error::from)
                .unwrap_or_else(|| io::Error::from(io::ErrorKind::BrokenPipe));
            return Poll::Ready(Err(err));
        }
        if flush.is_canceled {
            return Poll::Ready(Err(PipeError::Canceled.into()));
        }

        this.writer.write(data)?;
        this.writer.publish();
        Poll::Ready(Ok(data.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let flush = ready!(self.get_mut().writer.poll_flush(cx))?;
        if flush.is_canceled {
            return Poll::Ready(Err(PipeError::Canceled.into()));
        }
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().writer.complete(None);
        Poll::Ready(Ok(()))
    }
}
