//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use stream_adapter::config::ServerConfig;
use stream_adapter::error::PipeError;
use stream_adapter::lifecycle::Shutdown;
use stream_adapter::net::listener::Listener;
use stream_adapter::pipeline::{Direction, ErrorReporter};
use stream_adapter::server::{EchoServer, ServerError};

/// One step of a scripted transport's read side.
#[derive(Debug, Clone)]
pub enum ReadStep {
    Data(Vec<u8>),
    /// A zero-byte read: the peer closed its write side.
    Eof,
    Fail(io::ErrorKind),
    /// Never completes.
    Hang,
}

impl ReadStep {
    pub fn data(bytes: &[u8]) -> Self {
        ReadStep::Data(bytes.to_vec())
    }
}

/// How a scripted transport treats writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Accept,
    Fail(io::ErrorKind),
    /// Writes never complete.
    Stall,
}

/// What the pipeline did to a scripted transport.
#[derive(Debug, Clone, Default)]
pub struct WriteLog {
    written: Arc<Mutex<Vec<u8>>>,
    flushes: Arc<AtomicUsize>,
    read_calls: Arc<AtomicUsize>,
}

impl WriteLog {
    pub fn bytes(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }
}

/// In-memory transport that replays a read script and records writes.
///
/// Once the script runs out every further read hangs.
#[derive(Debug)]
pub struct ScriptedStream {
    reads: VecDeque<ReadStep>,
    write_mode: WriteMode,
    log: WriteLog,
}

impl ScriptedStream {
    pub fn new(reads: Vec<ReadStep>, write_mode: WriteMode) -> (Self, WriteLog) {
        let log = WriteLog::default();
        let stream = Self {
            reads: reads.into(),
            write_mode,
            log: log.clone(),
        };
        (stream, log)
    }
}

impl AsyncRead for ScriptedStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        this.log.read_calls.fetch_add(1, Ordering::SeqCst);
        match this.reads.pop_front() {
            Some(ReadStep::Data(mut data)) => {
                let n = data.len().min(buf.remaining());
                buf.put_slice(&data[..n]);
                if n < data.len() {
                    let rest = data.split_off(n);
                    this.reads.push_front(ReadStep::Data(rest));
                }
                Poll::Ready(Ok(()))
            }
            Some(ReadStep::Eof) => Poll::Ready(Ok(())),
            Some(ReadStep::Fail(kind)) => Poll::Ready(Err(io::Error::new(kind, "scripted read failure"))),
            Some(ReadStep::Hang) | None => {
                this.reads.push_front(ReadStep::Hang);
                Poll::Pending
            }
        }
    }
}

impl AsyncWrite for ScriptedStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match this.write_mode {
            WriteMode::Accept => {
                this.log.written.lock().unwrap().extend_from_slice(data);
                Poll::Ready(Ok(data.len()))
            }
            WriteMode::Fail(kind) => Poll::Ready(Err(io::Error::new(kind, "scripted write failure"))),
            WriteMode::Stall => Poll::Pending,
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.log.flushes.fetch_add(1, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Reporter that keeps every transport failure for later assertions.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<(Direction, PipeError)>>,
}

impl RecordingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reports(&self) -> Vec<(Direction, PipeError)> {
        self.reports.lock().unwrap().clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, direction: Direction, error: &PipeError) {
        self.reports.lock().unwrap().push((direction, error.clone()));
    }
}

/// A running echo server on an ephemeral loopback port.
pub struct TestServer {
    pub addr: std::net::SocketAddr,
    pub shutdown: Shutdown,
    pub handle: tokio::task::JoinHandle<Result<(), ServerError>>,
}

/// Start an echo server with `config`, overriding the bind address.
pub async fn start_echo_server(mut config: ServerConfig) -> TestServer {
    config.listener.bind_address = "127.0.0.1:0".into();
    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = EchoServer::new(config);
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe(), None));

    TestServer {
        addr,
        shutdown,
        handle,
    }
}
