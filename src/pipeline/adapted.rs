//! Orchestrates both pumps for one connection.

use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

use super::pumps::{read_pump, write_pump, PumpContext};
use super::report::{ErrorReporter, TracingReporter};
use super::signals::{TransportSignals, TransportWatch};
use super::PipelineOptions;
use crate::channel::ChannelHandle;
use crate::duplex::{DisposeHandle, DuplexHalf, DuplexPipe};

/// Adapts a raw duplex stream into a pair of backpressured channels.
///
/// Built once per connection. The application takes its view with
/// [`application`](Self::application); the owner of the transport then calls
/// [`run`](Self::run) once, lending it the stream until both pumps finish.
pub struct AdaptedPipeline {
    pipe: DuplexPipe,
    options: PipelineOptions,
    reporter: Arc<dyn ErrorReporter>,
    signals: TransportSignals,
}

impl AdaptedPipeline {
    pub fn new(options: PipelineOptions, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            pipe: DuplexPipe::new(&options.pipe),
            options,
            reporter,
            signals: TransportSignals::new(),
        }
    }

    /// Pipeline that reports transport failures through `tracing`.
    pub fn with_tracing(options: PipelineOptions) -> Self {
        Self::new(options, Arc::new(TracingReporter))
    }

    /// The application-facing view. Returns `None` after the first call.
    pub fn application(&mut self) -> Option<DuplexHalf> {
        self.pipe.application()
    }

    /// Half-close notifications for the transport owner.
    pub fn transport_watch(&self) -> TransportWatch {
        self.signals.watch()
    }

    pub fn input(&self) -> &ChannelHandle {
        self.pipe.input()
    }

    pub fn output(&self) -> &ChannelHandle {
        self.pipe.output()
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Pump bytes between `stream` and the channels until both directions end.
    ///
    /// Never fails: transport errors are recorded as channel completion
    /// errors and passed to the reporter. A second call returns immediately.
    pub async fn run<S>(&mut self, stream: S)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let Some(adapter) = self.pipe.adapter() else {
            tracing::warn!("Pipeline already ran, ignoring");
            return;
        };
        let (output_reader, input_writer) = adapter.into_parts();
        let input = input_writer.handle();
        let output = output_reader.handle();

        let (stream_reader, stream_writer) = tokio::io::split(stream);
        let ctx = PumpContext {
            options: &self.options,
            reporter: self.reporter.as_ref(),
            signals: &self.signals,
        };

        tracing::debug!(
            min_alloc = self.options.min_alloc_buffer_size,
            input_bound = self.options.pipe.input.pause_threshold,
            output_bound = self.options.pipe.output.pause_threshold,
            "Pipeline running"
        );

        tokio::join!(
            read_pump(stream_reader, input_writer, output, &ctx),
            write_pump(stream_writer, output_reader, input, &ctx),
        );

        tracing::debug!("Pipeline finished");
    }

    /// Complete Input's reader and Output's writer. Idempotent; also on drop.
    pub fn dispose(&self) {
        self.pipe.dispose();
    }

    /// Disposer usable while [`run`](Self::run) holds the pipeline.
    pub fn dispose_handle(&self) -> DisposeHandle {
        self.pipe.dispose_handle()
    }

    pub fn is_disposed(&self) -> bool {
        self.pipe.is_disposed()
    }
}

impl std::fmt::Debug for AdaptedPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptedPipeline")
            .field("pipe", &self.pipe)
            .field("options", &self.options)
            .finish()
    }
}
