//! Per-connection transport adapter.
//!
//! # Data Flow
//! ```text
//!                ┌──────────── AdaptedPipeline ────────────┐
//! raw stream ──▶ │ ReadPump  ──flush──▶ Input  channel     │ ──▶ application
//! raw stream ◀── │ WritePump ◀──read─── Output channel     │ ◀── application
//!                └─────────────────────────────────────────┘
//!
//! ReadPump exit:  complete Input writer → close reads  → cancel Output read
//! WritePump exit: complete Output reader → close writes → cancel Input flush
//! ```
//!
//! # Design Decisions
//! - Both pumps run as futures joined inside `run`; neither is spawned
//! - Transport errors become channel completion errors and are handed to an
//!   injected `ErrorReporter`; `run` itself never fails
//! - The transport is borrowed; only its logical sides are signaled closed

mod adapted;
mod pumps;
mod report;
mod signals;

pub use adapted::AdaptedPipeline;
pub use report::{Direction, ErrorReporter, TracingReporter};
pub use signals::{TransportSignals, TransportWatch};

use crate::channel::ChannelOptions;
use crate::config::PipelineConfig;
use crate::duplex::PipeOptions;

/// Default size of the segment ReadPump asks for before each stream read.
pub const DEFAULT_MIN_ALLOC_BUFFER_SIZE: usize = 2048;

/// Settings for one pipeline instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Backpressure for the Input and Output channels.
    pub pipe: PipeOptions,
    /// Minimum writable segment requested for every stream read.
    pub min_alloc_buffer_size: usize,
    /// Flush the transport whenever the Output channel runs dry.
    pub flush_on_idle_read: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            pipe: PipeOptions::default(),
            min_alloc_buffer_size: DEFAULT_MIN_ALLOC_BUFFER_SIZE,
            flush_on_idle_read: true,
        }
    }
}

impl From<&PipelineConfig> for PipelineOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            pipe: PipeOptions {
                input: ChannelOptions {
                    pause_threshold: config.input_pause_threshold,
                    resume_threshold: config.input_resume_threshold,
                },
                output: ChannelOptions {
                    pause_threshold: config.output_pause_threshold,
                    resume_threshold: config.output_resume_threshold,
                },
            },
            min_alloc_buffer_size: config.min_alloc_buffer_size,
            flush_on_idle_read: config.flush_on_idle_read,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_follow_config() {
        let mut config = PipelineConfig::default();
        config.min_alloc_buffer_size = 512;
        config.input_pause_threshold = 100;
        config.input_resume_threshold = 10;
        config.flush_on_idle_read = false;

        let options = PipelineOptions::from(&config);
        assert_eq!(options.min_alloc_buffer_size, 512);
        assert_eq!(options.pipe.input.pause_threshold, 100);
        assert_eq!(options.pipe.input.resume_threshold, 10);
        assert_eq!(options.pipe.output.pause_threshold, config.output_pause_threshold);
        assert!(!options.flush_on_idle_read);
    }
}
