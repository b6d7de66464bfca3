//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the adapter server.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, connection limits).
    pub listener: ListenerConfig,

    /// Per-connection pipeline settings.
    pub pipeline: PipelineConfig,

    /// Graceful shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:7000").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// How long a connection may keep reading after its write side closed.
    pub linger_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:7000".to_string(),
            max_connections: 10_000,
            linger_secs: 5,
        }
    }
}

/// Per-connection adapter settings.
///
/// A pause threshold of 0 disables backpressure for that direction.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum buffer requested for each transport read.
    pub min_alloc_buffer_size: usize,

    /// Inbound bytes buffered before the read side stops pulling from the socket.
    pub input_pause_threshold: usize,

    /// Inbound occupancy below which reading resumes. Defaults to the pause threshold.
    pub input_resume_threshold: usize,

    /// Outbound bytes buffered before application flushes suspend.
    pub output_pause_threshold: usize,

    /// Outbound occupancy below which application flushes resume. Defaults to the pause threshold.
    pub output_resume_threshold: usize,

    /// Flush the transport whenever outbound data runs dry.
    pub flush_on_idle_read: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_alloc_buffer_size: 2048,
            input_pause_threshold: 64 * 1024,
            input_resume_threshold: 64 * 1024,
            output_pause_threshold: 64 * 1024,
            output_resume_threshold: 64 * 1024,
            flush_on_idle_read: true,
        }
    }
}

/// Graceful shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Time allowed for open connections to finish after a shutdown signal.
    pub drain_timeout_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, for development.
    #[default]
    Pretty,
    /// One JSON object per line, for production.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            [pipeline]
            input_pause_threshold = 0

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline.input_pause_threshold, 0);
        assert_eq!(config.pipeline.min_alloc_buffer_size, 2048);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.listener.max_connections, 10_000);
    }

    #[test]
    fn default_resume_matches_the_bound() {
        let pipeline = PipelineConfig::default();
        assert_eq!(pipeline.input_resume_threshold, pipeline.input_pause_threshold);
        assert_eq!(pipeline.output_resume_threshold, pipeline.output_pause_threshold);
    }
}
