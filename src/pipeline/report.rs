//! Error reporting capability injected into each pipeline.

use std::fmt;
use std::io;

use crate::error::PipeError;
use crate::observability::metrics;

/// Which pump an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Stream → Input (ReadPump).
    Inbound,
    /// Output → stream (WritePump).
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives transport failures captured by the pumps.
///
/// Called at most once per pump, after the failure has been recorded on the
/// channel and before the pump signals shutdown to its peer.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, direction: Direction, error: &PipeError);
}

/// Reports through `tracing` and the transport error counter.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, direction: Direction, error: &PipeError) {
        metrics::record_transport_error(direction);
        if is_peer_abort(error) {
            tracing::debug!(direction = %direction, error = %error, "Connection dropped by peer");
        } else {
            tracing::warn!(direction = %direction, error = %error, "Transport failure");
        }
    }
}

/// Resets and broken pipes are routine on the internet.
fn is_peer_abort(error: &PipeError) -> bool {
    matches!(
        error.io_kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted | io::ErrorKind::BrokenPipe
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_aborts_are_recognised() {
        let reset = PipeError::transport_read(io::Error::from(io::ErrorKind::ConnectionReset));
        let other = PipeError::transport_write(io::Error::from(io::ErrorKind::Other));
        assert!(is_peer_abort(&reset));
        assert!(!is_peer_abort(&other));
    }

    #[test]
    fn direction_labels() {
        assert_eq!(Direction::Inbound.to_string(), "inbound");
        assert_eq!(Direction::Outbound.as_str(), "outbound");
    }
}
