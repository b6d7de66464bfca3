//! Half-close notifications for the owner of the raw transport.

use tokio::sync::watch;

/// Sender side, owned by the pipeline. Each side flips to closed once.
#[derive(Debug)]
pub struct TransportSignals {
    reads: watch::Sender<bool>,
    writes: watch::Sender<bool>,
}

impl TransportSignals {
    pub fn new() -> Self {
        let (reads, _) = watch::channel(false);
        let (writes, _) = watch::channel(false);
        Self { reads, writes }
    }

    /// Subscribe to both sides.
    pub fn watch(&self) -> TransportWatch {
        TransportWatch {
            reads: self.reads.subscribe(),
            writes: self.writes.subscribe(),
        }
    }

    /// No further reads will be issued on the transport.
    pub(crate) fn close_reads(&self) {
        self.reads.send_replace(true);
    }

    /// No further writes will be issued on the transport.
    pub(crate) fn close_writes(&self) {
        self.writes.send_replace(true);
    }
}

impl Default for TransportSignals {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver side, held by whoever owns the transport.
#[derive(Debug, Clone)]
pub struct TransportWatch {
    reads: watch::Receiver<bool>,
    writes: watch::Receiver<bool>,
}

impl TransportWatch {
    pub fn is_reads_closed(&self) -> bool {
        *self.reads.borrow()
    }

    pub fn is_writes_closed(&self) -> bool {
        *self.writes.borrow()
    }

    /// Resolve once the pipeline stops reading from the transport.
    pub async fn reads_closed(&mut self) {
        // The sender only drops together with the pipeline; treat that as closed too.
        let _ = self.reads.wait_for(|closed| *closed).await;
    }

    /// Resolve once the pipeline stops writing to the transport.
    pub async fn writes_closed(&mut self) {
        let _ = self.writes.wait_for(|closed| *closed).await;
    }
}
