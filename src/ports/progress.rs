//! Progress sink port. Where progress notifications are delivered.
//!
//! The core never assumes a transport: a sink may log, draw a progress bar, or forward to a
//! remote client. `notify` is called from fetch loops and heartbeat timers and must not block.

use crate::domain::ProgressEvent;
use tokio::sync::mpsc;
use tracing::info;

pub trait ProgressSink: Send + Sync {
    fn notify(&self, event: ProgressEvent);
}

/// Drops every event.
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn notify(&self, _event: ProgressEvent) {}
}

/// Logs events through `tracing`.
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn notify(&self, event: ProgressEvent) {
        info!(
            progress = event.progress,
            total = event.total,
            token = event.progress_token.as_deref().unwrap_or(""),
            "{}",
            event.message
        );
    }
}

/// Forwards events into an unbounded channel. A closed receiver is ignored.
pub struct ChannelProgressSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }

    /// Convenience constructor returning the sink and its receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl ProgressSink for ChannelProgressSink {
    fn notify(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_forwards_and_tolerates_closed_receiver() {
        let (sink, mut rx) = ChannelProgressSink::channel();
        let event = ProgressEvent {
            progress: 1.0,
            total: 3.0,
            message: "Processing batch 1/3".into(),
            progress_token: None,
        };
        sink.notify(event.clone());
        assert_eq!(rx.try_recv().unwrap(), event);

        drop(rx);
        sink.notify(event);
    }
}
