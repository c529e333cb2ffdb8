//! Destinations for emitted observations.

use tokio::sync::mpsc;

use crate::observation::Observation;

/// Receives emitted observations. Fire-and-forget: nothing is returned and
/// the caller never waits for delivery.
pub trait RecordSink: Send + Sync {
    fn emit(&self, topic: &str, observation: Observation);
}

/// A record as handed to a [`ChannelSink`]
#[derive(Debug, Clone, PartialEq)]
pub struct Emitted {
    pub topic: String,
    pub observation: Observation,
}

/// Forwards observations over an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Emitted>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Emitted>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl RecordSink for ChannelSink {
    fn emit(&self, topic: &str, observation: Observation) {
        let record = Emitted {
            topic: topic.to_string(),
            observation,
        };
        if self.tx.send(record).is_err() {
            tracing::warn!("Observation dropped on '{}': receiver closed", topic);
        }
    }
}

/// Writes observations to the log as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl RecordSink for LogSink {
    fn emit(&self, topic: &str, observation: Observation) {
        match serde_json::to_string(&observation) {
            Ok(json) => tracing::info!(topic = topic, "{}", json),
            Err(e) => tracing::warn!("Failed to serialize observation for '{}': {}", topic, e),
        }
    }
}
