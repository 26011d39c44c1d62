//! Result sinks.
//!
//! A [`ResultSink`] is the observer boundary for one authentication run:
//! one stage event per transition, then exactly one terminal result or
//! error. [`LogSink`] writes the sequence to the tracing log (the headless
//! stand-in for a system-log panel); [`ChannelSink`] forwards typed events
//! over an unbounded channel for tests and interactive frontends. Sinks
//! must not block: the pipeline awaits each notification before entering
//! the next stage.

use crate::error::BrainprintError;
use crate::pipeline::Stage;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

/// One observable event in a run's lifecycle.
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineEvent {
    /// The run entered a processing stage.
    StageEntered {
        /// Run this event belongs to.
        run_id: Uuid,
        /// Stage just entered.
        stage: Stage,
    },
    /// The run succeeded with an identity decision.
    Result {
        /// Run this event belongs to.
        run_id: Uuid,
        /// Matched identity label.
        identity: String,
        /// Match confidence, percent in `[0, 100]`.
        confidence: f64,
    },
    /// The run failed.
    Error {
        /// Run this event belongs to.
        run_id: Uuid,
        /// Machine-readable error kind (see `BrainprintError::kind`).
        kind: String,
        /// Human-readable message.
        message: String,
    },
}

/// Consumer of per-run pipeline events.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Called once per stage transition, before the stage executes.
    async fn on_stage_event(&self, run_id: Uuid, stage: Stage);

    /// Terminal success notification. Exactly one of `on_result` /
    /// `on_error` ends a run's event sequence.
    async fn on_result(&self, run_id: Uuid, identity: &str, confidence: f64);

    /// Terminal failure notification.
    async fn on_error(&self, run_id: Uuid, error: &BrainprintError);
}

/// Sink that logs every event via `tracing`.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl ResultSink for LogSink {
    async fn on_stage_event(&self, run_id: Uuid, stage: Stage) {
        info!(%run_id, stage = stage.as_str(), "pipeline stage entered");
    }

    async fn on_result(&self, run_id: Uuid, identity: &str, confidence: f64) {
        info!(%run_id, identity, confidence, "authentication succeeded");
    }

    async fn on_error(&self, run_id: Uuid, error: &BrainprintError) {
        error!(%run_id, kind = error.kind(), %error, "authentication failed");
    }
}

/// Sink that forwards events over an unbounded channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<PipelineEvent>,
}

impl ChannelSink {
    /// Create a sink plus the receiving end of its event stream.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ResultSink for ChannelSink {
    async fn on_stage_event(&self, run_id: Uuid, stage: Stage) {
        let _ = self.tx.send(PipelineEvent::StageEntered { run_id, stage });
    }

    async fn on_result(&self, run_id: Uuid, identity: &str, confidence: f64) {
        let _ = self.tx.send(PipelineEvent::Result {
            run_id,
            identity: identity.to_string(),
            confidence,
        });
    }

    async fn on_error(&self, run_id: Uuid, error: &BrainprintError) {
        let _ = self.tx.send(PipelineEvent::Error {
            run_id,
            kind: error.kind().to_string(),
            message: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_sink_preserves_event_order() {
        let (sink, mut rx) = ChannelSink::new();
        let run_id = Uuid::new_v4();

        sink.on_stage_event(run_id, Stage::Capturing).await;
        sink.on_stage_event(run_id, Stage::Preprocessing).await;
        sink.on_result(run_id, "Clarissa M.", 97.5).await;

        assert_eq!(
            rx.recv().await.unwrap(),
            PipelineEvent::StageEntered {
                run_id,
                stage: Stage::Capturing
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            PipelineEvent::StageEntered {
                run_id,
                stage: Stage::Preprocessing
            }
        );
        match rx.recv().await.unwrap() {
            PipelineEvent::Result {
                identity,
                confidence,
                ..
            } => {
                assert_eq!(identity, "Clarissa M.");
                assert_eq!(confidence, 97.5);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn channel_sink_maps_error_kind() {
        let (sink, mut rx) = ChannelSink::new();
        let run_id = Uuid::new_v4();
        sink.on_error(run_id, &BrainprintError::InsufficientData)
            .await;
        match rx.recv().await.unwrap() {
            PipelineEvent::Error { kind, .. } => assert_eq!(kind, "insufficient_data"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn channel_sink_survives_dropped_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        // Must not panic or block the pipeline.
        sink.on_stage_event(Uuid::new_v4(), Stage::Inferring).await;
    }
}
