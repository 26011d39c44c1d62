//! Authentication pipeline orchestrator.
//!
//! One authentication attempt is a [`PipelineRun`]: a consistent snapshot of
//! the rolling buffer driven through strictly ordered stages
//! (capture → preprocess → extract features → assemble tensor → infer),
//! ending in exactly one terminal state. The orchestrator enforces the
//! concurrency contract: at most one run in flight (test-and-set on the
//! shared [`SessionState`], rejected triggers are not queued), and every
//! stage transition emits exactly one event to the [`ResultSink`] before
//! the stage executes.
//!
//! Runs execute in a supervised tokio task; [`trigger`] returns a
//! [`RunHandle`] the caller can await for the outcome. Stopping acquisition
//! never cancels an in-flight run, and a run has no external cancellation
//! path: it proceeds to a terminal state or collaborator failure.
//!
//! [`trigger`]: PipelineOrchestrator::trigger

pub mod stages;

use crate::classifier::ClassifierPort;
use crate::error::{AppResult, BrainprintError};
use crate::session::SessionState;
use crate::signal::{RollingBuffer, Sample};
use crate::sink::ResultSink;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Lifecycle states of an authentication run.
///
/// A run advances monotonically through the processing stages and ends in
/// exactly one of the two terminal states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// No run in progress.
    Idle,
    /// Snapshotting the trailing buffer window.
    Capturing,
    /// Baseline correction of the captured window.
    Preprocessing,
    /// Per-channel feature computation.
    FeatureExtraction,
    /// Flattening into the model input tensor.
    TensorAssembly,
    /// Classifier collaborator invocation.
    Inferring,
    /// Terminal: identity decision published.
    Succeeded,
    /// Terminal: run failed, error published.
    Failed,
}

impl Stage {
    /// Stable lowercase name used in events and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Capturing => "capturing",
            Stage::Preprocessing => "preprocessing",
            Stage::FeatureExtraction => "feature_extraction",
            Stage::TensorAssembly => "tensor_assembly",
            Stage::Inferring => "inferring",
            Stage::Succeeded => "succeeded",
            Stage::Failed => "failed",
        }
    }

    /// True for `Succeeded` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Succeeded | Stage::Failed)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One authentication attempt: captured window plus stage bookkeeping.
#[derive(Debug)]
pub struct PipelineRun {
    /// Unique run identifier.
    pub run_id: Uuid,
    /// Immutable copy of the buffer window taken at capture time.
    pub window: Vec<Sample>,
    /// Stage currently executing (or terminal state).
    pub stage: Stage,
    /// Entry timestamp per stage, in transition order.
    pub timeline: Vec<(Stage, DateTime<Utc>)>,
}

impl PipelineRun {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            window: Vec::new(),
            stage: Stage::Idle,
            timeline: Vec::new(),
        }
    }

    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        self.timeline.push((stage, Utc::now()));
    }
}

/// Terminal result of a successful run.
#[derive(Clone, Debug)]
pub struct AuthOutcome {
    /// Run identifier.
    pub run_id: Uuid,
    /// Matched identity label.
    pub identity: String,
    /// Match confidence, percent in `[0, 100]`.
    pub confidence: f64,
    /// Number of samples in the captured window.
    pub window_len: usize,
    /// Stage entry timestamps for the whole run.
    pub timeline: Vec<(Stage, DateTime<Utc>)>,
}

/// Handle to an in-flight run task.
#[derive(Debug)]
pub struct RunHandle {
    /// Identifier of the run this handle supervises.
    pub run_id: Uuid,
    task: JoinHandle<AppResult<AuthOutcome>>,
}

impl RunHandle {
    /// Wait for the run to reach a terminal state.
    pub async fn join(self) -> AppResult<AuthOutcome> {
        self.task.await?
    }
}

/// Releases the run-in-flight flag when the run task ends, terminal event
/// or panic alike.
struct RunGuard(Arc<SessionState>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.end_run();
    }
}

/// Drives buffered windows through the staged authentication pipeline.
pub struct PipelineOrchestrator {
    buffer: Arc<RollingBuffer>,
    session: Arc<SessionState>,
    classifier: Arc<dyn ClassifierPort>,
    sink: Arc<dyn ResultSink>,
    window_size: usize,
    stage_latency: Duration,
}

impl PipelineOrchestrator {
    /// Build an orchestrator over the shared buffer and session state.
    ///
    /// `window_size` must be >= 1; callers validate this at configuration
    /// time.
    pub fn new(
        buffer: Arc<RollingBuffer>,
        session: Arc<SessionState>,
        classifier: Arc<dyn ClassifierPort>,
        sink: Arc<dyn ResultSink>,
        window_size: usize,
        stage_latency: Duration,
    ) -> Self {
        Self {
            buffer,
            session,
            classifier,
            sink,
            window_size,
            stage_latency,
        }
    }

    /// Trigger one authentication run.
    ///
    /// Rejected immediately with [`BrainprintError::RunInProgress`] if
    /// another run is in flight; rejected triggers are not queued and leave
    /// no state behind. Otherwise spawns the run task and returns its
    /// handle.
    pub fn trigger(&self) -> AppResult<RunHandle> {
        if !self.session.try_begin_run() {
            return Err(BrainprintError::RunInProgress);
        }
        let guard = RunGuard(Arc::clone(&self.session));

        let run_id = Uuid::new_v4();
        let buffer = Arc::clone(&self.buffer);
        let classifier = Arc::clone(&self.classifier);
        let sink = Arc::clone(&self.sink);
        let window_size = self.window_size;
        let stage_latency = self.stage_latency;

        let task = tokio::spawn(async move {
            let _guard = guard;
            execute_run(run_id, buffer, classifier, sink, window_size, stage_latency).await
        });

        Ok(RunHandle { run_id, task })
    }

    /// Whether a run is currently in flight.
    pub fn run_in_flight(&self) -> bool {
        self.session.run_in_flight()
    }
}

#[instrument(skip_all, fields(%run_id))]
async fn execute_run(
    run_id: Uuid,
    buffer: Arc<RollingBuffer>,
    classifier: Arc<dyn ClassifierPort>,
    sink: Arc<dyn ResultSink>,
    window_size: usize,
    stage_latency: Duration,
) -> AppResult<AuthOutcome> {
    let mut run = PipelineRun::new(run_id);

    // Stage events go out before the stage executes; stages are strictly
    // sequential within the run.
    let enter = |run: &mut PipelineRun, stage: Stage| {
        run.enter(stage);
        debug!(stage = stage.as_str(), "entering stage");
    };

    enter(&mut run, Stage::Capturing);
    sink.on_stage_event(run_id, Stage::Capturing).await;
    stage_pause(stage_latency).await;
    run.window = buffer.snapshot(window_size);
    if run.window.is_empty() {
        return fail(&mut run, &*sink, BrainprintError::InsufficientData).await;
    }

    enter(&mut run, Stage::Preprocessing);
    sink.on_stage_event(run_id, Stage::Preprocessing).await;
    stage_pause(stage_latency).await;
    let preprocessed = stages::preprocess(&run.window);

    enter(&mut run, Stage::FeatureExtraction);
    sink.on_stage_event(run_id, Stage::FeatureExtraction).await;
    stage_pause(stage_latency).await;
    let features = stages::extract_features(&preprocessed);

    enter(&mut run, Stage::TensorAssembly);
    sink.on_stage_event(run_id, Stage::TensorAssembly).await;
    stage_pause(stage_latency).await;
    let tensor = stages::assemble_tensor(&features);

    enter(&mut run, Stage::Inferring);
    sink.on_stage_event(run_id, Stage::Inferring).await;
    stage_pause(stage_latency).await;
    let classification = match classifier.classify(&tensor).await {
        Ok(c) if (0.0..=100.0).contains(&c.confidence) => c,
        Ok(c) => {
            return fail(
                &mut run,
                &*sink,
                BrainprintError::Classification(format!(
                    "confidence {} outside [0, 100]",
                    c.confidence
                )),
            )
            .await;
        }
        Err(e) => return fail(&mut run, &*sink, e).await,
    };

    enter(&mut run, Stage::Succeeded);
    sink.on_result(run_id, &classification.identity, classification.confidence)
        .await;

    Ok(AuthOutcome {
        run_id,
        identity: classification.identity,
        confidence: classification.confidence,
        window_len: run.window.len(),
        timeline: run.timeline,
    })
}

async fn fail(
    run: &mut PipelineRun,
    sink: &dyn ResultSink,
    error: BrainprintError,
) -> AppResult<AuthOutcome> {
    run.enter(Stage::Failed);
    sink.on_error(run.run_id, &error).await;
    Err(error)
}

async fn stage_pause(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{FailingClassifier, MockClassifier};
    use crate::sink::{ChannelSink, PipelineEvent};

    fn filled_buffer(n: u64) -> Arc<RollingBuffer> {
        let buffer = Arc::new(RollingBuffer::new(100));
        for i in 0..n {
            buffer.append(Sample::new(i, vec![i as f64; 4]));
        }
        buffer
    }

    fn orchestrator(
        buffer: Arc<RollingBuffer>,
        classifier: Arc<dyn ClassifierPort>,
    ) -> (PipelineOrchestrator, tokio::sync::mpsc::UnboundedReceiver<PipelineEvent>) {
        let (sink, rx) = ChannelSink::new();
        let orchestrator = PipelineOrchestrator::new(
            buffer,
            Arc::new(SessionState::new()),
            classifier,
            Arc::new(sink),
            100,
            Duration::ZERO,
        );
        (orchestrator, rx)
    }

    #[test]
    fn stage_names_are_stable() {
        assert_eq!(Stage::FeatureExtraction.as_str(), "feature_extraction");
        assert_eq!(Stage::TensorAssembly.to_string(), "tensor_assembly");
        assert!(Stage::Succeeded.is_terminal());
        assert!(!Stage::Inferring.is_terminal());
    }

    #[tokio::test]
    async fn successful_run_records_full_timeline() {
        let classifier = Arc::new(MockClassifier::with_seed("Clarissa M.", 3));
        let (orchestrator, _rx) = orchestrator(filled_buffer(100), classifier);

        let outcome = orchestrator.trigger().unwrap().join().await.unwrap();
        assert_eq!(outcome.window_len, 100);
        assert_eq!(outcome.identity, "Clarissa M.");
        let stages: Vec<Stage> = outcome.timeline.iter().map(|(s, _)| *s).collect();
        assert_eq!(
            stages,
            vec![
                Stage::Capturing,
                Stage::Preprocessing,
                Stage::FeatureExtraction,
                Stage::TensorAssembly,
                Stage::Inferring,
                Stage::Succeeded,
            ]
        );
        // Timestamps never go backwards.
        for pair in outcome.timeline.windows(2) {
            assert!(pair[1].1 >= pair[0].1);
        }
    }

    #[tokio::test]
    async fn flag_is_released_after_failure() {
        let (orchestrator, mut rx) =
            orchestrator(filled_buffer(10), Arc::new(FailingClassifier));

        let err = orchestrator.trigger().unwrap().join().await.unwrap_err();
        assert!(matches!(err, BrainprintError::Classification(_)));
        assert!(!orchestrator.run_in_flight());

        // Terminal error event was the last thing emitted.
        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert!(matches!(last, Some(PipelineEvent::Error { .. })));

        // A new trigger is accepted after the failure.
        let retry = orchestrator.trigger().unwrap();
        retry.join().await.unwrap_err();
    }

    #[tokio::test]
    async fn out_of_range_confidence_is_a_contract_violation() {
        let classifier = Arc::new(MockClassifier::with_confidence_range(
            "Clarissa M.",
            150.0,
            150.0,
        ));
        let (orchestrator, _rx) = orchestrator(filled_buffer(10), classifier);
        let err = orchestrator.trigger().unwrap().join().await.unwrap_err();
        match err {
            BrainprintError::Classification(msg) => assert!(msg.contains("outside")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
