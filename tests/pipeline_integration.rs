//! Integration tests for the authentication pipeline state machine:
//! stage-event ordering, run exclusion, and failure paths.

use async_trait::async_trait;
use brainprint::classifier::{Classification, ClassifierPort, FailingClassifier, MockClassifier};
use brainprint::error::{AppResult, BrainprintError};
use brainprint::pipeline::stages::TensorInput;
use brainprint::pipeline::{PipelineOrchestrator, Stage};
use brainprint::session::SessionState;
use brainprint::signal::{RollingBuffer, Sample};
use brainprint::sink::{ChannelSink, PipelineEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Semaphore;

/// Classifier that blocks until the test grants a permit, and counts calls.
struct GatedClassifier {
    gate: Arc<Semaphore>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ClassifierPort for GatedClassifier {
    async fn classify(&self, _input: &TensorInput) -> AppResult<Classification> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| BrainprintError::Classification(e.to_string()))?;
        Ok(Classification {
            identity: "Clarissa M.".into(),
            confidence: 95.0,
        })
    }
}

/// Classifier that only counts invocations.
struct CountingClassifier {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ClassifierPort for CountingClassifier {
    async fn classify(&self, _input: &TensorInput) -> AppResult<Classification> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Classification {
            identity: "Clarissa M.".into(),
            confidence: 95.0,
        })
    }
}

fn filled_buffer(n: u64) -> Arc<RollingBuffer> {
    let buffer = Arc::new(RollingBuffer::new(100));
    for i in 0..n {
        buffer.append(Sample::new(i, vec![i as f64, 0.0, 1.0, 2.0]));
    }
    buffer
}

fn orchestrator_with(
    buffer: Arc<RollingBuffer>,
    classifier: Arc<dyn ClassifierPort>,
) -> (PipelineOrchestrator, UnboundedReceiver<PipelineEvent>) {
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

#[tokio::test]
async fn successful_run_emits_stage_events_in_order_then_one_result() {
    let classifier = Arc::new(MockClassifier::with_seed("Clarissa M.", 11));
    let (orchestrator, mut rx) = orchestrator_with(filled_buffer(100), classifier);

    let outcome = orchestrator.trigger().unwrap().join().await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(events.len(), 6);

    let expected_stages = [
        Stage::Capturing,
        Stage::Preprocessing,
        Stage::FeatureExtraction,
        Stage::TensorAssembly,
        Stage::Inferring,
    ];
    for (event, expected) in events.iter().zip(expected_stages) {
        match event {
            PipelineEvent::StageEntered { run_id, stage } => {
                assert_eq!(*run_id, outcome.run_id);
                assert_eq!(*stage, expected);
            }
            other => panic!("expected stage event, got {other:?}"),
        }
    }
    match &events[5] {
        PipelineEvent::Result {
            run_id,
            identity,
            confidence,
        } => {
            assert_eq!(*run_id, outcome.run_id);
            assert_eq!(identity, "Clarissa M.");
            assert!((0.0..=100.0).contains(confidence));
        }
        other => panic!("expected terminal result, got {other:?}"),
    }
}

#[tokio::test]
async fn second_trigger_while_in_flight_is_rejected_without_state_change() {
    let gate = Arc::new(Semaphore::new(0));
    let calls = Arc::new(AtomicUsize::new(0));
    let classifier = Arc::new(GatedClassifier {
        gate: Arc::clone(&gate),
        calls: Arc::clone(&calls),
    });
    let (orchestrator, _rx) = orchestrator_with(filled_buffer(50), classifier);

    let first = orchestrator.trigger().unwrap();

    // Wait until the first run is parked inside the classifier.
    while calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    let err = orchestrator.trigger().unwrap_err();
    assert!(matches!(err, BrainprintError::RunInProgress));
    assert!(orchestrator.run_in_flight());

    // Release the first run; it completes normally despite the rejection.
    gate.add_permits(1);
    let outcome = first.join().await.unwrap();
    assert_eq!(outcome.window_len, 50);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!orchestrator.run_in_flight());

    // The rejected trigger left nothing behind; a fresh one is accepted.
    gate.add_permits(1);
    orchestrator.trigger().unwrap().join().await.unwrap();
}

#[tokio::test]
async fn empty_buffer_fails_with_insufficient_data_and_no_classifier_call() {
    let calls = Arc::new(AtomicUsize::new(0));
    let classifier = Arc::new(CountingClassifier {
        calls: Arc::clone(&calls),
    });
    let (orchestrator, mut rx) = orchestrator_with(Arc::new(RollingBuffer::new(100)), classifier);

    let err = orchestrator.trigger().unwrap().join().await.unwrap_err();
    assert!(matches!(err, BrainprintError::InsufficientData));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // One capturing event, then the terminal error; nothing after.
    match rx.try_recv().unwrap() {
        PipelineEvent::StageEntered { stage, .. } => assert_eq!(stage, Stage::Capturing),
        other => panic!("expected capturing event, got {other:?}"),
    }
    match rx.try_recv().unwrap() {
        PipelineEvent::Error { kind, .. } => assert_eq!(kind, "insufficient_data"),
        other => panic!("expected error event, got {other:?}"),
    }
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn classifier_failure_terminates_run_with_error_event() {
    let (orchestrator, mut rx) = orchestrator_with(filled_buffer(30), Arc::new(FailingClassifier));

    let err = orchestrator.trigger().unwrap().join().await.unwrap_err();
    assert!(matches!(err, BrainprintError::Classification(_)));

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    // Five stage events followed by exactly one terminal error.
    assert_eq!(events.len(), 6);
    assert!(matches!(
        &events[4],
        PipelineEvent::StageEntered {
            stage: Stage::Inferring,
            ..
        }
    ));
    match &events[5] {
        PipelineEvent::Error { kind, message, .. } => {
            assert_eq!(kind, "classification");
            assert!(message.contains("model backend unavailable"));
        }
        other => panic!("expected error event, got {other:?}"),
    }
}

#[tokio::test]
async fn window_smaller_than_buffer_captures_trailing_samples() {
    let buffer = filled_buffer(80);
    let classifier: Arc<dyn ClassifierPort> = Arc::new(MockClassifier::with_seed("Clarissa M.", 5));
    let (sink, _rx) = ChannelSink::new();
    let orchestrator = PipelineOrchestrator::new(
        buffer,
        Arc::new(SessionState::new()),
        classifier,
        Arc::new(sink),
        20,
        Duration::ZERO,
    );

    let outcome = orchestrator.trigger().unwrap().join().await.unwrap();
    assert_eq!(outcome.window_len, 20);
}
