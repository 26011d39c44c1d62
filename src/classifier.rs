//! Classifier collaborator boundary.
//!
//! The inference stage hands an assembled [`TensorInput`] to whatever
//! implements [`ClassifierPort`]. A real deployment plugs in a trained
//! model; [`MockClassifier`] simulates one for development and tests,
//! returning its enrolled identity with a high confidence the way the
//! original demo system did.

use crate::error::{AppResult, BrainprintError};
use crate::pipeline::stages::TensorInput;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

/// Identity decision returned by a classifier.
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    /// Matched identity label.
    pub identity: String,
    /// Match confidence, percent in `[0, 100]`.
    pub confidence: f64,
}

/// Pluggable identification model.
#[async_trait]
pub trait ClassifierPort: Send + Sync {
    /// Classify one assembled input window.
    ///
    /// Fails with [`BrainprintError::Classification`] on invalid input or
    /// internal failure. Returned confidence must lie in `[0, 100]`; the
    /// orchestrator rejects out-of-range values as a contract violation.
    async fn classify(&self, input: &TensorInput) -> AppResult<Classification>;
}

/// Simulated classifier with a single enrolled identity.
pub struct MockClassifier {
    enrolled_identity: String,
    confidence_range: (f64, f64),
    rng: Mutex<StdRng>,
}

impl MockClassifier {
    /// Classifier that always matches `identity` with confidence drawn
    /// uniformly from `[92.0, 99.9]`.
    pub fn new(identity: impl Into<String>) -> Self {
        Self::with_confidence_range(identity, 92.0, 99.9)
    }

    /// Classifier with a custom confidence range (inclusive).
    pub fn with_confidence_range(identity: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            enrolled_identity: identity.into(),
            confidence_range: (low, high),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic variant for tests.
    pub fn with_seed(identity: impl Into<String>, seed: u64) -> Self {
        Self {
            enrolled_identity: identity.into(),
            confidence_range: (92.0, 99.9),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

#[async_trait]
impl ClassifierPort for MockClassifier {
    async fn classify(&self, input: &TensorInput) -> AppResult<Classification> {
        if input.is_empty() {
            return Err(BrainprintError::Classification(
                "empty input tensor".into(),
            ));
        }
        if input.data.len() != input.timesteps * input.channels {
            return Err(BrainprintError::Classification(format!(
                "tensor shape mismatch: {}x{} declared, {} values",
                input.timesteps,
                input.channels,
                input.data.len()
            )));
        }

        let (low, high) = self.confidence_range;
        let confidence = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            rng.gen_range(low..=high)
        };
        // Two decimal places, matching how confidences are displayed.
        let confidence = (confidence * 100.0).round() / 100.0;

        Ok(Classification {
            identity: self.enrolled_identity.clone(),
            confidence,
        })
    }
}

/// Classifier that always fails, for exercising the error path.
pub struct FailingClassifier;

#[async_trait]
impl ClassifierPort for FailingClassifier {
    async fn classify(&self, _input: &TensorInput) -> AppResult<Classification> {
        Err(BrainprintError::Classification(
            "model backend unavailable".into(),
        ))
    }
}
