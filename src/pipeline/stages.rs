//! Pure stage transforms for the authentication pipeline.
//!
//! Each function maps one stage representation to the next. None of them
//! touch shared state or suspend; the orchestrator owns ordering, events,
//! and failure handling. The math is deliberately lightweight (baseline
//! correction and summary statistics) since the real discriminative work
//! belongs to the classifier collaborator.

use crate::signal::Sample;
use serde::{Deserialize, Serialize};

/// Captured window after baseline correction.
#[derive(Clone, Debug, PartialEq)]
pub struct PreprocessedWindow {
    /// Per-timestep rows, one scalar per channel, acquisition order.
    pub series: Vec<Vec<f64>>,
    /// Per-channel means removed from the raw window.
    pub baselines: Vec<f64>,
}

/// Summary statistics for one channel over the window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    /// Mean of the corrected signal (approximately zero after preprocess).
    pub mean: f64,
    /// Root mean square amplitude.
    pub rms: f64,
    /// Max minus min over the window.
    pub peak_to_peak: f64,
}

/// Feature-extraction output: the corrected series plus per-channel stats.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureMatrix {
    /// Corrected per-timestep rows, carried through for the classifier.
    pub series: Vec<Vec<f64>>,
    /// One summary row per channel.
    pub channel_stats: Vec<ChannelStats>,
}

/// Model-ready input: a batch of one, time-major flattened.
#[derive(Clone, Debug, PartialEq)]
pub struct TensorInput {
    /// Number of timesteps in the window.
    pub timesteps: usize,
    /// Number of channels per timestep.
    pub channels: usize,
    /// Row-major `[timesteps * channels]` values.
    pub data: Vec<f64>,
}

impl TensorInput {
    /// True when the tensor carries no data.
    pub fn is_empty(&self) -> bool {
        self.timesteps == 0 || self.channels == 0
    }
}

/// Remove the per-channel mean from the captured window.
pub fn preprocess(window: &[Sample]) -> PreprocessedWindow {
    let channels = window.first().map_or(0, |s| s.channels.len());
    let mut baselines = vec![0.0; channels];
    for sample in window {
        for (acc, value) in baselines.iter_mut().zip(&sample.channels) {
            *acc += value;
        }
    }
    let n = window.len().max(1) as f64;
    for baseline in &mut baselines {
        *baseline /= n;
    }

    let series = window
        .iter()
        .map(|sample| {
            sample
                .channels
                .iter()
                .zip(&baselines)
                .map(|(value, baseline)| value - baseline)
                .collect()
        })
        .collect();

    PreprocessedWindow { series, baselines }
}

/// Compute per-channel summary statistics over the corrected series.
pub fn extract_features(window: &PreprocessedWindow) -> FeatureMatrix {
    let channels = window.series.first().map_or(0, Vec::len);
    let n = window.series.len().max(1) as f64;

    let channel_stats = (0..channels)
        .map(|ch| {
            let mut sum = 0.0;
            let mut sum_sq = 0.0;
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for row in &window.series {
                let v = row[ch];
                sum += v;
                sum_sq += v * v;
                min = min.min(v);
                max = max.max(v);
            }
            ChannelStats {
                mean: sum / n,
                rms: (sum_sq / n).sqrt(),
                peak_to_peak: if window.series.is_empty() {
                    0.0
                } else {
                    max - min
                },
            }
        })
        .collect();

    FeatureMatrix {
        series: window.series.clone(),
        channel_stats,
    }
}

/// Flatten the feature series into a batch-of-one, time-major tensor.
pub fn assemble_tensor(features: &FeatureMatrix) -> TensorInput {
    let timesteps = features.series.len();
    let channels = features.series.first().map_or(0, Vec::len);
    let mut data = Vec::with_capacity(timesteps * channels);
    for row in &features.series {
        data.extend_from_slice(row);
    }
    TensorInput {
        timesteps,
        channels,
        data,
    }
}
