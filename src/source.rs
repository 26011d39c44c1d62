//! Signal sources.
//!
//! A [`SignalSource`] produces one multi-channel reading per acquisition
//! tick. Real deployments plug in a device-backed source; [`SyntheticEeg`]
//! provides the simulated stream used for development and tests: four
//! phase-shifted sine/cosine carriers at distinct baseline offsets with a
//! little uniform noise on top.

use crate::error::{AppResult, BrainprintError};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Producer of per-tick channel readings.
#[async_trait]
pub trait SignalSource: Send {
    /// Number of channels this source emits. Fixed for the session.
    fn channel_count(&self) -> usize;

    /// Read one scalar per channel for acquisition tick `seq`.
    ///
    /// A failure here is transient: the acquisition task logs it, skips the
    /// tick, and keeps running.
    async fn read_sample(&mut self, seq: u64) -> AppResult<Vec<f64>>;
}

/// Simulated EEG stream.
///
/// Channel `i` follows a slow carrier (`sin` on even channels, `cos` on odd)
/// at a per-channel frequency, lifted to a per-channel baseline so traces do
/// not overlap when plotted, plus uniform noise in `[-0.2, 0.2]`.
pub struct SyntheticEeg {
    channel_count: usize,
    rng: StdRng,
}

/// Per-channel carrier frequencies (radians per tick), cycled when the
/// channel count exceeds four.
const FREQUENCIES: [f64; 4] = [0.1, 0.15, 0.2, 0.05];

/// Per-channel baseline offsets, cycled like the frequencies.
const OFFSETS: [f64; 4] = [6.0, 4.0, 2.0, 0.0];

const NOISE_AMPLITUDE: f64 = 0.2;

impl SyntheticEeg {
    /// Source with `channel_count` channels and OS-seeded noise.
    pub fn new(channel_count: usize) -> Self {
        Self {
            channel_count,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic variant for tests.
    pub fn with_seed(channel_count: usize, seed: u64) -> Self {
        Self {
            channel_count,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

#[async_trait]
impl SignalSource for SyntheticEeg {
    fn channel_count(&self) -> usize {
        self.channel_count
    }

    async fn read_sample(&mut self, seq: u64) -> AppResult<Vec<f64>> {
        let t = seq as f64;
        let mut channels = Vec::with_capacity(self.channel_count);
        for i in 0..self.channel_count {
            let freq = FREQUENCIES[i % FREQUENCIES.len()];
            let offset = OFFSETS[i % OFFSETS.len()];
            let carrier = if i % 2 == 0 {
                (freq * t).sin()
            } else {
                (freq * t).cos()
            };
            let noise = self.rng.gen_range(-NOISE_AMPLITUDE..=NOISE_AMPLITUDE);
            channels.push(carrier + offset + noise);
        }
        Ok(channels)
    }
}

/// Source that fails every `period`-th tick, for exercising the skip-and-
/// continue path of the acquisition task.
pub struct FlakySource<S> {
    inner: S,
    period: u64,
}

impl<S: SignalSource> FlakySource<S> {
    /// Wrap `inner`, failing whenever `seq % period == 0`.
    pub fn new(inner: S, period: u64) -> Self {
        Self { inner, period }
    }
}

#[async_trait]
impl<S: SignalSource> SignalSource for FlakySource<S> {
    fn channel_count(&self) -> usize {
        self.inner.channel_count()
    }

    async fn read_sample(&mut self, seq: u64) -> AppResult<Vec<f64>> {
        if self.period > 0 && seq % self.period == 0 {
            return Err(BrainprintError::TickIngestion(format!(
                "simulated electrode dropout at tick {seq}"
            )));
        }
        self.inner.read_sample(seq).await
    }
}
