//! Acquisition producer.
//!
//! Runs the periodic acquisition loop: one [`SignalSource`] reading per
//! tick, appended to the shared [`RollingBuffer`] and published to a
//! broadcast channel for display observers. The loop runs in a supervised
//! tokio task with an explicit shutdown signal and a join handle, so a task
//! failure is observable at `stop()` rather than vanishing into a detached
//! thread.
//!
//! Failure semantics: a source error on one tick is logged and the tick is
//! skipped; a single bad reading never terminates the stream.

use crate::config::AcquisitionSettings;
use crate::error::{AppResult, BrainprintError};
use crate::session::SessionState;
use crate::signal::{RollingBuffer, Sample};
use crate::source::SignalSource;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Capacity of the display broadcast channel. Lagging observers lose old
/// samples rather than stalling the acquisition schedule.
const DISPLAY_CHANNEL_CAPACITY: usize = 64;

/// Handle to the running acquisition task.
struct AcquisitionHandle {
    task: JoinHandle<AppResult<()>>,
    shutdown_tx: watch::Sender<bool>,
}

/// Periodic producer feeding the rolling buffer.
pub struct AcquisitionProducer {
    settings: AcquisitionSettings,
    buffer: Arc<RollingBuffer>,
    session: Arc<SessionState>,
    display_tx: broadcast::Sender<Sample>,
    /// Sequence counter shared with the task; survives stop/start so seq
    /// stays monotonic for the whole session.
    next_seq: Arc<AtomicU64>,
    handle: Mutex<Option<AcquisitionHandle>>,
}

impl AcquisitionProducer {
    /// Build a producer over the given buffer and session state.
    pub fn new(
        settings: AcquisitionSettings,
        buffer: Arc<RollingBuffer>,
        session: Arc<SessionState>,
    ) -> Self {
        let (display_tx, _) = broadcast::channel(DISPLAY_CHANNEL_CAPACITY);
        Self {
            settings,
            buffer,
            session,
            display_tx,
            next_seq: Arc::new(AtomicU64::new(0)),
            handle: Mutex::new(None),
        }
    }

    /// Subscribe to the per-tick sample stream (display observer).
    pub fn subscribe(&self) -> broadcast::Receiver<Sample> {
        self.display_tx.subscribe()
    }

    /// Start the periodic acquisition task.
    ///
    /// Fails with [`BrainprintError::AlreadyRunning`] if acquisition is
    /// already active, and with [`BrainprintError::Configuration`] if the
    /// source's channel count does not match the session's: channel count
    /// is fixed for the session lifetime, so the buffer never holds
    /// mixed-width samples across restarts. The spawned task reads one
    /// sample per tick until [`stop`](Self::stop) is called.
    pub async fn start<S>(&self, source: S) -> AppResult<()>
    where
        S: SignalSource + 'static,
    {
        if source.channel_count() != self.settings.channel_count {
            return Err(BrainprintError::Configuration(format!(
                "source emits {} channels, session is configured for {}",
                source.channel_count(),
                self.settings.channel_count
            )));
        }

        // Held across activate-and-spawn so a concurrent stop() cannot
        // observe the active flag without the registered handle.
        let mut handle = self.handle.lock().await;
        if !self.session.try_activate_acquisition() {
            return Err(BrainprintError::AlreadyRunning);
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(acquisition_loop(
            source,
            self.settings.tick_interval,
            Arc::clone(&self.buffer),
            Arc::clone(&self.session),
            self.display_tx.clone(),
            Arc::clone(&self.next_seq),
            shutdown_rx,
        ));

        *handle = Some(AcquisitionHandle { task, shutdown_tx });
        info!(
            tick_interval = ?self.settings.tick_interval,
            channels = self.settings.channel_count,
            "acquisition started"
        );
        Ok(())
    }

    /// Stop the acquisition task and wait for it to exit.
    ///
    /// Idempotent: calling `stop` while stopped is a no-op. On return no
    /// further append will occur until the next `start`.
    pub async fn stop(&self) -> AppResult<()> {
        let Some(handle) = self.handle.lock().await.take() else {
            return Ok(());
        };

        // The task may already be gone if it panicked; the join below
        // surfaces that.
        let _ = handle.shutdown_tx.send(true);
        let result = handle.task.await;
        self.session.deactivate_acquisition();
        result??;
        info!("acquisition stopped");
        Ok(())
    }

    /// Whether the acquisition task is currently active.
    pub fn is_active(&self) -> bool {
        self.session.acquisition_active()
    }

    /// Shared rolling buffer fed by this producer.
    pub fn buffer(&self) -> Arc<RollingBuffer> {
        Arc::clone(&self.buffer)
    }
}

async fn acquisition_loop<S>(
    mut source: S,
    tick_interval: std::time::Duration,
    buffer: Arc<RollingBuffer>,
    session: Arc<SessionState>,
    display_tx: broadcast::Sender<Sample>,
    next_seq: Arc<AtomicU64>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> AppResult<()>
where
    S: SignalSource,
{
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.changed() => {
                debug!("acquisition task observed shutdown signal");
                break;
            }
            _ = interval.tick() => {
                let seq = next_seq.fetch_add(1, Ordering::Relaxed);
                match source.read_sample(seq).await {
                    Ok(channels) => {
                        let sample = Sample::new(seq, channels);
                        buffer.append(sample.clone());
                        // No receivers is fine; display is optional.
                        let _ = display_tx.send(sample);
                    }
                    Err(e) => {
                        warn!(seq, error = %e, "tick ingestion failed, skipping sample");
                    }
                }
            }
        }
    }

    session.deactivate_acquisition();
    Ok(())
}
