//! Process-wide session state.
//!
//! Tracks whether acquisition is active and whether an authentication run is
//! in flight. Both flags use exclusive test-and-set semantics: the producer
//! and the orchestrator share one `SessionState` by `Arc` instead of
//! mutating ambient globals, and each terminal path releases its flag
//! exactly once.

use std::sync::atomic::{AtomicBool, Ordering};

/// Shared acquisition/run flags for one engine instance.
#[derive(Debug, Default)]
pub struct SessionState {
    acquisition_active: AtomicBool,
    run_in_flight: AtomicBool,
}

impl SessionState {
    /// Fresh state with acquisition stopped and no run in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim the acquisition-active flag. Returns false if
    /// acquisition is already active.
    pub fn try_activate_acquisition(&self) -> bool {
        self.acquisition_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Clear the acquisition-active flag. Idempotent.
    pub fn deactivate_acquisition(&self) {
        self.acquisition_active.store(false, Ordering::Release);
    }

    /// Whether the acquisition task is currently active.
    pub fn acquisition_active(&self) -> bool {
        self.acquisition_active.load(Ordering::Acquire)
    }

    /// Atomically claim the run-in-flight flag. Returns false if another
    /// authentication run is already in flight.
    pub fn try_begin_run(&self) -> bool {
        self.run_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Release the run-in-flight flag after a terminal state.
    pub fn end_run(&self) {
        self.run_in_flight.store(false, Ordering::Release);
    }

    /// Whether an authentication run is currently in flight.
    pub fn run_in_flight(&self) -> bool {
        self.run_in_flight.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn acquisition_flag_is_exclusive() {
        let state = SessionState::new();
        assert!(state.try_activate_acquisition());
        assert!(!state.try_activate_acquisition());
        state.deactivate_acquisition();
        assert!(state.try_activate_acquisition());
    }

    #[test]
    fn deactivate_is_idempotent() {
        let state = SessionState::new();
        state.deactivate_acquisition();
        state.deactivate_acquisition();
        assert!(!state.acquisition_active());
    }

    #[test]
    fn run_flag_is_independent_of_acquisition() {
        let state = SessionState::new();
        assert!(state.try_begin_run());
        assert!(!state.acquisition_active());
        assert!(state.try_activate_acquisition());
        assert!(state.run_in_flight());
        state.end_run();
        assert!(state.acquisition_active());
    }

    #[test]
    fn concurrent_triggers_admit_exactly_one() {
        let state = Arc::new(SessionState::new());
        let winners: usize = (0..8)
            .map(|_| {
                let state = Arc::clone(&state);
                thread::spawn(move || usize::from(state.try_begin_run()))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .sum();
        assert_eq!(winners, 1);
    }
}
