//! # Brainprint Core Library
//!
//! Core library for the `brainprint` biosignal authentication engine. It
//! couples a continuously running acquisition producer, which overwrites a
//! bounded rolling buffer, with an on-demand authentication pipeline that
//! snapshots a consistent trailing window of that buffer and drives it
//! through ordered processing stages to an identity decision. Acquisition
//! is never blocked by a run, and no two runs execute concurrently.
//!
//! ## Crate Structure
//!
//! - **`config`**: Typed settings loaded from TOML files and environment
//!   variables (channel count, buffer capacity, tick interval, capture
//!   window), with semantic validation.
//! - **`error`**: The `BrainprintError` enum for centralized error handling
//!   across the crate.
//! - **`logging`**: Structured tracing setup (env-filtered, pretty/compact/
//!   JSON output).
//! - **`signal`**: The `Sample` type and the concurrent `RollingBuffer`
//!   shared between producer and pipeline.
//! - **`source`**: The `SignalSource` trait plus the synthetic EEG stream
//!   used for development and tests.
//! - **`session`**: Shared session flags (acquisition-active,
//!   run-in-flight) with test-and-set semantics.
//! - **`acquisition`**: The supervised periodic producer task feeding the
//!   buffer and the display broadcast channel.
//! - **`pipeline`**: The run state machine, stage transforms, and the
//!   orchestrator that drives one authentication attempt at a time.
//! - **`classifier`**: The pluggable `ClassifierPort` boundary with a mock
//!   implementation.
//! - **`sink`**: The `ResultSink` observer boundary with log- and
//!   channel-backed implementations.

pub mod acquisition;
pub mod classifier;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod session;
pub mod signal;
pub mod sink;
pub mod source;
