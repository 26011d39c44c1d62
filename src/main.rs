//! CLI entry point for brainprint.
//!
//! Headless frontend over the core library:
//! - `stream`: run acquisition for a while and log the live sample stream
//! - `auth`: acquire a warmup window, then run one authentication attempt
//!
//! Both commands wire the synthetic EEG source and the mock classifier;
//! real deployments substitute their own `SignalSource` and
//! `ClassifierPort` implementations.
//!
//! # Usage
//!
//! ```bash
//! brainprint stream --duration 3s
//! brainprint auth --warmup 5.5s --identity "Clarissa M."
//! ```

use anyhow::Result;
use brainprint::acquisition::AcquisitionProducer;
use brainprint::classifier::MockClassifier;
use brainprint::config::Settings;
use brainprint::logging;
use brainprint::pipeline::PipelineOrchestrator;
use brainprint::session::SessionState;
use brainprint::signal::RollingBuffer;
use brainprint::sink::LogSink;
use brainprint::source::SyntheticEeg;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "brainprint")]
#[command(about = "Biosignal acquisition and brainprint authentication", long_about = None)]
struct Cli {
    /// Configuration name (loads config/<name>.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream the synthetic signal and log samples as they arrive
    Stream {
        /// How long to acquire
        #[arg(long, default_value = "3s", value_parser = humantime::parse_duration)]
        duration: Duration,
    },

    /// Acquire a warmup window, then run one authentication attempt
    Auth {
        /// Acquisition time before triggering the pipeline
        #[arg(long, default_value = "5500ms", value_parser = humantime::parse_duration)]
        warmup: Duration,

        /// Identity the mock classifier is enrolled with
        #[arg(long, default_value = "Clarissa M.")]
        identity: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::new(cli.config.as_deref())?;
    logging::init_from_settings(&settings)?;

    match cli.command {
        Commands::Stream { duration } => stream(settings, duration).await,
        Commands::Auth { warmup, identity } => auth(settings, warmup, identity).await,
    }
}

fn build_producer(settings: &Settings) -> (AcquisitionProducer, Arc<SessionState>) {
    let buffer = Arc::new(RollingBuffer::new(settings.acquisition.buffer_capacity));
    let session = Arc::new(SessionState::new());
    let producer = AcquisitionProducer::new(
        settings.acquisition.clone(),
        buffer,
        Arc::clone(&session),
    );
    (producer, session)
}

async fn stream(settings: Settings, duration: Duration) -> Result<()> {
    let (producer, _session) = build_producer(&settings);
    let mut display_rx = producer.subscribe();

    producer
        .start(SyntheticEeg::new(settings.acquisition.channel_count))
        .await?;

    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            sample = display_rx.recv() => {
                if let Ok(sample) = sample {
                    info!(seq = sample.seq, channels = ?sample.channels, "sample");
                }
            }
        }
    }

    producer.stop().await?;
    info!(buffered = producer.buffer().len(), "stream finished");
    Ok(())
}

async fn auth(settings: Settings, warmup: Duration, identity: String) -> Result<()> {
    let (producer, session) = build_producer(&settings);

    info!(?warmup, "acquiring warmup window");
    producer
        .start(SyntheticEeg::new(settings.acquisition.channel_count))
        .await?;
    tokio::time::sleep(warmup).await;

    let orchestrator = PipelineOrchestrator::new(
        producer.buffer(),
        session,
        Arc::new(MockClassifier::new(identity)),
        Arc::new(LogSink),
        settings.window_size(),
        settings.pipeline.stage_latency,
    );

    let outcome = orchestrator.trigger()?.join().await;
    producer.stop().await?;

    let outcome = outcome?;
    println!("ACCESS GRANTED");
    println!("  identity:   {}", outcome.identity.to_uppercase());
    println!("  confidence: {:.2}%", outcome.confidence);
    println!("  window:     {} samples", outcome.window_len);
    Ok(())
}
