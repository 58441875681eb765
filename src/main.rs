use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use voxnotes::{
    create_router, AppState, ChunkStore, Config, NatsSummarizer, NatsTranscriber, RecordStore,
    Summarizer, Transcriber,
};

#[derive(Parser, Debug)]
#[command(name = "voxnotes", about = "Offline-first meeting assistant backend")]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(short, long, default_value = "config/voxnotes")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)
        .with_context(|| format!("Failed to load config: {}", args.config))?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let chunk_store = Arc::new(ChunkStore::new(&cfg.storage.chunks_path)?);
    let record_store = Arc::new(RecordStore::new(&cfg.storage.records_path)?);

    let nats_client = async_nats::connect(cfg.nats.url.as_str())
        .await
        .context("Failed to connect to NATS")?;
    info!("Connected to NATS at {}", cfg.nats.url);

    let request_timeout = Duration::from_secs(cfg.nats.request_timeout_secs);
    let transcriber: Arc<dyn Transcriber> = Arc::new(NatsTranscriber::new(
        nats_client.clone(),
        cfg.nats.transcribe_subject.clone(),
        request_timeout,
    ));
    let summarizer: Arc<dyn Summarizer> = Arc::new(NatsSummarizer::new(
        nats_client,
        cfg.nats.summarize_subject.clone(),
        request_timeout,
    ));

    // Background sweep for recordings abandoned mid-capture
    let sweep_store = Arc::clone(&chunk_store);
    let max_age_hours = cfg.recording.max_session_age_hours;
    let sweep_interval = Duration::from_secs(cfg.recording.reclaim_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.tick().await; // first tick completes immediately
        loop {
            ticker.tick().await;
            match sweep_store.reclaim_stale(max_age_hours).await {
                Ok(0) => {}
                Ok(count) => info!("Reclaim sweep removed {} abandoned sessions", count),
                Err(e) => error!("Reclaim sweep failed: {}", e),
            }
        }
    });

    let state = AppState {
        chunk_store,
        record_store,
        transcriber,
        summarizer,
        service_name: cfg.service.name.clone(),
        preprocess_audio: cfg.transcription.preprocess,
        max_session_age_hours: max_age_hours,
    };

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_router(state)).await?;

    Ok(())
}
