use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub recording: RecordingConfig,
    pub nats: NatsConfig,
    pub transcription: TranscriptionConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Root directory for in-progress chunked recording sessions
    pub chunks_path: String,
    /// Root directory for finished transcript/summary records
    pub records_path: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordingConfig {
    /// Unfinalized sessions older than this are reclaimed
    pub max_session_age_hours: u64,
    /// How often the background reclaim sweep runs
    pub reclaim_interval_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct NatsConfig {
    pub url: String,
    pub transcribe_subject: String,
    pub summarize_subject: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionConfig {
    /// Ask the STT service to run its audio preprocessing pass
    pub preprocess: bool,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
