use anyhow::Result;
use clap::Parser;
use shelfscan::config::{AppConfig, CliConfig, FileConfig};
use shelfscan::metadata::OpenLibraryClient;
use shelfscan::pacing::MinIntervalPacer;
use shelfscan::server::{run_server, ServerState};
use shelfscan::vision::{VisionError, VisionExtractor};
use shelfscan::SqliteLibraryStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite catalog database file.
    #[clap(long, default_value = "./data/shelfscan.db")]
    pub db_path: PathBuf,

    /// Directory where scanned shelf photographs are kept.
    #[clap(long, default_value = "./uploads")]
    pub upload_dir: PathBuf,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 8000)]
    pub port: u16,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Minimum interval between upstream calls while scanning, milliseconds.
    #[clap(long, default_value_t = 300)]
    pub pace_ms: u64,

    /// Use a local Ollama instance for vision extraction.
    #[clap(long, default_value_t = false)]
    pub use_ollama: bool,

    /// Path to a TOML config file. File values override CLI values.
    #[clap(long)]
    pub config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        db_path: cli_args.db_path,
        upload_dir: cli_args.upload_dir,
        port: cli_args.port,
        frontend_dir_path: cli_args.frontend_dir_path,
        pace_ms: cli_args.pace_ms,
        use_ollama: cli_args.use_ollama,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Opening catalog database at {:?}...", config.db_path);
    let store = Arc::new(SqliteLibraryStore::new(&config.db_path)?);

    let extractor = match VisionExtractor::from_settings(&config.vision) {
        Ok(extractor) => Some(Arc::new(extractor)),
        Err(VisionError::NotConfigured) => {
            warn!("No vision backend configured; scan requests will be rejected");
            None
        }
        Err(e) => return Err(e.into()),
    };

    let state = ServerState {
        store,
        extractor,
        metadata: Arc::new(OpenLibraryClient::default()),
        pacer: Arc::new(MinIntervalPacer::new(Duration::from_millis(config.pace_ms))),
        upload_dir: config.upload_dir.clone(),
    };

    run_server(state, config.port, config.frontend_dir_path).await
}
