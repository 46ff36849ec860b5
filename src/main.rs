//! CLI entry point for the GTFS-RT feature layer sync.
//!
//! Provides subcommands to synchronize one mode's vehicle positions into the
//! hosted feature layer, purge stale rows, or keep doing both on an interval.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gtfs_rt_feature_sync::{
    config::{
        DEFAULT_FEED_BASE_URL, DEFAULT_OAUTH_URL, DEFAULT_TOKEN_EXPIRATION_MINUTES,
        FeatureLayerConfig, SyncConfig,
    },
    error::SyncError,
    fetch::{BasicClient, auth::ApiKey},
    infra::arcgis::ArcGisClient,
    mode::TransitMode,
    sync::SyncOrchestrator,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gtfs_rt_feature_sync")]
#[command(about = "Sync GTFS-RT vehicle positions into a hosted feature layer", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize one mode's vehicle positions into the feature layer
    Sync {
        /// Mode key: buses, ferries, lightrail, nswtrains or sydneytrains
        #[arg(value_name = "MODE")]
        mode: String,
    },
    /// Delete features older than the purge window
    Purge,
    /// Synchronize modes and purge on a fixed interval
    Run {
        /// Modes to synchronize each round (defaults to all)
        #[arg(short, long, value_delimiter = ',')]
        modes: Vec<String>,

        /// Seconds between rounds
        #[arg(short, long, default_value_t = 30)]
        interval: u64,

        /// Number of rounds to run (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 0)]
        iterations: usize,
    },
    /// List supported modes and their feed URLs
    Modes,
}

#[derive(Args)]
struct ConfigArgs {
    /// Base URL of the vehicle-position feeds; the mode key is appended
    #[arg(long, env = "FEED_BASE_URL", default_value = DEFAULT_FEED_BASE_URL, global = true)]
    feed_base_url: String,

    /// TfNSW open data API key
    #[arg(long, env = "FEED_API_KEY", hide_env_values = true, global = true)]
    feed_api_key: Option<String>,

    #[arg(long, env = "ARCGIS_CLIENT_ID", global = true)]
    client_id: Option<String>,

    #[arg(long, env = "ARCGIS_CLIENT_SECRET", hide_env_values = true, global = true)]
    client_secret: Option<String>,

    #[arg(long, env = "ARCGIS_OAUTH_URL", default_value = DEFAULT_OAUTH_URL, global = true)]
    oauth_url: String,

    /// Feature service root URL (without the layer id)
    #[arg(long, env = "ARCGIS_FEATURE_SERVER_URL", global = true)]
    feature_server_url: Option<String>,

    #[arg(long, env = "ARCGIS_LAYER_ID", default_value_t = 0, global = true)]
    layer_id: u32,

    #[arg(long, env = "ARCGIS_TOKEN_EXPIRATION", default_value_t = DEFAULT_TOKEN_EXPIRATION_MINUTES, global = true)]
    token_expiration_minutes: u32,

    /// Directory for per-run staging CSVs
    #[arg(long, env = "STAGING_DIR", global = true)]
    staging_dir: Option<PathBuf>,

    /// Rows whose APIdate is at least this many seconds old are purged
    #[arg(long, env = "PURGE_WINDOW_SECS", default_value_t = 60, global = true)]
    purge_window_secs: u64,

    /// Per-request timeout for all remote calls, in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 30, global = true)]
    http_timeout_secs: u64,

    #[arg(long, env = "HTTP_CONNECT_TIMEOUT_SECS", default_value_t = 10, global = true)]
    http_connect_timeout_secs: u64,
}

impl ConfigArgs {
    fn into_config(self) -> Result<SyncConfig> {
        Ok(SyncConfig {
            feed_base_url: self.feed_base_url,
            feed_api_key: self.feed_api_key.context("FEED_API_KEY must be set")?,
            feature_layer: FeatureLayerConfig {
                client_id: self.client_id.context("ARCGIS_CLIENT_ID must be set")?,
                client_secret: self
                    .client_secret
                    .context("ARCGIS_CLIENT_SECRET must be set")?,
                oauth_url: self.oauth_url,
                feature_server_url: self
                    .feature_server_url
                    .context("ARCGIS_FEATURE_SERVER_URL must be set")?,
                layer_id: self.layer_id,
                token_expiration_minutes: self.token_expiration_minutes,
                timeout: Duration::from_secs(self.http_timeout_secs),
                connect_timeout: Duration::from_secs(self.http_connect_timeout_secs),
            },
            staging_dir: self.staging_dir.unwrap_or_else(std::env::temp_dir),
            purge_window: Duration::from_secs(self.purge_window_secs),
        })
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/gtfs_rt_feature_sync.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gtfs_rt_feature_sync.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    if let Commands::Modes = cli.command {
        for mode in TransitMode::ALL {
            info!(mode = %mode, url = %mode.feed_url(&cli.config.feed_base_url), "Mode");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = cli.config.into_config()?;
    info!(config = ?config, "Configuration loaded");
    let orchestrator = Arc::new(build_orchestrator(&config)?);

    match cli.command {
        Commands::Sync { mode } => {
            let mode = TransitMode::from_key(&mode);
            Ok(report(orchestrator.synchronize(mode).await.map(|r| {
                info!(rows = r.rows, status_url = %r.status.0, "Sync finished");
            })))
        }
        Commands::Purge => Ok(report(orchestrator.purge_stale().await.map(|r| {
            info!(cutoff = r.cutoff, response = %r.response, "Purge finished");
        }))),
        Commands::Run {
            modes,
            interval,
            iterations,
        } => {
            let modes: Vec<TransitMode> = if modes.is_empty() {
                TransitMode::ALL.to_vec()
            } else {
                modes.iter().map(|m| TransitMode::from_key(m)).collect()
            };
            run_loop(orchestrator, modes, interval, iterations).await;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Modes => Ok(ExitCode::SUCCESS),
    }
}

fn build_orchestrator(config: &SyncConfig) -> Result<SyncOrchestrator> {
    let layer = &config.feature_layer;
    let feed_client = ApiKey::tfnsw(
        BasicClient::with_timeouts(layer.timeout, layer.connect_timeout)?,
        &config.feed_api_key,
    )?;
    let arcgis = Arc::new(ArcGisClient::new(layer.clone())?);

    Ok(SyncOrchestrator::new(
        config,
        Arc::new(feed_client),
        arcgis.clone(),
        arcgis,
    ))
}

/// Logs a failed invocation and maps it to its per-kind exit code.
fn report(result: Result<(), SyncError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(kind = e.kind(), error = %e, "Invocation failed");
            ExitCode::from(e.exit_code())
        }
    }
}

/// Synchronizes every mode concurrently, then purges, once per interval.
/// Failures are logged and never end the loop.
#[tracing::instrument(skip(orchestrator, modes), fields(mode_count = modes.len()))]
async fn run_loop(
    orchestrator: Arc<SyncOrchestrator>,
    modes: Vec<TransitMode>,
    interval: u64,
    iterations: usize,
) {
    if iterations == 0 {
        info!(interval, "Running indefinitely. Press Ctrl+C to stop.");
    }

    let mut round = 0;
    loop {
        if iterations > 0 && round >= iterations {
            break;
        }
        round += 1;
        info!(round, "Starting sync round");

        let mut tasks = vec![];
        for mode in &modes {
            let orchestrator = orchestrator.clone();
            let mode = *mode;
            let span = tracing::info_span!("sync_mode", mode = %mode);

            tasks.push(tokio::spawn(
                async move {
                    if let Err(e) = orchestrator.synchronize(mode).await {
                        error!(kind = e.kind(), error = %e, "Sync failed");
                    }
                }
                .instrument(span),
            ));
        }

        for task in tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Sync task panicked");
            }
        }

        if let Err(e) = orchestrator.purge_stale().await {
            error!(kind = e.kind(), error = %e, "Purge failed");
        }

        if iterations == 0 || round < iterations {
            tokio::time::sleep(Duration::from_secs(interval)).await;
        }
    }

    info!(rounds = round, "Finished");
}
