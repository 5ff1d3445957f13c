mod handlers;
mod telegram;
mod types;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reelgrab_core::{
    load_config, metrics, validate_config, FfmpegTranscoder, GalleryDlDownloader,
    GalleryDownloader, LinkPipeline, MediaFetcher, Transcoder, VideoDownloader, YtDlpDownloader,
};

use handlers::UpdateDispatcher;
use telegram::TelegramClient;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Pause before retrying after a failed getUpdates call.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("reelgrab {} starting", VERSION);

    // Determine config path
    let config_path = std::env::var("REELGRAB_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;
    info!("Configuration loaded successfully");

    // Register metrics
    let registry = prometheus::default_registry();
    for metric in metrics::all_metrics() {
        registry
            .register(metric)
            .context("Failed to register metrics")?;
    }

    // Probe external tools. yt-dlp is required; gallery-dl only degrades
    // the fallback path; ffmpeg only degrades transcoding.
    let ytdlp = Arc::new(YtDlpDownloader::new(config.downloader.clone()));
    ytdlp
        .validate()
        .await
        .context("yt-dlp is not usable, check downloader.yt_dlp_path")?;
    info!("yt-dlp found at {:?}", config.downloader.yt_dlp_path);

    let gallerydl = Arc::new(GalleryDlDownloader::new(config.downloader.clone()));
    if let Err(e) = gallerydl.validate().await {
        warn!(
            "gallery-dl is not usable ({}); slideshow links will fail",
            e
        );
    }

    let transcoder: Option<Arc<dyn Transcoder>> = {
        let ffmpeg = FfmpegTranscoder::new(config.transcode.clone());
        match ffmpeg.validate().await {
            Ok(()) => {
                info!("ffmpeg/ffprobe found, transcoding enabled");
                Some(Arc::new(ffmpeg))
            }
            Err(e) => {
                warn!(
                    "ffmpeg/ffprobe not usable ({}); delivering media unprocessed",
                    e
                );
                None
            }
        }
    };

    // Wire up the pipeline
    let fetcher = MediaFetcher::new(ytdlp, gallerydl);
    let client = Arc::new(TelegramClient::new(&config));
    let pipeline = Arc::new(LinkPipeline::new(
        fetcher,
        transcoder,
        Arc::clone(&client) as _,
        &config,
    ));
    let dispatcher = UpdateDispatcher::new(pipeline, Arc::clone(&client), config.bot.target_group_id);

    if let Some(target) = config.bot.target_group_id {
        info!("Group handling restricted to chat {}", target);
    }

    // Long-poll until shutdown
    info!("Starting update polling");
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut offset: i64 = 0;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
            updates = client.get_updates(offset) => match updates {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        dispatcher.dispatch(update).await;
                    }
                }
                Err(e) => {
                    error!("getUpdates failed: {}", e);
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                }
            }
        }
    }

    info!("Bot stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
