//! `ffmpeg-transform`: runs the ffmpeg transform stage on one file pair.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use transform_core::{
    load_config, load_config_from_env, metrics::register_metrics, transform::TracingStatusSink,
    validate_config, ChannelStatusSink, Config, FfmpegTranscoder, FfmpegTransform, FilePair,
    FileRef, LoggingConfig, StatusSink, StatusUpdate,
};

/// Transcode one media file with ffmpeg.
#[derive(Debug, Parser)]
#[command(name = "ffmpeg-transform", version, about)]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "TRANSFORM_CONFIG", default_value = "transform.toml")]
    config: PathBuf,

    /// ffmpeg executable, overriding `task.command`
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Print Prometheus metrics after the run
    #[arg(long)]
    metrics: bool,

    /// Source media file
    input: PathBuf,

    /// Destination file
    output: PathBuf,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run(Args::parse()).await {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = read_config(&args.config)?;
    init_tracing(&config.logging);

    if let Some(ffmpeg) = args.ffmpeg {
        config.task.command = Some(ffmpeg);
    }
    validate_config(&config).context("Configuration validation failed")?;

    let registry = Registry::new();
    register_metrics(&registry).context("Failed to register metrics")?;

    let (sink, updates) = ChannelStatusSink::new();
    let drain = tokio::spawn(drain_status(updates));

    let input = FileRef::from_path(&args.input);
    let output = FileRef::from_path(&args.output);

    let result = {
        let mut stage = FfmpegTransform::new(
            config.task,
            Arc::new(FfmpegTranscoder::new(config.transcoder)),
            Arc::new(sink),
        );
        match stage.prepare(std::slice::from_ref(&input)).await {
            Ok(()) => stage.process([FilePair::new(input, output)]).await,
            Err(e) => Err(e),
        }
    };

    // The stage owned the only sender, so the drain ends once it is dropped.
    drain.await.context("Status drain task failed")?;

    if args.metrics {
        print_metrics(&registry)?;
    }

    result.with_context(|| format!("Failed to transform {}", args.input.display()))?;
    info!(output = %args.output.display(), "Transform complete");
    Ok(())
}

/// Loads `path`, or the defaults plus environment overrides when it is absent.
fn read_config(path: &Path) -> Result<Config> {
    if path.exists() {
        return load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path));
    }
    load_config_from_env().context("Failed to load config from environment")
}

/// Logs go to stderr so stdout stays free for `--metrics`.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(logging.json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with(
            (!logging.json)
                .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
        .init();
}

/// Logs status updates from the stage until the sink is dropped.
async fn drain_status(mut updates: mpsc::UnboundedReceiver<StatusUpdate>) {
    let log = TracingStatusSink;
    while let Some(update) = updates.recv().await {
        match update {
            StatusUpdate::Info { key, value } => log.set_info(&key, value),
            StatusUpdate::Log { level, message } => log.log(level, &message),
        }
    }
}

fn print_metrics(registry: &Registry) -> Result<()> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    print!("{}", String::from_utf8_lossy(&buffer));
    Ok(())
}
