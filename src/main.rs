use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use depth_watch::config::{AbnormalVolumeRule, FeedConfig, SessionConfig};
use depth_watch::feed::{self, ReplayReader, SessionRunner, SnapshotBuffer, StopReason};
use depth_watch::orderbook::analytics::{AnalysisSession, SessionOutput};
use depth_watch::report::{self, ReportGenerator};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "depth-watch")]
#[command(about = "Spread widening and fake wall detection over order book snapshots")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a stored JSON-lines feed
    Replay {
        /// Feed file (one snapshot or delta record per line)
        file: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Analyse a live JSON-lines feed from stdin until EOF, Ctrl-C or --duration
    Stream {
        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Snapshots buffered before the oldest is dropped
        #[arg(long)]
        buffer_capacity: Option<usize>,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Trading pair shown in logs and the report
    #[arg(long, default_value = "BTCUSDT")]
    symbol: String,

    /// JSON session configuration (otherwise DEPTH_WATCH_* variables)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Spread above which a widening episode opens
    #[arg(long)]
    spread_threshold: Option<Decimal>,

    /// Spread at or below which an episode closes
    #[arg(long)]
    recovery_threshold: Option<Decimal>,

    /// Levels per side considered by the detectors
    #[arg(long)]
    depth: Option<usize>,

    /// Rolling baseline window (snapshots)
    #[arg(long)]
    baseline_window: Option<usize>,

    /// Z-score or multiplier for abnormal volume
    #[arg(long)]
    k_factor: Option<f64>,

    /// Abnormal volume rule: z_score or multiplier
    #[arg(long)]
    abnormal_rule: Option<AbnormalVolumeRule>,

    /// Quantity a level must exceed to raise a disappearance event
    #[arg(long)]
    min_significant_qty: Option<Decimal>,

    /// Quantity a level must exceed to raise an abnormal volume event
    #[arg(long)]
    min_wall_qty: Option<Decimal>,

    /// Write one JSON charting row per event to this file
    #[arg(long)]
    events_out: Option<PathBuf>,

    /// Write the markdown report to this file instead of stdout
    #[arg(long)]
    report_out: Option<PathBuf>,
}

impl CommonArgs {
    /// Base configuration (file or environment) with flags applied on top
    fn session_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => SessionConfig::from_env().context("Invalid DEPTH_WATCH_* environment")?,
        };

        if let Some(spread) = self.spread_threshold {
            // Keep "no hysteresis" when only the opening threshold is given
            if self.recovery_threshold.is_none()
                && config.recovery_threshold == config.spread_threshold
            {
                config.recovery_threshold = spread;
            }
            config.spread_threshold = spread;
        }
        if let Some(recovery) = self.recovery_threshold {
            config.recovery_threshold = recovery;
        }
        if let Some(depth) = self.depth {
            config.depth = depth;
        }
        if let Some(window) = self.baseline_window {
            config.baseline_window = window;
        }
        if let Some(k) = self.k_factor {
            config.k_factor = k;
        }
        if let Some(rule) = self.abnormal_rule {
            config.abnormal_rule = rule;
        }
        if let Some(qty) = self.min_significant_qty {
            config.min_significant_qty = qty;
        }
        if let Some(qty) = self.min_wall_qty {
            config.min_wall_qty = qty;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging
    // Always write to stderr: stdout carries the report
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    match cli.command {
        Commands::Replay { file, common } => run_replay(file, common).await,
        Commands::Stream {
            duration,
            buffer_capacity,
            common,
        } => run_stream(duration, buffer_capacity, common).await,
    }
}

/// Replay a stored feed file
async fn run_replay(file: PathBuf, common: CommonArgs) -> Result<()> {
    let config = common.session_config()?;
    tracing::info!("Replaying {} for {}", file.display(), common.symbol);

    let replay = feed::replay_file(&file, &common.symbol, config)
        .await
        .with_context(|| format!("Failed to replay {}", file.display()))?;

    tracing::info!(
        records = replay.records,
        skipped_lines = replay.skipped_lines,
        "Replay finished"
    );

    write_outputs(&replay.output, &common).await
}

/// Analyse a live stdin feed through the bounded buffer
async fn run_stream(
    duration: Option<u64>,
    buffer_capacity: Option<usize>,
    common: CommonArgs,
) -> Result<()> {
    let config = common.session_config()?;

    let mut feed_config = FeedConfig::from_env().context("Invalid DEPTH_WATCH_* environment")?;
    if let Some(capacity) = buffer_capacity {
        feed_config.buffer_capacity = capacity;
    }
    if let Some(secs) = duration {
        feed_config.max_duration = (secs > 0).then(|| Duration::from_secs(secs));
    }
    feed_config.validate()?;

    let depth = config.depth;
    let session = AnalysisSession::new(config)?;
    let buffer = SnapshotBuffer::new(feed_config.buffer_capacity);
    let stop = CancellationToken::new();

    // Spawn shutdown signal handler
    let signal_stop = stop.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received shutdown signal (Ctrl+C)");
                signal_stop.cancel();
            }
            Err(err) => {
                tracing::error!("Failed to listen for shutdown signal: {}", err);
            }
        }
    });

    let reader = ReplayReader::stdin(&common.symbol, depth);
    let producer = tokio::spawn(feed::pump(reader, buffer.clone(), stop.clone()));

    tracing::info!(
        symbol = %common.symbol,
        buffer_capacity = feed_config.buffer_capacity,
        max_duration_secs = feed_config.max_duration.map(|d| d.as_secs()),
        "Streaming snapshots from stdin"
    );

    let (output, reason) = SessionRunner::new(session)
        .run(buffer, stop.clone(), feed_config.max_duration)
        .await;

    write_outputs(&output, &common).await?;

    if reason == StopReason::FeedClosed {
        match producer.await {
            Ok(Ok(pushed)) => tracing::debug!(pushed, "Feed producer joined"),
            Ok(Err(e)) => return Err(e).context("Failed to read feed from stdin"),
            Err(e) => return Err(e).context("Feed producer task failed"),
        }
        return Ok(());
    }

    // A blocked stdin read would hold the runtime open on shutdown
    stop.cancel();
    std::process::exit(0);
}

/// Write charting rows and the markdown report
async fn write_outputs(output: &SessionOutput, common: &CommonArgs) -> Result<()> {
    let stats = &output.statistics;
    tracing::info!(
        healthy = stats.healthy_snapshots,
        crossed = stats.crossed_snapshots,
        malformed = stats.malformed_snapshots,
        episodes = stats.total_episodes(),
        wall_events = stats.wall_events(),
        "Session summary"
    );

    if let Some(path) = &common.events_out {
        let rows = report::event_rows(&output.events);
        let jsonl = report::to_json_lines(&rows)?;
        tokio::fs::write(path, jsonl)
            .await
            .with_context(|| format!("Failed to write events to {}", path.display()))?;
        tracing::info!("Wrote {} event rows to {}", rows.len(), path.display());
    }

    let generated_at = chrono::Utc::now().timestamp_millis();
    let report = ReportGenerator::default().generate(output, &common.symbol, generated_at);

    match &common.report_out {
        Some(path) => {
            tokio::fs::write(path, &report.markdown_content)
                .await
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            tracing::info!("Wrote report to {}", path.display());
        }
        None => print!("{}", report.markdown_content),
    }

    Ok(())
}
