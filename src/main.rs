use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use filmstrip::events::{EventPayload, EventSubscriber};
use filmstrip::player::{MediaPlayer, SimulatedMedia, SimulatedPlayer};
use filmstrip::scrubber::timeline;
use filmstrip::utils::format_timestamp;
use filmstrip::workers::ThumbnailBatchGenerator;
use filmstrip::{Config, ScrollUpdate, SessionHandle, spawn_session};

#[derive(Parser)]
#[command(name = "filmstrip", version, about = "Headless filmstrip scrubbing demo")]
struct Cli {
    /// Config file to use instead of the one in the user config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a file, scrub to a few positions, then play for a while
    Scrub {
        /// Path or file:// URL of the media
        source: String,
        /// Duration the simulated decoder reports for the file
        #[arg(long, default_value_t = 60.0)]
        duration: f64,
        /// Scrubber positions to drag to, between 0 and 1
        #[arg(long, value_delimiter = ',', default_values_t = [0.25, 0.5, 0.75])]
        positions: Vec<f64>,
        /// Seconds to play after scrubbing
        #[arg(long, default_value_t = 2.0)]
        play_secs: f64,
    },
    /// Extract the filmstrip thumbnails into PNG files
    Thumbnails {
        source: String,
        #[arg(long, default_value_t = 60.0)]
        duration: f64,
        #[arg(long)]
        out_dir: PathBuf,
    },
    /// Print the elapsed time readout for a number of seconds
    Format { seconds: f64 },
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    info!("Starting filmstrip");

    match cli.command {
        Command::Scrub {
            source,
            duration,
            positions,
            play_secs,
        } => scrub(&config, &source, duration, &positions, play_secs).await,
        Command::Thumbnails {
            source,
            duration,
            out_dir,
        } => thumbnails(&config, &source, duration, out_dir).await,
        Command::Format { seconds } => {
            println!("{}", format_timestamp(seconds));
            Ok(())
        }
    }
}

async fn scrub(
    config: &Config,
    source: &str,
    duration: f64,
    positions: &[f64],
    play_secs: f64,
) -> Result<()> {
    let player = Arc::new(SimulatedPlayer::new(SimulatedMedia::new(duration)));
    let (handle, task) = spawn_session(player, config)?;
    let printer = tokio::spawn(print_events(handle.subscribe()));

    let asset = handle
        .load_asset(source)
        .await
        .with_context(|| format!("Failed to load {}", source))?;
    wait_for_thumbnails(&handle).await?;

    let loaded = handle.snapshot().await?;
    let sample_count = loaded.displayed_thumbnails.len() + loaded.failed_thumbnails.len();
    let content_length = timeline::content_length(sample_count, config.thumbnails.cell_width);
    let center_inset = config.thumbnails.cell_width * 2.0;

    for &ratio in positions {
        // A drag is a burst of ticks ending at the target
        for step in 1..=10 {
            let partial = ratio * step as f64 / 10.0;
            handle.scroll(ScrollUpdate {
                content_offset: timeline::offset_from_ratio(partial, center_inset, content_length),
                center_inset,
                content_length,
                user_driven: true,
            })?;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;

        let snapshot = handle.snapshot().await?;
        println!(
            "scrubbed to {:.2} -> {} (seeks issued so far: {})",
            ratio, snapshot.time_label, snapshot.seeks_issued
        );
    }

    handle.play().await?;
    tokio::time::sleep(Duration::from_secs_f64(play_secs.max(0.0))).await;
    handle.pause().await?;

    let snapshot = handle.snapshot().await?;
    println!(
        "{} of {}, status {:?}",
        snapshot.time_label,
        format_timestamp(asset.duration_secs),
        snapshot.status
    );

    handle.teardown().await?;
    task.await?;
    printer.abort();
    Ok(())
}

async fn wait_for_thumbnails(handle: &SessionHandle) -> Result<()> {
    loop {
        if handle.snapshot().await?.thumbnails_complete {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn print_events(mut events: EventSubscriber) {
    while let Ok(event) = events.recv().await {
        match event.payload {
            EventPayload::AssetLoaded {
                duration_secs,
                sample_count,
                content_length,
            } => println!(
                "asset loaded: {:.2}s, {} cells, {:.0} points wide",
                duration_secs, sample_count, content_length
            ),
            EventPayload::LoadFailed(e) => println!("load failed: {}", e),
            EventPayload::ThumbnailsAppended(thumbnails) => {
                let indices: Vec<usize> = thumbnails.iter().map(|t| t.index).collect();
                println!("thumbnails appended: {:?}", indices);
            }
            EventPayload::ThumbnailError { index, error } => {
                println!("thumbnail {} failed: {}", index, error)
            }
            EventPayload::ThumbnailBatchComplete {
                displayed, failed, ..
            } => println!("filmstrip ready: {} shown, {} failed", displayed, failed),
            EventPayload::ControlsVisibilityChanged(visible) => {
                println!("controls {}", if visible { "shown" } else { "hidden" })
            }
            EventPayload::PlayPauseIconChanged(icon) => println!("button shows {:?}", icon),
            EventPayload::StatusChanged(status) => println!("status {:?}", status),
            EventPayload::SeekError(e) => println!("seek error: {}", e),
            EventPayload::Diagnostic(message) => println!("diagnostic: {}", message),
            EventPayload::TimeLabelUpdate(_)
            | EventPayload::ScrubberOffsetUpdate(_)
            | EventPayload::NeedleOffsetUpdate(_) => {}
        }
    }
}

async fn thumbnails(config: &Config, source: &str, duration: f64, out_dir: PathBuf) -> Result<()> {
    let player = SimulatedPlayer::new(SimulatedMedia::new(duration)).with_frame_size(
        config.thumbnails.cell_width as u32,
        config.thumbnails.cell_height as u32,
    );
    let asset = player
        .load_asset(source)
        .await
        .with_context(|| format!("Failed to load {}", source))?;

    let generator = ThumbnailBatchGenerator::new(
        config.playback.capture_interval_secs,
        config.thumbnails.max_concurrent_extractions,
    )?;
    let strip = generator
        .generate(Arc::new(player), asset.duration_secs)
        .await;

    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    for thumbnail in strip.displayed() {
        let path = out_dir.join(format!("thumb_{:03}.png", thumbnail.index));
        thumbnail
            .image
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    for index in strip.failed_indices() {
        warn!("Thumbnail {} could not be extracted", index);
    }

    println!(
        "wrote {} thumbnails to {}",
        strip.displayed().len(),
        out_dir.display()
    );
    Ok(())
}
