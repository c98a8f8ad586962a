//! seamless-play - gapless command-line player
//!
//! Queues the files given on the command line, plays them back to back
//! without gaps and loops the playlist. Reads single-line commands from
//! stdin while playing:
//!
//! | input          | action                      |
//! |----------------|-----------------------------|
//! | `n`            | next track                  |
//! | `p`            | previous track              |
//! | ` ` / empty    | toggle pause                |
//! | `pause`/`play` | pause / resume              |
//! | `<number>`     | jump to playlist position   |
//! | `q`            | quit                        |

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use seamless_player::audio::{CpalBackend, SymphoniaOpener};
use seamless_player::config::Config;
use seamless_player::{logging, CurrentSong, Player};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};

/// Command-line arguments for seamless-play
#[derive(Parser, Debug)]
#[command(name = "seamless-play")]
#[command(about = "Gapless audio player")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "SEAMLESS_CONFIG")]
    config: Option<PathBuf>,

    /// Output channel count (overrides config)
    #[arg(long, env = "SEAMLESS_CHANNELS")]
    channels: Option<u16>,

    /// Output sample rate in Hz (overrides config)
    #[arg(long, env = "SEAMLESS_SAMPLE_RATE")]
    sample_rate: Option<u32>,

    /// Output device name (overrides config)
    #[arg(long)]
    device: Option<String>,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Print status as JSON lines
    #[arg(long)]
    json: bool,

    /// Status refresh interval in milliseconds
    #[arg(long, default_value = "1000")]
    status_interval_ms: u64,

    /// Audio files to play, in order
    files: Vec<PathBuf>,
}

/// One line of stdin input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Next,
    Prev,
    TogglePause,
    Pause,
    Play,
    Goto(usize),
    Quit,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "" => Some(Command::TogglePause),
            "n" | "next" => Some(Command::Next),
            "p" | "prev" => Some(Command::Prev),
            "pause" => Some(Command::Pause),
            "play" => Some(Command::Play),
            "q" | "quit" => Some(Command::Quit),
            other => other.parse().ok().map(Command::Goto),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(channels) = args.channels {
        config.output.channels = channels;
    }
    if let Some(sample_rate) = args.sample_rate {
        config.output.sample_rate = sample_rate;
    }
    if args.device.is_some() {
        config.output.device = args.device.clone();
    }
    config.validate()?;

    logging::init(&config.logging.level);

    info!(
        "Starting seamless-play {} ({} built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if args.list_devices {
        for name in CpalBackend::list_devices()? {
            println!("{}", name);
        }
        return Ok(());
    }
    if args.files.is_empty() {
        anyhow::bail!("No files given");
    }

    let backend = CpalBackend::new(config.output.device.clone());
    let mut player = Player::with_backends(Arc::new(SymphoniaOpener), Box::new(backend))
        .with_buffer_frames(config.output.buffer_frames);
    player
        .init(config.output.channels, config.output.sample_rate)
        .context("Failed to open audio output")?;

    let mut queued = 0;
    for file in &args.files {
        match player.queue(&file.to_string_lossy()) {
            Ok(()) => queued += 1,
            Err(e) => warn!("Skipping {}: {}", file.display(), e),
        }
    }
    if queued == 0 {
        player.close()?;
        anyhow::bail!("None of the given files could be opened");
    }

    player.play()?;
    run(&player, &args).await?;

    player.close()?;
    info!("Shutdown complete");
    Ok(())
}

/// Serve stdin commands and status output until quit or a shutdown signal
async fn run(player: &Player, args: &Args) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut ticker = tokio::time::interval(Duration::from_millis(args.status_interval_ms.max(1)));
    let mut paused = false;
    let mut last_path: Option<String> = None;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let song = player.current_song()?;
                report_status(song.as_ref(), args.json, &mut last_path)?;
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    // Non-interactive: keep playing until a signal
                    stdin_open = false;
                    continue;
                };
                match Command::parse(&line) {
                    Some(Command::Quit) => break,
                    Some(command) => {
                        if let Err(e) = apply(player, command, &mut paused) {
                            warn!("{:?} failed: {}", command, e);
                        }
                    }
                    None => warn!("Unknown command: {}", line.trim()),
                }
            }
        }
    }
    Ok(())
}

fn apply(player: &Player, command: Command, paused: &mut bool) -> seamless_player::Result<()> {
    match command {
        Command::Next => player.next(),
        Command::Prev => player.prev(),
        Command::Goto(position) => player.goto(position),
        Command::Pause => {
            *paused = true;
            player.pause()
        }
        Command::Play => {
            *paused = false;
            player.play()
        }
        Command::TogglePause => {
            *paused = !*paused;
            if *paused {
                player.pause()
            } else {
                player.play()
            }
        }
        Command::Quit => Ok(()),
    }
}

fn report_status(song: Option<&CurrentSong>, json: bool, last_path: &mut Option<String>) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(&song)?);
        return Ok(());
    }

    let Some(song) = song else {
        return Ok(());
    };
    if last_path.as_deref() != Some(song.path.as_str()) {
        println!("Now playing: {}", song.path);
        *last_path = Some(song.path.clone());
    }
    println!("  {}", format_elapsed(song.elapsed_ms));
    Ok(())
}

/// `m:ss` for elapsed milliseconds
fn format_elapsed(ms: u64) -> String {
    let seconds = ms / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
