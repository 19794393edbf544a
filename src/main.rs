use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use panic_breath::records::{self, JsonFileStore};
use panic_breath::voice::{CpalBackend, SilentBackend, pcm16_to_wav};
use panic_breath::{
    AudioBackend, AudioCueDispatcher, AudioPreferences, AudioSource, BreathPhase, BreathSession,
    Config, Readiness, SessionCommand, SessionOutcome, SessionState, VoiceCueCache,
};

/// How long to let the success cue play before closing
const SUCCESS_LINGER: Duration = Duration::from_secs(5);

/// panic-breath - a guided 60-second breathing session
#[derive(Parser)]
#[command(name = "panic-breath", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (defaults to ~/.config/panic-breath/config.toml)
    #[arg(long, env = "PANIC_BREATH_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Start with audio muted
    #[arg(long, global = true)]
    muted: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a 60-second guided breathing session (default)
    Breathe {
        /// Don't record today as a success when the session completes
        #[arg(long)]
        no_record: bool,
    },
    /// Synthesize one phrase and write it as a WAV file
    Synth {
        /// Text to speak
        text: String,
        /// Output path
        #[arg(short, long, default_value = "phrase.wav")]
        out: PathBuf,
    },
    /// Test speaker output
    TestSpeaker,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_filter(cli.verbose)))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Log filter for a `-v` count
const fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "info,panic_breath=info",
        1 => "info,panic_breath=debug",
        2 => "debug",
        _ => "trace",
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command.unwrap_or(Command::Breathe { no_record: false }) {
        Command::Breathe { no_record } => breathe(&config, cli.muted, no_record).await,
        Command::Synth { text, out } => synth(&config, &text, &out).await,
        Command::TestSpeaker => test_speaker().await,
    }
}

/// Run a session on the speakers, or silently if there are none
#[allow(clippy::future_not_send)]
async fn breathe(config: &Config, muted: bool, no_record: bool) -> anyhow::Result<()> {
    match CpalBackend::new() {
        Ok(backend) => breathe_with(backend, config, muted, no_record).await,
        Err(e) => {
            tracing::warn!(error = %e, "no audio output, running visual-only");
            breathe_with(SilentBackend::new(), config, muted, no_record).await
        }
    }
}

#[allow(clippy::future_not_send)]
async fn breathe_with<B: AudioBackend>(
    mut backend: B,
    config: &Config,
    muted: bool,
    no_record: bool,
) -> anyhow::Result<()> {
    let mut cache = VoiceCueCache::new();
    if let Some(client) = config.synthesis_client() {
        cache.preload(client, config.phrases.clone());
    }

    println!("Preparing voice guidance...");
    match cache
        .wait_ready(&mut backend, config.audio.preload_timeout)
        .await
    {
        Readiness::Voiced => println!("Voice guidance ready."),
        Readiness::Fallback => println!("Voice unavailable, follow the timer."),
    }

    let prefs = AudioPreferences {
        muted: muted || config.audio.muted,
    };
    let mut dispatcher = AudioCueDispatcher::new(backend, cache, prefs);
    if let Some(source) = config.audio.ambient_source() {
        dispatcher = dispatcher.with_ambient(source, config.audio.ambient_volume);
    }

    let mut session = BreathSession::new(dispatcher);
    let render = tokio::spawn(render_states(session.subscribe()));

    let (tx, mut rx) = mpsc::channel(8);
    spawn_controls(tx);

    println!("Type m + Enter to toggle sound, q + Enter to stop.\n");
    let outcome = session.run(&mut rx).await;

    match outcome {
        SessionOutcome::Completed => {
            println!("\nWell done. You made it through.");
            if !no_record {
                record_today(&config.data_dir);
            }
            if session.linger(&mut rx, SUCCESS_LINGER).await {
                println!("Session closed.");
            }
        }
        SessionOutcome::Closed => println!("\nSession closed."),
    }

    session.close();
    session.dispatcher_mut().shutdown();
    render.abort();
    Ok(())
}

/// Forward stdin lines as session commands
///
/// Reads on a plain thread so a pending read never holds up shutdown.
fn spawn_controls(tx: mpsc::Sender<SessionCommand>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let command = match line.trim() {
                "m" | "M" => SessionCommand::ToggleMute,
                "q" | "Q" => SessionCommand::Close,
                _ => continue,
            };
            if tx.blocking_send(command).is_err() {
                break;
            }
        }
    });
}

async fn render_states(mut states: tokio::sync::watch::Receiver<SessionState>) {
    let mut last = None;
    while states.changed().await.is_ok() {
        let state = *states.borrow_and_update();
        if last == Some(state) {
            continue;
        }
        last = Some(state);

        let label = match state.phase {
            BreathPhase::Idle => continue,
            BreathPhase::Inhale => "Breathe in...",
            BreathPhase::Hold => "Hold...",
            BreathPhase::Exhale => "Breathe out...",
            BreathPhase::Success => "Done",
        };
        print!("\r{label:<16}{:>3}s ", state.seconds_remaining);
        let _ = std::io::stdout().flush();
    }
}

fn record_today(data_dir: &Path) {
    let today = chrono::Local::now().date_naive();
    let result =
        JsonFileStore::open(data_dir).and_then(|mut store| records::record_success(&mut store, today));
    if let Err(e) = result {
        tracing::warn!(error = %e, "failed to record success");
    }
}

/// Synthesize a single phrase to a WAV file
async fn synth(config: &Config, text: &str, out: &Path) -> anyhow::Result<()> {
    let client = config
        .synthesis_client()
        .context("voice synthesis needs GEMINI_API_KEY")?;

    let wav = client
        .request_clip(text)
        .await
        .context("voice synthesis failed after retries")?;
    anyhow::ensure!(!wav.is_empty(), "service returned malformed audio");

    tokio::fs::write(out, &wav)
        .await
        .with_context(|| format!("failed to write {}", out.display()))?;
    println!("Wrote {} bytes to {}", wav.len(), out.display());
    Ok(())
}

/// Test speaker output with a one-second tone
#[allow(clippy::future_not_send)]
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");

    let mut backend = CpalBackend::new()?;
    let rate = backend.sample_rate();

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    let tone = (0..rate).map(|i| {
        let t = i as f32 / rate as f32;
        ((2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.3 * f32::from(i16::MAX)) as i16
    });
    let wav = pcm16_to_wav(tone, rate)?;

    let handle = backend.acquire(AudioSource::Wav(wav))?;
    backend.play(handle)?;
    tokio::time::sleep(Duration::from_millis(1200)).await;
    backend.release(handle);

    println!("Done.");
    Ok(())
}
