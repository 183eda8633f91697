use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vesper::voice::{AudioPlayback, AudioSource, MicSource, TextToSpeech};
use vesper::{Assistant, Config, StatusEvent};

/// Vesper - Voice-driven AI assistant
#[derive(Parser)]
#[command(name = "vesper", version, about)]
struct Cli {
    /// Generate endpoint URL
    #[arg(long, env = "VESPER_ENDPOINT")]
    endpoint: Option<String>,

    /// Model identifier
    #[arg(short, long, env = "VESPER_MODEL")]
    model: Option<String>,

    /// Wake word that gates utterances
    #[arg(short, long, env = "VESPER_WAKE_WORD")]
    wake_word: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,vesper=info",
        1 => "info,vesper=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text } => test_tts(&text).await,
        };
    }

    // Config file first, then CLI/env overrides
    let mut config = Config::load()?;
    if let Some(endpoint) = cli.endpoint {
        config.backend.endpoint = endpoint;
    }
    if let Some(model) = cli.model {
        config.backend.model = model;
    }
    if let Some(wake_word) = cli.wake_word {
        config.wake_word = wake_word;
    }
    config.validate()?;

    tracing::info!(
        endpoint = %config.backend.endpoint,
        model = %config.backend.model,
        "starting vesper"
    );

    let wake_word = config.wake_word.clone();
    let handle = Assistant::with_defaults(config)?.spawn();

    // Mirror status notifications onto the terminal
    let mut status = handle.subscribe();
    tokio::spawn(async move {
        loop {
            match status.recv().await {
                Ok(StatusEvent::Status(text)) => println!("  {text}"),
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    handle.start_listening();
    tracing::info!("vesper ready - say \"{wake_word}\"");

    tokio::signal::ctrl_c().await?;
    handle.shutdown().await;

    Ok(())
}

/// Test microphone input
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for up to {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mic = MicSource::new()?;
    let clip = tokio::task::spawn_blocking(move || {
        mic.listen(Duration::from_secs(duration), Duration::from_secs(duration))
    })
    .await??;

    match clip {
        Some(clip) => {
            println!("---");
            println!(
                "Captured {} samples ({:.1}s of audio).",
                clip.samples.len(),
                clip.duration().as_secs_f64()
            );
            println!("Your mic is working!");
        }
        None => {
            println!("---");
            println!("No speech detected. Check:");
            println!("  1. Is your mic plugged in?");
            println!("  2. Run: pactl info | grep 'Default Source'");
            println!("  3. Run: arecord -l (to list devices)");
        }
    }

    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    // Generate 2 seconds of 440Hz sine wave at 24kHz sample rate
    let sample_rate = 24000_f32;
    let frequency = 440.0_f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let num_samples = (sample_rate * 2.0) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    println!("Playing {} samples...", samples.len());
    tokio::task::spawn_blocking(move || AudioPlayback::new()?.play(samples)).await??;

    println!("\nIf you heard the tone, your speakers are working!");
    Ok(())
}

/// Test TTS output
async fn test_tts(text: &str) -> anyhow::Result<()> {
    println!("Testing TTS...");
    println!("Text: {text}\n");

    let config = Config::load()?;
    let tts = TextToSpeech::new(&config.voice)?;

    println!("Synthesizing...");
    let audio = tts.synthesize(text).await?;
    println!("Got {} bytes of audio, playing...", audio.len());

    tokio::task::spawn_blocking(move || AudioPlayback::new()?.play_mp3(&audio)).await??;

    println!("\nIf you heard the speech, TTS is working!");
    Ok(())
}
