//! staffline — compile, render and play plain-text music notation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{info, warn};

use staffline::audio::{AudioEngine, AudioSink};
use staffline::config::Config;
use staffline::dsl::{Compiled, Compiler};
use staffline::instrument::{DefaultSource, Registry};
use staffline::playback::{render_offline, LiveSession, RenderSettings};
use staffline::song;

/// Pause between pumps while the output buffer is full.
const PUMP_INTERVAL: Duration = Duration::from_millis(2);

#[derive(Parser)]
#[command(name = "staffline", version)]
#[command(about = "Plain-text multi-track music notation compiler and player")]
struct Cli {
    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (default ~/.staffline/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the events each line compiles to
    Compile {
        file: PathBuf,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the flat text a song document expands to
    Expand { file: PathBuf },
    /// Render to a WAV file
    Render {
        file: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        bpm: Option<f64>,
    },
    /// Play through the default audio device until Ctrl-C
    Play {
        file: PathBuf,
        #[arg(long)]
        bpm: Option<f64>,
        /// Play once and exit instead of looping
        #[arg(long)]
        no_loop: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match &cli.config {
        Some(path) => match Config::load_from(path) {
            Ok(config) => config,
            Err(e) => fail(&e.to_string()),
        },
        None => Config::load(),
    };

    let result = match cli.command {
        Command::Compile { file, json } => compile(&file, json),
        Command::Expand { file } => expand(&file),
        Command::Render { file, output, bpm } => render(&file, &output, bpm, &config),
        Command::Play { file, bpm, no_loop } => play(&file, bpm, !no_loop && config.looping, &config),
    };

    if let Err(e) = result {
        fail(&e);
    }
}

fn fail(message: &str) -> ! {
    eprintln!("staffline: {message}");
    std::process::exit(1);
}

fn read(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))
}

fn load(path: &Path) -> Result<(Compiled, Registry), String> {
    let text = read(path)?;
    let mut registry = Registry::new();
    let compiled = Compiler::compile_source(&text, &mut registry);
    Ok((compiled, registry))
}

/// `--bpm` beats the document's `bpm`, which beats the configuration.
fn tempo(flag: Option<f64>, compiled: &Compiled, config: &Config) -> f64 {
    flag.or(compiled.overrides.bpm).unwrap_or(config.bpm)
}

fn compile(path: &Path, json: bool) -> Result<(), String> {
    let (compiled, _) = load(path)?;
    let composition = &compiled.composition;

    if json {
        let lines: Vec<_> = composition
            .lines
            .iter()
            .enumerate()
            .map(|(index, line)| {
                serde_json::json!({
                    "line": index,
                    "instrument": line.instrument,
                    "beats": line.beats,
                    "invalid_tokens": line.invalid_count(),
                    "events": line.events,
                })
            })
            .collect();
        let doc = serde_json::json!({
            "max_beats": composition.max_beats,
            "lines": lines,
        });
        let out = serde_json::to_string_pretty(&doc).map_err(|e| e.to_string())?;
        println!("{out}");
        return Ok(());
    }

    for (index, line) in composition.lines.iter().enumerate() {
        if line.tokens.is_empty() && line.declaration.is_none() {
            continue;
        }
        if let Some(decl) = &line.declaration {
            println!("{index:>3} {:<8} sample {}", decl.name, decl.url);
            continue;
        }
        println!(
            "{index:>3} {:<8} {} beat(s), {} invalid",
            line.instrument,
            line.beats.as_beats_f64(),
            line.invalid_count()
        );
        for event in &line.events {
            println!(
                "      @{:<6} {:<5} {}{}",
                event.beat.as_beats_f64(),
                event.duration.as_beats_f64(),
                event.notes.join(" "),
                if event.soft { " (soft)" } else { "" }
            );
        }
    }
    println!("total: {} beat(s)", composition.max_beats.as_beats_f64());
    Ok(())
}

fn expand(path: &Path) -> Result<(), String> {
    let text = read(path)?;
    let expansion = song::expand(&text).ok_or("not a song document")?;
    print!("{}", expansion.flat_text);
    if !expansion.flat_text.ends_with('\n') {
        println!();
    }
    Ok(())
}

fn render(path: &Path, output: &Path, bpm: Option<f64>, config: &Config) -> Result<(), String> {
    let (compiled, registry) = load(path)?;
    let bpm = tempo(bpm, &compiled, config);

    let rendered = render_offline(
        &compiled.composition,
        &registry,
        bpm,
        &compiled.overrides.volumes,
        &compiled.overrides.instruments,
        &config.render_settings(),
        &DefaultSource,
    )
    .map_err(|e| e.to_string())?;

    for name in &rendered.failed_channels {
        eprintln!("warning: channel '{name}' was silent: its sample failed to load");
    }
    std::fs::write(output, &rendered.wav)
        .map_err(|e| format!("cannot write {}: {e}", output.display()))?;
    info!("wrote {} ({} frames)", output.display(), rendered.frames);
    Ok(())
}

fn play(path: &Path, bpm: Option<f64>, looping: bool, config: &Config) -> Result<(), String> {
    let (compiled, registry) = load(path)?;
    let bpm = tempo(bpm, &compiled, config);

    let engine = AudioEngine::with_config(config.sample_rate, config.channels)
        .map_err(|e| e.to_string())?;
    let settings = RenderSettings {
        sample_rate: engine.sample_rate(),
        channels: engine.channels(),
        ..config.render_settings()
    };
    let mut session = LiveSession::new(engine, settings);

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        if let Err(e) = ctrlc::set_handler(move || running.store(false, Ordering::SeqCst)) {
            warn!("cannot install Ctrl-C handler: {e}");
        }
    }

    let report = session
        .start(
            &compiled.composition,
            &registry,
            bpm,
            looping,
            &compiled.overrides.volumes,
            &compiled.overrides.instruments,
        )
        .map_err(|e| e.to_string())?;
    for name in &report.failed_channels {
        eprintln!("warning: channel '{name}' is silent: its sample failed to load");
    }
    eprintln!(
        "playing {} beat(s) at {bpm} BPM{}; Ctrl-C to stop",
        report.total_beats.as_beats_f64(),
        if looping { ", looping" } else { "" }
    );

    while running.load(Ordering::SeqCst) {
        match session.pump() {
            Ok(true) => thread::sleep(PUMP_INTERVAL),
            Ok(false) => break,
            Err(e) => {
                let _ = session.stop();
                return Err(e.to_string());
            }
        }
    }

    if !running.load(Ordering::SeqCst) {
        session.stop().map_err(|e| e.to_string())?;
    } else {
        // Let the last blocks reach the device.
        while session.sink().buffered() > 0 && running.load(Ordering::SeqCst) {
            thread::sleep(PUMP_INTERVAL);
        }
    }
    Ok(())
}
