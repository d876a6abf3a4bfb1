// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};
use parking_lot::RwLock;

use padboard::activity::ActivityTracker;
use padboard::audio::{self, AudioEngine};
use padboard::pads::PadUpdate;
use padboard::playback::PlaybackScheduler;
use padboard::registry::PadRegistry;
use padboard::{config, input, validate};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A keyboard-driven soundboard."
)]
struct Cli {
    /// The path to the soundboard configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Starts the interactive soundboard.
    Start {},
    /// Lists the available audio output devices.
    Devices {},
    /// Lists the pads in the durable store.
    Pads {},
    /// Uploads an audio clip to a pad.
    Load {
        /// The id of the pad to load the clip onto.
        pad_id: String,
        /// The path of the audio file (WAV or MP3).
        file: PathBuf,
    },
    /// Clears a pad's custom clip, reverting it to synthesis.
    Clear {
        /// The id of the pad to clear.
        pad_id: String,
    },
    /// Sets the trim region of a pad's clip, in seconds.
    Trim {
        /// The id of the pad to trim.
        pad_id: String,
        /// Region start in seconds.
        start: f64,
        /// Region end in seconds.
        end: f64,
    },
    /// Restores the built-in default pad set.
    Reset {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = config::Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Start {} => start(&config).await,
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
            Ok(())
        }
        Commands::Pads {} => {
            let registry = PadRegistry::open(&config.store_dir());
            print_pads(&registry);
            Ok(())
        }
        Commands::Load { pad_id, file } => load(&config, &pad_id, &file),
        Commands::Clear { pad_id } => {
            let mut registry = PadRegistry::open(&config.store_dir());
            registry.update(
                &offline_engine(&config),
                &pad_id,
                PadUpdate {
                    audio_payload: Some(None),
                    audio_file_name: Some(None),
                    trim_start: Some(None),
                    trim_end: Some(None),
                    ..Default::default()
                },
            )?;
            println!("Cleared pad {}.", pad_id);
            Ok(())
        }
        Commands::Trim { pad_id, start, end } => trim(&config, &pad_id, start, end),
        Commands::Reset {} => {
            let mut registry = PadRegistry::open(&config.store_dir());
            registry.reset(&offline_engine(&config))?;
            println!("Pads restored to defaults.");
            Ok(())
        }
    }
}

/// Runs the interactive soundboard until `quit` or end of input.
async fn start(config: &config::Config) -> Result<(), Box<dyn Error>> {
    let device = audio::get_device(config.audio())?;
    let engine = Arc::new(AudioEngine::new(device));
    let registry = Arc::new(RwLock::new(PadRegistry::open(&config.store_dir())));
    let scheduler = Arc::new(PlaybackScheduler::new(
        engine.clone(),
        registry.clone(),
        ActivityTracker::new(),
    ));
    let router = Arc::new(input::InputRouter::new(scheduler, registry.clone()));
    router.attach();

    print_pads(&registry.read());

    let join = input::Driver::new().monitor_events(router);
    join.await??;

    engine.shutdown();
    Ok(())
}

/// Validates and loads a clip file onto a pad.
fn load(config: &config::Config, pad_id: &str, file: &Path) -> Result<(), Box<dyn Error>> {
    let bytes = fs::read(file)?;
    let declared_type = declared_type_for(file);
    validate::validate(&bytes, &declared_type)?;

    let file_name = file
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_string());

    let mut registry = PadRegistry::open(&config.store_dir());
    registry.update(
        &offline_engine(config),
        pad_id,
        PadUpdate {
            audio_payload: Some(Some(bytes)),
            audio_file_name: Some(file_name),
            trim_start: Some(None),
            trim_end: Some(None),
            ..Default::default()
        },
    )?;
    println!("Loaded {} onto pad {}.", file.display(), pad_id);
    Ok(())
}

/// Sets the trim region of a pad's clip after checking it against the
/// decoded clip duration.
fn trim(config: &config::Config, pad_id: &str, start: f64, end: f64) -> Result<(), Box<dyn Error>> {
    let mut registry = PadRegistry::open(&config.store_dir());
    let engine = offline_engine(config);

    let pad = registry
        .lookup(pad_id)
        .ok_or_else(|| format!("no pad with id {}", pad_id))?;
    let payload = pad
        .audio_payload()
        .ok_or_else(|| format!("pad {} has no custom clip to trim", pad_id))?;
    let clip = engine.get_or_decode(pad.id(), payload, pad.audio_file_name())?;

    // The trim handles must keep at least 100ms between them and stay
    // inside the clip.
    let duration = clip.duration_secs();
    if start < 0.0 || start > end - 0.1 || end > duration {
        return Err(format!(
            "invalid trim region [{start}, {end}] for a {duration:.2}s clip"
        )
        .into());
    }

    registry.update(
        &engine,
        pad_id,
        PadUpdate {
            trim_start: Some(Some(start)),
            trim_end: Some(Some(end)),
            ..Default::default()
        },
    )?;
    println!("Pad {} trimmed to [{start}, {end}].", pad_id);
    Ok(())
}

/// An engine on the mock device for commands that mutate the store without
/// playing anything. The output stream never opens.
fn offline_engine(config: &config::Config) -> AudioEngine {
    AudioEngine::new(Arc::new(audio::mock::Device::get("mock", config.audio())))
}

/// Derives the declared MIME type from a file extension, the way a browser
/// would attach one to an upload.
fn declared_type_for(file: &Path) -> String {
    let extension = file
        .extension()
        .and_then(|extension| extension.to_str())
        .unwrap_or_default()
        .to_lowercase();
    match extension.as_str() {
        "mp3" => "audio/mpeg".to_string(),
        "wav" | "wave" => "audio/wav".to_string(),
        other => format!("audio/{}", other),
    }
}

fn print_pads(registry: &PadRegistry) {
    println!("Pads:");
    for pad in registry.pads() {
        let source = match pad.audio_file_name() {
            Some(file_name) => file_name.to_string(),
            None => match pad.audio_payload() {
                Some(_) => "custom clip".to_string(),
                None => "synthesized".to_string(),
            },
        };
        let trim = match (pad.trim_start(), pad.trim_end()) {
            (Some(start), Some(end)) => format!(" trim=[{start}, {end}]"),
            (Some(start), None) => format!(" trim=[{start}, end]"),
            _ => String::new(),
        };
        println!(
            "- [{}] {} ({}) volume={}{}",
            pad.key(),
            pad.name(),
            source,
            pad.volume(),
            trim
        );
    }
}
