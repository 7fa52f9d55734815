use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::process;
use qrsd::args::{Cli, Commands};
use qrsd::audio;
use qrsd::cache::{cache_path, DetectionCache};
use qrsd::config::QrsConfig;
use qrsd::leads::LeadSelection;
use qrsd::synth::{synthesize, SynthParams};
use qrsd::util::sample_to_time;
use qrsd::QrsDetector;

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        log::error!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Detect { input, rate, leads, config, no_cache } => {
            detect(&input, rate, &leads, config.as_deref(), no_cache)
        }
        Commands::Synth { output, rate, seconds, bpm, leads, noise, seed } => {
            let params = SynthParams { sample_rate: rate, seconds, bpm, leads, noise, seed, ..Default::default() };
            let synth = synthesize(&params).context("Failed to synthesize recording")?;
            std::fs::write(&output, synth.recording.to_delimited())
                .with_context(|| format!("Failed to write {}", output.display()))?;
            log::info!("Wrote {} beats on {} leads to {}", synth.beats.len(), leads, output.display());
            Ok(())
        }
    }
}

fn detect(input: &Path, rate: Option<u32>, selection: &LeadSelection, config: Option<&Path>, no_cache: bool) -> Result<()> {
    let config = QrsConfig::discover(config)?;
    let params = config.params()?;

    let threads = config.threads();
    if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure the worker pool")?;
    }

    let recording = audio::load_recording(input, rate)
        .with_context(|| format!("Failed to load recording from {}", input.display()))?;
    let sample_rate = recording.sample_rate();
    let leads = selection.resolve(recording.lead_count())?;
    let use_cache = config.cache_enabled() && !no_cache;

    let cached = if use_cache {
        DetectionCache::lookup(input, &params, sample_rate, &leads)
    } else {
        None
    };

    let beats = match cached {
        Some(beats) => beats,
        None => {
            let detector = QrsDetector::with_params(recording, params.clone())?;
            let beats = match leads.as_slice() {
                [lead] => detector.detect(*lead)?,
                _ => detector.detect_leads(&leads)?,
            };
            if use_cache {
                store_cache(input, params, sample_rate, leads, beats.clone());
            }
            beats
        }
    };

    for beat in beats {
        println!("{}\t{}", beat, sample_to_time(beat, sample_rate));
    }
    Ok(())
}

fn store_cache(input: &Path, params: qrsd::DetectorParams, sample_rate: u32, leads: Vec<usize>, beats: Vec<usize>) {
    let stored = std::fs::metadata(input)
        .context("Failed to stat input")
        .and_then(|meta| {
            DetectionCache { params, sample_rate, leads, source_len: meta.len(), beats }.store(cache_path(input))
        });
    if let Err(e) = stored {
        log::warn!("Could not write detection cache: {:#}", e);
    }
}
