use anyhow::{bail, Context, Result};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, ReadOnlySource};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::get_codecs;
use symphonia::default::get_probe;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use log::{info, debug};

use crate::recording::Recording;

const DELIMITED_EXTENSIONS: [&str; 3] = ["csv", "txt", "tsv"];

/// Loads a recording from delimited text or from an audio container.
///
/// Delimited text carries no sampling rate, so `rate` is required for it. For
/// containers, `rate` overrides the rate stored in the file.
pub fn load_recording<P: AsRef<Path>>(path: P, rate: Option<u32>) -> Result<Recording> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if DELIMITED_EXTENSIONS.contains(&ext.as_str()) {
        let rate = rate.with_context(|| format!("--rate is required for {}", path.display()))?;
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let recording = Recording::parse_delimited(&text, rate)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!("Loaded {} leads x {} points from {}", recording.lead_count(), recording.points(), path.display());
        return Ok(recording);
    }

    let (samples, channels, file_rate) = load_audio(path)?;
    let rate = rate.unwrap_or(file_rate);
    Recording::from_interleaved(&samples, channels, rate)
        .with_context(|| format!("Invalid recording in {}", path.display()))
}

/// Decodes the first audio track of `path`, returning interleaved samples,
/// the channel count and the sample rate.
pub fn load_audio<P: AsRef<Path>>(path: P) -> Result<(Vec<f64>, usize, u32)> {
    let path = path.as_ref();
    info!("Loading ECG container from {}", path.display());

    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    let mss = MediaSourceStream::new(Box::new(ReadOnlySource::new(BufReader::new(file))), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();

    let probed = get_probe()
        .format(&hint, mss, &fmt_opts, &meta_opts)
        .with_context(|| "Failed to probe container format")?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .with_context(|| "No supported tracks found")?;

    let track_id = track.id;
    let codec_params = &track.codec_params;
    let sample_rate = codec_params
        .sample_rate
        .with_context(|| format!("{} does not declare a sample rate", path.display()))?;
    let mut channels = codec_params.channels.map(|c| c.count()).unwrap_or(0);
    info!("Sample rate: {}Hz, channels: {}", sample_rate, channels);

    let dec_opts: DecoderOptions = Default::default();
    let mut decoder = get_codecs()
        .make(codec_params, &dec_opts)
        .with_context(|| "Failed to create decoder")?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::ResetRequired) => {
                debug!("Decoder reset required");
                continue;
            }
            Err(_) => break,
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let duration = decoded.capacity() as u64;

                if duration == 0 {
                    continue;
                }

                let count = spec.channels.count();
                if channels == 0 {
                    channels = count;
                } else if count != channels {
                    bail!("Channel count changed from {} to {} mid-stream", channels, count);
                }

                let mut sample_buf = SampleBuffer::<f64>::new(duration, spec);
                sample_buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(sample_buf.samples());
            }
            Err(symphonia::core::errors::Error::DecodeError(_)) => {
                debug!("Decode error encountered, skipping packet");
                continue;
            }
            Err(symphonia::core::errors::Error::ResetRequired) => {
                debug!("Decoder reset required during decode");
                continue;
            }
            Err(e) => {
                return Err(anyhow::anyhow!("Decode error: {}", e));
            }
        }
    }

    if channels == 0 {
        bail!("{} contains no decodable samples", path.display());
    }
    info!("Loaded {} frames of {} channels", samples.len() / channels, channels);
    Ok((samples, channels, sample_rate))
}
