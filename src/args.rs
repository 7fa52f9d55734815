use crate::leads::LeadSelection;
use crate::util::rate_parser;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "QRS complex detection for multi-lead ECG recordings.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the sample index and time of every detected heartbeat
    Detect {
        /// Delimited text (.csv, .txt, .tsv) or an audio container
        input: PathBuf,
        /// Sampling rate, e.g. 500 or 500Hz (required for delimited text)
        #[arg(short, long, value_parser = rate_parser)]
        rate: Option<u32>,
        /// `all`, lead indices (0,2) or lead names (II,V5)
        #[arg(short, long, default_value = "all")]
        leads: LeadSelection,
        /// KDL config file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Ignore and do not write the detection cache
        #[arg(long)]
        no_cache: bool,
    },
    /// Write a synthetic ECG recording as delimited text
    Synth {
        output: PathBuf,
        #[arg(short, long, default_value = "500", value_parser = rate_parser)]
        rate: u32,
        #[arg(short, long, default_value_t = 10.0)]
        seconds: f64,
        #[arg(short, long, default_value_t = 72.0)]
        bpm: f64,
        #[arg(short, long, default_value_t = 1)]
        leads: usize,
        /// Standard deviation of the additive noise
        #[arg(short, long, default_value_t = 0.02)]
        noise: f64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}
