pub mod args;
pub mod audio;
pub mod cache;
pub mod classifier;
pub mod conditioner;
pub mod config;
pub mod detector;
pub mod error;
pub mod filter;
pub mod integrator;
pub mod leads;
pub mod params;
pub mod peaks;
pub mod reconcile;
pub mod recording;
pub mod rolling;
pub mod synth;
pub mod util;

pub use detector::{LeadTrace, QrsDetector};
pub use error::{QrsError, Result};
pub use leads::LeadSelection;
pub use params::DetectorParams;
pub use reconcile::{PeakMatrix, Reconciliation, Reconciler};
pub use recording::Recording;
