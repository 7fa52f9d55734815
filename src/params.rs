use serde::{Deserialize, Serialize};

use crate::error::{QrsError, Result};

/// Tunable constants of the detection pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorParams {
    /// Lower band-pass edge in Hz.
    pub low_hz: f64,
    /// Upper band-pass edge in Hz.
    pub high_hz: f64,
    /// Order of the Butterworth prototype.
    pub filter_order: usize,
    /// Moving-window integration width.
    pub window_ms: f64,
    /// Minimum distance between two retained peaks.
    pub refractory_ms: f64,
    /// Position of the threshold between the noise and signal means.
    pub threshold_fraction: f64,
    /// Candidates below this fraction of the threshold are always noise.
    pub noise_ratio: f64,
    /// A borderline candidate must be at least this far from the last beat.
    pub min_rr_ms: f64,
    /// A borderline candidate is only a beat if the next candidate is more than
    /// this many mean RR intervals after the last beat.
    pub rr_factor: f64,
    /// Group delay of differentiation and integration, removed from every beat.
    pub delay_ms: f64,
    /// Leads agreeing within this window count as one beat.
    pub consensus_ms: f64,
    pub max_row_corrections: usize,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            low_hz: 5.0,
            high_hz: 15.0,
            filter_order: 2,
            window_ms: 80.0,
            refractory_ms: 200.0,
            threshold_fraction: 0.3125,
            noise_ratio: 0.5,
            min_rr_ms: 360.0,
            rr_factor: 1.5,
            delay_ms: 40.0,
            consensus_ms: 90.0,
            max_row_corrections: 64,
        }
    }
}

impl DetectorParams {
    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("window-ms", self.window_ms),
            ("refractory-ms", self.refractory_ms),
            ("min-rr-ms", self.min_rr_ms),
            ("delay-ms", self.delay_ms),
            ("consensus-ms", self.consensus_ms),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(QrsError::InvalidParams(format!("{} must be a non-negative duration, got {}", name, value)));
            }
        }
        if !(self.low_hz > 0.0 && self.low_hz < self.high_hz) {
            return Err(QrsError::InvalidParams(format!(
                "Band {}-{} Hz is empty",
                self.low_hz, self.high_hz
            )));
        }
        if !(0.0..=1.0).contains(&self.threshold_fraction) {
            return Err(QrsError::InvalidParams(format!(
                "threshold-fraction must be within 0-1, got {}",
                self.threshold_fraction
            )));
        }
        if !(self.noise_ratio > 0.0 && self.noise_ratio <= 1.0) {
            return Err(QrsError::InvalidParams(format!(
                "noise-ratio must be within (0, 1], got {}",
                self.noise_ratio
            )));
        }
        if !(self.rr_factor.is_finite() && self.rr_factor > 0.0) {
            return Err(QrsError::InvalidParams(format!("rr-factor must be positive, got {}", self.rr_factor)));
        }
        if self.max_row_corrections == 0 {
            return Err(QrsError::InvalidParams("max-corrections must be at least 1".to_string()));
        }
        Ok(())
    }
}
