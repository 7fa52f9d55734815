use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::error::{QrsError, Result};
use crate::recording::Recording;
use crate::util::ms_to_samples;

/// Width (one standard deviation) of a synthetic QRS complex.
const QRS_SIGMA_MS: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SynthParams {
    pub sample_rate: u32,
    pub seconds: f64,
    pub bpm: f64,
    pub leads: usize,
    /// Standard deviation of the additive Gaussian noise.
    pub noise: f64,
    /// Each RR interval is scaled by a uniform factor in `1 +- rr_jitter`.
    pub rr_jitter: f64,
    /// Standard deviation of each lead's offset from the true beat time.
    pub lead_jitter_ms: f64,
    pub seed: u64,
}

impl Default for SynthParams {
    fn default() -> Self {
        Self {
            sample_rate: 500,
            seconds: 10.0,
            bpm: 72.0,
            leads: 1,
            noise: 0.02,
            rr_jitter: 0.05,
            lead_jitter_ms: 4.0,
            seed: 0,
        }
    }
}

/// A generated recording and the sample index of every beat centre.
#[derive(Debug, Clone)]
pub struct Synthetic {
    pub recording: Recording,
    pub beats: Vec<usize>,
}

impl SynthParams {
    fn validate(&self) -> Result<()> {
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(QrsError::InvalidParams(format!("bpm must be positive, got {}", self.bpm)));
        }
        if !(self.seconds.is_finite() && self.seconds > 0.0) {
            return Err(QrsError::InvalidParams(format!("seconds must be positive, got {}", self.seconds)));
        }
        if self.leads == 0 {
            return Err(QrsError::InvalidParams("at least one lead is required".to_string()));
        }
        if !(0.0..1.0).contains(&self.rr_jitter) {
            return Err(QrsError::InvalidParams(format!("rr-jitter must be within [0, 1), got {}", self.rr_jitter)));
        }
        if !(self.noise >= 0.0 && self.lead_jitter_ms >= 0.0) {
            return Err(QrsError::InvalidParams("noise and lead jitter must be non-negative".to_string()));
        }
        Ok(())
    }
}

/// Gaussian QRS pulses on a noisy baseline, one column per lead.
pub fn synthesize(params: &SynthParams) -> Result<Synthetic> {
    params.validate()?;
    if params.sample_rate == 0 {
        return Err(QrsError::InvalidSamplingRate(0));
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let rate = params.sample_rate as f64;
    let points = (params.seconds * rate) as usize;
    let rr_ms = 60_000.0 / params.bpm;
    let duration_ms = params.seconds * 1000.0;

    let mut centres_ms = Vec::new();
    let mut t = rr_ms / 2.0;
    while t < duration_ms - rr_ms / 4.0 {
        centres_ms.push(t);
        t += rr_ms * (1.0 + rng.gen_range(-params.rr_jitter..=params.rr_jitter));
    }

    let noise = Normal::new(0.0, params.noise).map_err(|e| QrsError::InvalidParams(e.to_string()))?;
    let offset = Normal::new(0.0, params.lead_jitter_ms).map_err(|e| QrsError::InvalidParams(e.to_string()))?;
    let sigma = QRS_SIGMA_MS * rate / 1000.0;
    let reach = 5.0 * sigma;

    let mut leads = Vec::with_capacity(params.leads);
    for lead in 0..params.leads {
        let amplitude = 1.0 - 0.15 * (lead % 4) as f64;
        let mut samples: Vec<f64> = (0..points).map(|_| noise.sample(&mut rng)).collect();
        for &centre in &centres_ms {
            let c = (centre + offset.sample(&mut rng)) * rate / 1000.0;
            let start = (c - reach).max(0.0) as usize;
            let end = ((c + reach) as usize + 1).min(points);
            for (i, sample) in samples.iter_mut().enumerate().take(end).skip(start) {
                let z = (i as f64 - c) / sigma;
                *sample += amplitude * (-0.5 * z * z).exp();
            }
        }
        leads.push(samples);
    }

    let beats = centres_ms.iter().map(|&ms| ms_to_samples(ms, params.sample_rate)).collect::<Vec<_>>();
    debug!("Synthesized {} beats on {} leads", beats.len(), params.leads);
    Ok(Synthetic {
        recording: Recording::from_leads(leads, params.sample_rate)?,
        beats,
    })
}
