use log::debug;

use crate::params::DetectorParams;
use crate::peaks::Candidate;
use crate::rolling::RollingBuffer;
use crate::util::ms_to_samples;

/// Number of beats kept in each rolling statistic, and the number of
/// one-second windows used to seed the signal statistic.
pub const HISTORY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Heartbeat,
    Noise,
}

/// Adaptive-threshold classification of candidate peaks for one lead.
pub struct AdaptiveClassifier {
    threshold_fraction: f64,
    noise_ratio: f64,
    min_rr: f64,
    rr_factor: f64,
    delay: usize,
    signal_peaks: RollingBuffer<HISTORY>,
    noise_peaks: RollingBuffer<HISTORY>,
    rr_intervals: RollingBuffer<HISTORY>,
    // invalidated whenever an amplitude buffer changes
    threshold: Option<f64>,
    beats: Vec<usize>,
}

impl AdaptiveClassifier {
    /// Seeds the statistics from the first eight one-second windows of the
    /// integrated signal.
    pub fn new(integrated: &[f64], sample_rate: u32, params: &DetectorParams) -> Self {
        let second = sample_rate as usize;
        let mut seed = [0.0; HISTORY];
        for (k, slot) in seed.iter_mut().enumerate() {
            let start = (k * second).min(integrated.len());
            let end = ((k + 1) * second).min(integrated.len());
            *slot = integrated[start..end].iter().copied().fold(0.0, f64::max);
        }
        debug!("Seeded signal peaks: {:?}", seed);

        Self {
            threshold_fraction: params.threshold_fraction,
            noise_ratio: params.noise_ratio,
            min_rr: params.min_rr_ms * sample_rate as f64 / 1000.0,
            rr_factor: params.rr_factor,
            delay: ms_to_samples(params.delay_ms, sample_rate),
            signal_peaks: RollingBuffer::from_array(seed),
            noise_peaks: RollingBuffer::filled(0.0),
            rr_intervals: RollingBuffer::filled(1.0),
            threshold: None,
            beats: Vec::new(),
        }
    }

    pub fn threshold(&mut self) -> f64 {
        *self.threshold.get_or_insert_with(|| {
            let noise = self.noise_peaks.mean();
            let signal = self.signal_peaks.mean();
            noise + self.threshold_fraction * (signal - noise)
        })
    }

    pub fn mean_rr(&self) -> f64 {
        self.rr_intervals.mean()
    }

    pub fn beats(&self) -> &[usize] {
        &self.beats
    }

    /// Classifies `candidates` in ascending index order. `end` is the last
    /// sample of the integrated signal and stands in for the candidate after
    /// the final one.
    pub fn classify(&mut self, candidates: &[Candidate], end: usize) {
        for (i, candidate) in candidates.iter().enumerate() {
            let next = candidates.get(i + 1).map_or(end, |c| c.index);
            let decision = self.decide(candidate, next);
            match decision {
                Decision::Heartbeat => self.accept_heartbeat(candidate),
                Decision::Noise => self.accept_noise(candidate),
            }
        }
        let threshold = self.threshold();
        debug!(
            "{} candidates: {} heartbeats, final threshold {:.4e}",
            candidates.len(),
            self.beats.len(),
            threshold
        );
    }

    pub fn decide(&mut self, candidate: &Candidate, next: usize) -> Decision {
        let threshold = self.threshold();
        let ratio = if threshold > 0.0 {
            candidate.amplitude / threshold
        } else if candidate.amplitude > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        if ratio > 1.0 {
            return Decision::Heartbeat;
        }
        if ratio < self.noise_ratio {
            return Decision::Noise;
        }

        // borderline: only a beat if it is late enough and nothing better follows soon
        let last = self.beats.last().copied().unwrap_or(0);
        let since_last = candidate.index.saturating_sub(last) as f64;
        let last_to_next = next.saturating_sub(last) as f64;
        if since_last > self.min_rr && last_to_next > self.rr_factor * self.mean_rr() {
            Decision::Heartbeat
        } else {
            Decision::Noise
        }
    }

    fn accept_heartbeat(&mut self, candidate: &Candidate) {
        if let Some(&previous) = self.beats.last() {
            self.rr_intervals.push((candidate.index - previous) as f64);
        }
        self.beats.push(candidate.index);
        self.signal_peaks.push(candidate.amplitude);
        self.threshold = None;
    }

    fn accept_noise(&mut self, candidate: &Candidate) {
        self.noise_peaks.push(candidate.amplitude);
        self.threshold = None;
    }

    /// Accepted beats shifted back by the pipeline's group delay.
    pub fn into_beats(self) -> Vec<usize> {
        let delay = self.delay;
        self.beats.into_iter().map(|b| b.saturating_sub(delay)).collect()
    }
}

/// Seeds a classifier from `integrated`, classifies `candidates` and returns
/// the delay-compensated beats.
pub fn classify_peaks(integrated: &[f64], candidates: &[Candidate], sample_rate: u32, params: &DetectorParams) -> Vec<usize> {
    if candidates.is_empty() || integrated.is_empty() {
        return Vec::new();
    }
    let mut classifier = AdaptiveClassifier::new(integrated, sample_rate, params);
    classifier.classify(candidates, integrated.len() - 1);
    let beats = classifier.into_beats();
    if beats.is_empty() {
        debug!("All {} candidates classified as noise", candidates.len());
    }
    beats
}
