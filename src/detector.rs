use log::{debug, info, warn};
use rayon::prelude::*;

use crate::classifier::classify_peaks;
use crate::conditioner::{rectified_derivative, SignalConditioner};
use crate::error::Result;
use crate::integrator::integrate;
use crate::params::DetectorParams;
use crate::peaks::{extract_peaks, Candidate};
use crate::recording::Recording;
use crate::reconcile::{Reconciler, Reconciliation};

/// Every intermediate stage of detection on one lead.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadTrace {
    pub lead: usize,
    pub filtered: Vec<f64>,
    pub rectified: Vec<f64>,
    pub integrated: Vec<f64>,
    pub candidates: Vec<Candidate>,
    pub beats: Vec<usize>,
}

/// QRS detection over a validated recording.
pub struct QrsDetector {
    recording: Recording,
    params: DetectorParams,
    conditioner: SignalConditioner,
}

impl QrsDetector {
    pub fn new(recording: Recording) -> Result<Self> {
        Self::with_params(recording, DetectorParams::default())
    }

    pub fn with_params(recording: Recording, params: DetectorParams) -> Result<Self> {
        params.validate()?;
        let conditioner = SignalConditioner::new(&params, recording.sample_rate())?;
        Ok(Self { recording, params, conditioner })
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    pub fn trace(&self, lead: usize) -> Result<LeadTrace> {
        let raw = self.recording.lead(lead)?;
        let rate = self.recording.sample_rate();

        let filtered = self.conditioner.bandpass(raw)?;
        let rectified = rectified_derivative(&filtered);
        let integrated = integrate(&rectified, self.params.window_ms, rate);
        let candidates = extract_peaks(&integrated, self.params.refractory_ms, rate);
        let beats = classify_peaks(&integrated, &candidates, rate, &self.params);

        if beats.is_empty() {
            warn!("No heartbeats detected on lead {}", lead);
        }
        debug!("Lead {}: {} candidates, {} heartbeats", lead, candidates.len(), beats.len());
        Ok(LeadTrace { lead, filtered, rectified, integrated, candidates, beats })
    }

    /// Heartbeat onsets of a single lead.
    pub fn detect(&self, lead: usize) -> Result<Vec<usize>> {
        Ok(self.trace(lead)?.beats)
    }

    /// Runs detection on `leads` (all leads when empty) in parallel and
    /// reconciles the results into one consensus sequence.
    pub fn reconcile_leads(&self, leads: &[usize]) -> Result<Reconciliation> {
        let all: Vec<usize>;
        let leads = if leads.is_empty() {
            all = (0..self.recording.lead_count()).collect();
            &all
        } else {
            leads
        };

        let per_lead = leads
            .par_iter()
            .map(|&lead| self.detect(lead))
            .collect::<Result<Vec<_>>>()?;
        debug!("Detections per lead: {:?}", per_lead.iter().map(Vec::len).collect::<Vec<_>>());

        let result = Reconciler::new(self.recording.sample_rate(), &self.params).reconcile(&per_lead)?;
        info!(
            "Detected {} heartbeats across {} leads in {:.1}s of ECG",
            result.beats.len(),
            leads.len(),
            self.recording.duration_secs()
        );
        Ok(result)
    }

    pub fn detect_leads(&self, leads: &[usize]) -> Result<Vec<usize>> {
        Ok(self.reconcile_leads(leads)?.beats)
    }
}
