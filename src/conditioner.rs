use log::debug;

use crate::error::Result;
use crate::filter::{bandpass_filter, TransferFunction};
use crate::params::DetectorParams;

/// Band-limits a raw lead and turns it into a rectified derivative.
pub struct SignalConditioner {
    bandpass: TransferFunction,
}

impl SignalConditioner {
    pub fn new(params: &DetectorParams, sample_rate: u32) -> Result<Self> {
        let bandpass = bandpass_filter(params.filter_order, params.low_hz, params.high_hz, sample_rate)?;
        Ok(Self { bandpass })
    }

    pub fn bandpass(&self, lead: &[f64]) -> Result<Vec<f64>> {
        self.bandpass.filtfilt(lead)
    }

    /// Band-pass, first difference, absolute value. The output is one sample
    /// shorter than the input.
    pub fn condition(&self, lead: &[f64]) -> Result<Vec<f64>> {
        let filtered = self.bandpass(lead)?;
        let rectified = rectified_derivative(&filtered);
        debug!("Conditioned lead: {} -> {} samples", lead.len(), rectified.len());
        Ok(rectified)
    }
}

pub fn rectified_derivative(signal: &[f64]) -> Vec<f64> {
    signal.windows(2).map(|w| (w[1] - w[0]).abs()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QrsError;

    #[test]
    fn test_rectified_derivative() {
        assert_eq!(rectified_derivative(&[1.0, 3.0, 2.0, 2.0, -1.0]), vec![2.0, 1.0, 0.0, 3.0]);
        assert!(rectified_derivative(&[5.0]).is_empty());
        assert!(rectified_derivative(&[]).is_empty());
    }

    #[test]
    fn test_condition_length_and_sign() {
        let conditioner = SignalConditioner::new(&DetectorParams::default(), 250).unwrap();
        let lead: Vec<f64> = (0..500).map(|i| (i as f64 * 0.25).sin()).collect();
        let out = conditioner.condition(&lead).unwrap();
        assert_eq!(out.len(), 499);
        assert!(out.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_removes_dc_offset() {
        let conditioner = SignalConditioner::new(&DetectorParams::default(), 250).unwrap();
        let filtered = conditioner.bandpass(&vec![3.0; 1000]).unwrap();
        assert!(filtered.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_propagates_filter_errors() {
        let conditioner = SignalConditioner::new(&DetectorParams::default(), 250).unwrap();
        assert!(matches!(conditioner.condition(&[0.0; 10]), Err(QrsError::SignalTooShort { .. })));
        assert!(SignalConditioner::new(&DetectorParams::default(), 20).is_err());
    }
}
