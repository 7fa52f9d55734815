use log::debug;

use crate::util::ms_to_samples;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub index: usize,
    pub amplitude: f64,
}

/// Indices of samples strictly greater than both neighbours.
pub fn local_maxima(signal: &[f64]) -> Vec<usize> {
    signal
        .windows(3)
        .enumerate()
        .filter(|(_, w)| w[0] < w[1] && w[1] > w[2])
        .map(|(i, _)| i + 1)
        .collect()
}

/// Local maxima of `signal`, thinned so that retained peaks are more than
/// `refractory_ms` apart.
///
/// Maxima are scanned in order against a running candidate. A maximum within
/// the refractory distance replaces the candidate only if it is strictly
/// larger; one beyond it commits the candidate and starts a new one. The last
/// candidate is committed at the end. Flat or monotonic input yields nothing.
pub fn extract_peaks(signal: &[f64], refractory_ms: f64, sample_rate: u32) -> Vec<Candidate> {
    let maxima = local_maxima(signal);
    let refractory = ms_to_samples(refractory_ms, sample_rate);

    let mut iter = maxima.iter().map(|&index| Candidate { index, amplitude: signal[index] });
    let Some(mut candidate) = iter.next() else {
        debug!("No local maxima in {} samples", signal.len());
        return Vec::new();
    };

    let mut unique = Vec::new();
    for peak in iter {
        if peak.index - candidate.index <= refractory {
            if peak.amplitude > candidate.amplitude {
                candidate = peak;
            }
        } else {
            unique.push(candidate);
            candidate = peak;
        }
    }
    unique.push(candidate);

    debug!("{} local maxima collapsed to {} peaks", maxima.len(), unique.len());
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_local_maxima() {
        assert_eq!(local_maxima(&[0.0, 1.0, 0.0, 2.0, 2.0, 0.0, 3.0, 1.0]), vec![1, 6]);
        assert!(local_maxima(&[1.0, 2.0]).is_empty());
    }

    #[test]
    fn test_nearby_peaks_keep_larger() {
        let rate = 250;
        let mut signal = vec![0.0; 200];
        signal[20] = 1.0;
        signal[20 + ms_to_samples(150.0, rate)] = 2.0;
        let peaks = extract_peaks(&signal, 200.0, rate);
        assert_eq!(peaks, vec![Candidate { index: 57, amplitude: 2.0 }]);

        // an equal later peak does not replace the candidate
        signal[57] = 1.0;
        assert_eq!(extract_peaks(&signal, 200.0, rate)[0].index, 20);
    }

    #[test]
    fn test_distant_peaks_are_all_kept() {
        let rate = 100;
        let mut signal = vec![0.0; 100];
        signal[10] = 1.0;
        signal[35] = 0.5;
        signal[60] = 0.7;
        let idx: Vec<usize> = extract_peaks(&signal, 200.0, rate).iter().map(|c| c.index).collect();
        assert_eq!(idx, vec![10, 35, 60]);
    }

    #[test]
    fn test_refractory_window_is_inclusive() {
        let rate = 100;
        let mut signal = vec![0.0; 60];
        signal[10] = 1.0;
        signal[30] = 0.5; // exactly 200 ms after: still absorbed
        signal[51] = 0.5;
        let idx: Vec<usize> = extract_peaks(&signal, 200.0, rate).iter().map(|c| c.index).collect();
        assert_eq!(idx, vec![10, 51]);
    }

    #[test]
    fn test_flat_and_monotonic_input() {
        assert!(extract_peaks(&vec![0.0; 2250], 200.0, 250).is_empty());
        let ramp: Vec<f64> = (0..500).map(|i| i as f64).collect();
        assert!(extract_peaks(&ramp, 200.0, 250).is_empty());
        assert!(extract_peaks(&[], 200.0, 250).is_empty());
    }
}
