use crate::util::ms_to_samples;

/// Moving-window average over the trailing `window_ms` of `signal`.
///
/// Runs in O(n) on a cumulative sum. The first `window` outputs average over
/// the samples seen so far (divisors 1, 2, ..., window).
pub fn integrate(signal: &[f64], window_ms: f64, sample_rate: u32) -> Vec<f64> {
    let window = ms_to_samples(window_ms, sample_rate).max(1);
    moving_average(signal, window)
}

pub fn moving_average(signal: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut cumsum = Vec::with_capacity(signal.len());
    let mut total = 0.0;
    for &v in signal {
        total += v;
        cumsum.push(total);
    }

    cumsum
        .iter()
        .enumerate()
        .map(|(i, &cs)| {
            if i < window {
                cs / (i + 1) as f64
            } else {
                (cs - cumsum[i - window]) / window as f64
            }
        })
        .collect()
}
