use biquad::Coefficients;
use log::debug;
use rustfft::num_complex::Complex;
use std::f64::consts::PI;

use crate::error::{QrsError, Result};

/// IIR filter in transfer-function form, `a[0]` normalized to 1 and both
/// coefficient vectors padded to the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunction {
    pub b: Vec<f64>,
    pub a: Vec<f64>,
}

impl TransferFunction {
    pub fn new(mut b: Vec<f64>, mut a: Vec<f64>) -> Result<Self> {
        if b.is_empty() || a.is_empty() {
            return Err(QrsError::FilterDesign("Empty coefficient vector".to_string()));
        }
        let a0 = a[0];
        if a0 == 0.0 || !a0.is_finite() {
            return Err(QrsError::FilterDesign(format!("Leading denominator coefficient is {}", a0)));
        }
        let taps = a.len().max(b.len());
        a.resize(taps, 0.0);
        b.resize(taps, 0.0);
        a.iter_mut().for_each(|c| *c /= a0);
        b.iter_mut().for_each(|c| *c /= a0);
        Ok(Self { b, a })
    }

    /// Multiplies a cascade of second-order sections out into one transfer function.
    pub fn from_sections(sections: &[Coefficients<f64>]) -> Result<Self> {
        let mut b = vec![1.0];
        let mut a = vec![1.0];
        for s in sections {
            b = poly_mul(&b, &[s.b0, s.b1, s.b2]);
            a = poly_mul(&a, &[1.0, s.a1, s.a2]);
        }
        Self::new(b, a)
    }

    pub fn taps(&self) -> usize {
        self.a.len()
    }

    /// Number of reflected samples added at each end by [`filtfilt`](Self::filtfilt).
    pub fn padding(&self) -> usize {
        3 * self.taps()
    }

    /// Steady-state internal state for a unit step input.
    ///
    /// Solves `(I - A) zi = b[1..] - a[1..] * b[0]` where `A` is the companion
    /// matrix of the denominator (F. Gustafsson, "Determining the initial
    /// states in forward-backward filtering", IEEE Trans. Signal Processing,
    /// 1996). Scaling the result by the first input sample starts the filter
    /// without a transient.
    pub fn initial_state(&self) -> Result<Vec<f64>> {
        let n = self.taps() - 1;
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut m = vec![vec![0.0; n]; n];
        for (i, row) in m.iter_mut().enumerate() {
            row[i] += 1.0;
            row[0] += self.a[i + 1];
            if i + 1 < n {
                row[i + 1] -= 1.0;
            }
        }
        let rhs: Vec<f64> = (0..n).map(|i| self.b[i + 1] - self.a[i + 1] * self.b[0]).collect();

        solve_linear(m, rhs)
    }

    /// Runs the filter over `x` in transposed direct form II, starting from state `zi`.
    pub fn filter(&self, x: &[f64], zi: &[f64]) -> Vec<f64> {
        let n = self.taps();
        if n == 1 {
            return x.iter().map(|&v| self.b[0] * v).collect();
        }

        let mut z = zi.to_vec();
        z.resize(n - 1, 0.0);
        let mut y = Vec::with_capacity(x.len());
        for &xi in x {
            let yi = self.b[0] * xi + z[0];
            for i in 0..n - 2 {
                z[i] = self.b[i + 1] * xi + z[i + 1] - self.a[i + 1] * yi;
            }
            z[n - 2] = self.b[n - 1] * xi - self.a[n - 1] * yi;
            y.push(yi);
        }
        y
    }

    /// Zero-phase forward-backward filtering.
    ///
    /// The signal is extended at both ends by odd reflection about its first and
    /// last sample, filtered forward from the step steady state, reversed,
    /// filtered again, reversed back and trimmed to its original length.
    pub fn filtfilt(&self, x: &[f64]) -> Result<Vec<f64>> {
        let pad = self.padding();
        if x.len() <= pad {
            return Err(QrsError::SignalTooShort { len: x.len(), required: pad });
        }

        let zi = self.initial_state()?;
        let first = x[0];
        let last = x[x.len() - 1];

        let mut extended = Vec::with_capacity(x.len() + 2 * pad);
        extended.extend((1..=pad).rev().map(|i| 2.0 * first - x[i]));
        extended.extend_from_slice(x);
        extended.extend((1..=pad).map(|i| 2.0 * last - x[x.len() - 1 - i]));

        let state: Vec<f64> = zi.iter().map(|z| z * extended[0]).collect();
        let mut y = self.filter(&extended, &state);

        y.reverse();
        let state: Vec<f64> = zi.iter().map(|z| z * y[0]).collect();
        let mut y = self.filter(&y, &state);
        y.reverse();

        Ok(y[pad..pad + x.len()].to_vec())
    }
}

/// Designs a digital Butterworth band-pass filter as second-order sections.
///
/// `order` is the order of the low-pass prototype, so the result has `order`
/// sections and `2 * order` poles. Band edges are pre-warped for the bilinear
/// transform.
pub fn butterworth_bandpass(order: usize, low_hz: f64, high_hz: f64, sample_rate: u32) -> Result<Vec<Coefficients<f64>>> {
    let nyquist = sample_rate as f64 / 2.0;
    if order == 0 || order > 10 {
        return Err(QrsError::FilterDesign(format!("Order must be 1-10, got {}", order)));
    }
    if !(low_hz > 0.0 && low_hz < high_hz && high_hz < nyquist) {
        return Err(QrsError::FilterDesign(format!(
            "Band {}-{} Hz is not inside (0, {}) Hz",
            low_hz, high_hz, nyquist
        )));
    }

    // bilinear transform with fs = 2, band edges normalized to nyquist
    let fs2 = 4.0;
    let warp = |hz: f64| fs2 * (PI * (hz / nyquist) / 2.0).tan();
    let (w_low, w_high) = (warp(low_hz), warp(high_hz));
    let bw = w_high - w_low;
    let w0_sq = w_low * w_high;

    let prototype: Vec<Complex<f64>> = (0..order)
        .map(|m| {
            let angle = PI * (2.0 * m as f64 - order as f64 + 1.0) / (2.0 * order as f64);
            -Complex::from_polar(1.0, angle)
        })
        .collect();

    let mut analog = Vec::with_capacity(2 * order);
    for &p in &prototype {
        let p_lp = p * bw / 2.0;
        let root = (p_lp * p_lp - w0_sq).sqrt();
        analog.push(p_lp + root);
        analog.push(p_lp - root);
    }

    // `order` analog zeros at the origin map to z = 1, the rest land on z = -1
    let gain_ratio = analog.iter().fold(Complex::new(1.0, 0.0), |acc, &p| acc * (fs2 - p));
    let gain = bw.powi(order as i32) * (Complex::new(fs2.powi(order as i32), 0.0) / gain_ratio).re;

    let digital: Vec<Complex<f64>> = analog.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect();
    let denominators = pair_poles(&digital);

    let sections: Vec<Coefficients<f64>> = denominators
        .into_iter()
        .enumerate()
        .map(|(i, (a1, a2))| {
            let g = if i == 0 { gain } else { 1.0 };
            Coefficients { a1, a2, b0: g, b1: 0.0, b2: -g }
        })
        .collect();

    debug!(
        "Butterworth band-pass {}-{} Hz at {} Hz: {} sections, gain {:.6e}",
        low_hz,
        high_hz,
        sample_rate,
        sections.len(),
        gain
    );
    Ok(sections)
}

pub fn bandpass_filter(order: usize, low_hz: f64, high_hz: f64, sample_rate: u32) -> Result<TransferFunction> {
    TransferFunction::from_sections(&butterworth_bandpass(order, low_hz, high_hz, sample_rate)?)
}

// Groups poles into real second-order denominators (a1, a2): conjugate pairs
// first, then real poles two at a time.
fn pair_poles(poles: &[Complex<f64>]) -> Vec<(f64, f64)> {
    const EPS: f64 = 1e-12;
    let mut pairs = Vec::with_capacity(poles.len() / 2 + 1);
    for p in poles.iter().filter(|p| p.im > EPS) {
        pairs.push((-2.0 * p.re, p.norm_sqr()));
    }
    let reals: Vec<f64> = poles.iter().filter(|p| p.im.abs() <= EPS).map(|p| p.re).collect();
    for chunk in reals.chunks(2) {
        match *chunk {
            [r1, r2] => pairs.push((-(r1 + r2), r1 * r2)),
            [r] => pairs.push((-r, 0.0)),
            _ => unreachable!(),
        }
    }
    pairs
}

fn poly_mul(p: &[f64], q: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; p.len() + q.len() - 1];
    for (i, &pi) in p.iter().enumerate() {
        for (j, &qj) in q.iter().enumerate() {
            out[i + j] += pi * qj;
        }
    }
    out
}

// Gaussian elimination with partial pivoting.
fn solve_linear(mut m: Vec<Vec<f64>>, mut rhs: Vec<f64>) -> Result<Vec<f64>> {
    let n = rhs.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| m[i][col].abs().total_cmp(&m[j][col].abs()))
            .unwrap_or(col);
        if m[pivot][col].abs() < 1e-14 {
            return Err(QrsError::FilterDesign("Initial state system is singular".to_string()));
        }
        m.swap(col, pivot);
        rhs.swap(col, pivot);

        for row in col + 1..n {
            let factor = m[row][col] / m[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                m[row][k] -= factor * m[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| m[row][k] * x[k]).sum();
        x[row] = (rhs[row] - tail) / m[row][row];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use biquad::{Biquad, DirectForm2Transposed};
    use rustfft::FftPlanner;

    fn assert_close(actual: &[f64], expected: &[f64], tol: f64) {
        assert_eq!(actual.len(), expected.len());
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!((a - e).abs() < tol, "coefficient {}: {} vs {}", i, a, e);
        }
    }

    #[test]
    fn test_butterworth_reference_coefficients() {
        // butter(2, [5/125, 15/125], 'bandpass')
        let tf = bandpass_filter(2, 5.0, 15.0, 250).unwrap();
        assert_close(
            &tf.b,
            &[0.013359200027856493, 0.0, -0.026718400055712986, 0.0, 0.013359200027856493],
            1e-9,
        );
        assert_close(
            &tf.a,
            &[1.0, -3.5609474528307343, 4.838863973685881, -2.9769296153842237, 0.7008967811884023],
            1e-9,
        );
        assert_eq!(tf.padding(), 15);
    }

    #[test]
    fn test_rejects_band_outside_nyquist() {
        assert!(butterworth_bandpass(2, 5.0, 15.0, 30).is_err());
        assert!(butterworth_bandpass(2, 15.0, 5.0, 250).is_err());
        assert!(butterworth_bandpass(0, 5.0, 15.0, 250).is_err());
    }

    #[test]
    fn test_odd_order_design_is_stable() {
        let sections = butterworth_bandpass(3, 5.0, 15.0, 500).unwrap();
        assert_eq!(sections.len(), 3);
        for s in &sections {
            // |a2| < 1 and |a1| < 1 + a2 keep both poles inside the unit circle
            assert!(s.a2.abs() < 1.0 && s.a1.abs() < 1.0 + s.a2, "unstable section {:?}", s);
        }
    }

    #[test]
    fn test_matches_biquad_cascade() {
        let sections = butterworth_bandpass(2, 5.0, 15.0, 360).unwrap();
        let tf = TransferFunction::from_sections(&sections).unwrap();

        let input: Vec<f64> = (0..400).map(|i| ((i * 7919) % 97) as f64 / 97.0 - 0.5).collect();
        let direct = tf.filter(&input, &[]);

        let mut cascade: Vec<DirectForm2Transposed<f64>> =
            sections.iter().map(|&c| DirectForm2Transposed::<f64>::new(c)).collect();
        let expected: Vec<f64> = input
            .iter()
            .map(|&x| cascade.iter_mut().fold(x, |acc, stage| stage.run(acc)))
            .collect();

        assert_close(&direct, &expected, 1e-10);
    }

    #[test]
    fn test_passband_response() {
        let rate = 250;
        let tf = bandpass_filter(2, 5.0, 15.0, rate).unwrap();
        let n = 1024;
        let mut impulse = vec![0.0; n];
        impulse[0] = 1.0;
        let h = tf.filter(&impulse, &[]);

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(n);
        let mut spectrum: Vec<Complex<f64>> = h.iter().map(|&v| Complex::new(v, 0.0)).collect();
        fft.process(&mut spectrum);
        let magnitude = |hz: f64| spectrum[(hz * n as f64 / rate as f64).round() as usize].norm();

        assert!(magnitude(10.0) > 0.95);
        assert!(magnitude(1.0) < 0.05);
        assert!(magnitude(40.0) < 0.1);
    }

    #[test]
    fn test_initial_state_has_no_step_transient() {
        let tf = TransferFunction::new(vec![0.2, 0.3], vec![1.0, -0.5]).unwrap();
        let zi = tf.initial_state().unwrap();
        assert_close(&zi, &[0.8], 1e-12);

        let y = tf.filter(&vec![2.0; 50], &[zi[0] * 2.0]);
        assert!(y.iter().all(|v| (v - 2.0).abs() < 1e-12));
    }

    #[test]
    fn test_normalizes_leading_coefficient() {
        let tf = TransferFunction::new(vec![2.0], vec![2.0, 1.0]).unwrap();
        assert_eq!(tf.b, vec![1.0, 0.0]);
        assert_eq!(tf.a, vec![1.0, 0.5]);
        assert!(TransferFunction::new(vec![1.0], vec![0.0, 1.0]).is_err());
    }

    #[test]
    fn test_filtfilt_is_zero_phase() {
        let tf = bandpass_filter(2, 5.0, 15.0, 250).unwrap();
        let x: Vec<f64> = (0..1000).map(|i| (-0.5 * ((i as f64 - 500.0) / 3.0).powi(2)).exp()).collect();
        let y = tf.filtfilt(&x).unwrap();
        assert_eq!(y.len(), x.len());

        let peak = y
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 500);
    }

    #[test]
    fn test_filtfilt_rejects_short_signal() {
        let tf = bandpass_filter(2, 5.0, 15.0, 250).unwrap();
        assert_eq!(
            tf.filtfilt(&[0.0; 15]),
            Err(QrsError::SignalTooShort { len: 15, required: 15 })
        );
        assert_eq!(tf.filtfilt(&[1.0; 16]).unwrap().len(), 16);
    }
}
