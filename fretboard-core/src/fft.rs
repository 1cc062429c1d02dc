//! # Fast Fourier Transform (FFT) Module
//!
//! Windowing and FFT-backed autocorrelation for the pitch detector.
//!
//! ## Features
//! - Hann windowing for reduced spectral leakage
//! - Linear (non-circular) autocorrelation via RustFFT in O(n log n)

use rustfft::{FftPlanner, num_complex::Complex};

/// Hann window coefficient `i` of a window `n` samples long.
fn hann_coefficient(i: usize, n: usize) -> f64 {
    let n_minus_1 = (n - 1) as f64;
    0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / n_minus_1).cos())
}

/// Applies a Hann window to the input buffer to reduce spectral leakage.
///
/// The Hann window tapers the signal to zero at the edges.
///
/// # Arguments
/// * `buffer` - Audio buffer to window (modified in-place)
pub fn apply_hann_window(buffer: &mut [f64]) {
    let n = buffer.len();
    if n < 2 {
        return;
    }
    for (i, sample) in buffer.iter_mut().enumerate() {
        *sample *= hann_coefficient(i, n);
    }
}

/// The Hann window itself, `n` samples long.
pub fn hann_window(n: usize) -> Vec<f64> {
    let mut window = vec![1.0; n];
    apply_hann_window(&mut window);
    window
}

/// Computes the linear autocorrelation of `signal` for lags `0..=max_lag`.
///
/// `result[lag] = sum(signal[i] * signal[i + lag])` over every `i` where
/// both samples exist. The signal is zero-padded past `len + max_lag`
/// before the transform so the circular correlation computed by the FFT
/// never wraps around into the lags we return.
///
/// # Arguments
/// * `signal` - Input samples
/// * `max_lag` - Largest lag to return; clamped to `signal.len() - 1`
///
/// # Returns
/// * `Vec<f64>` - `max_lag + 1` correlation values, empty for an empty signal
pub fn autocorrelation(signal: &[f64], max_lag: usize) -> Vec<f64> {
    if signal.is_empty() {
        return Vec::new();
    }
    let max_lag = max_lag.min(signal.len() - 1);
    let padded_len = (signal.len() + max_lag + 1).next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(padded_len);
    let inv_fft = planner.plan_fft_inverse(padded_len);

    let mut buffer: Vec<Complex<f64>> = signal
        .iter()
        .map(|&sample| Complex { re: sample, im: 0.0 })
        .chain(std::iter::repeat(Complex { re: 0.0, im: 0.0 }))
        .take(padded_len)
        .collect();

    fft.process(&mut buffer);
    // Power spectrum; its inverse transform is the autocorrelation.
    for bin in buffer.iter_mut() {
        *bin = Complex {
            re: bin.norm_sqr(),
            im: 0.0,
        };
    }
    inv_fft.process(&mut buffer);

    // RustFFT leaves both transforms unnormalized.
    let scale = 1.0 / padded_len as f64;
    buffer
        .iter()
        .take(max_lag + 1)
        .map(|c| c.re * scale)
        .collect()
}
