//! # Pitch Detection Module
//!
//! Estimates the fundamental frequency of one buffer of mono 16-bit PCM
//! using a normalized autocorrelation.
//!
//! ## Pipeline
//! 1. Decode little-endian `i16` samples to `[-1, 1]`
//! 2. Reject buffers shorter than `min_samples`
//! 3. Noise gate on the RMS level
//! 4. DC removal and Hann windowing
//! 5. Autocorrelation normalized by zero-lag energy, divided by the
//!    window's own autocorrelation so the taper does not bias long lags
//! 6. Peak picking past the lag-0 lobe, inside the guitar's frequency span
//! 7. Confidence check on the chosen peak
//! 8. Parabolic interpolation for sub-sample accuracy
//! 9. Lag to frequency, with a final range check
//!
//! Every rejection is an ordinary `Ok(None)`: silence between notes is the
//! normal state. Only malformed input is an error.

use serde::{Deserialize, Serialize};

use crate::error::{FretboardError, Result};
use crate::fft;

/// Tunable constants of the detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Lowest accepted fundamental in Hz.
    pub min_frequency: f64,
    /// Highest accepted fundamental in Hz.
    pub max_frequency: f64,
    /// RMS level below which a buffer is treated as silence.
    pub noise_gate: f64,
    /// Minimum normalized correlation of the chosen peak.
    pub confidence_threshold: f64,
    /// Buffers with fewer samples are not analysed.
    pub min_samples: usize,
    /// The first correlation peak reaching this fraction of the highest
    /// peak is taken as the period. Keeps multiples of the period, which
    /// correlate just as well, from being reported an octave low.
    pub peak_ratio: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_frequency: 20.0,
            max_frequency: 1400.0,
            noise_gate: 0.01,
            confidence_threshold: 0.8,
            min_samples: 256,
            peak_ratio: 0.9,
        }
    }
}

impl DetectorConfig {
    /// Checks that the constants describe a usable detector.
    pub fn validate(&self) -> Result<()> {
        let positive = |value: f64| value.is_finite() && value > 0.0;
        if !positive(self.min_frequency) || !positive(self.max_frequency) {
            return Err(FretboardError::InvalidSettings(format!(
                "frequency bounds must be positive: {}..{}",
                self.min_frequency, self.max_frequency
            )));
        }
        if self.min_frequency >= self.max_frequency {
            return Err(FretboardError::InvalidSettings(format!(
                "min_frequency {} must be below max_frequency {}",
                self.min_frequency, self.max_frequency
            )));
        }
        if !(self.noise_gate.is_finite() && self.noise_gate >= 0.0) {
            return Err(FretboardError::InvalidSettings(format!(
                "noise_gate must be non-negative: {}",
                self.noise_gate
            )));
        }
        if !positive(self.confidence_threshold) {
            return Err(FretboardError::InvalidSettings(format!(
                "confidence_threshold must be positive: {}",
                self.confidence_threshold
            )));
        }
        if !(positive(self.peak_ratio) && self.peak_ratio <= 1.0) {
            return Err(FretboardError::InvalidSettings(format!(
                "peak_ratio must be in (0, 1]: {}",
                self.peak_ratio
            )));
        }
        if self.min_samples < 4 {
            return Err(FretboardError::InvalidSettings(format!(
                "min_samples must be at least 4: {}",
                self.min_samples
            )));
        }
        Ok(())
    }
}

/// Why a buffer produced no pitch. Only used for tracing.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Rejection {
    TooShort { samples: usize },
    BelowNoiseGate { rms: f64 },
    EmptyLagRange { lag_min: usize, lag_max: usize },
    NoPeak,
    LowConfidence { lag: usize, correlation: f64 },
    OutOfRange { frequency: f64 },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::TooShort { samples } => write!(f, "only {samples} samples"),
            Rejection::BelowNoiseGate { rms } => write!(f, "rms {rms:.4} below noise gate"),
            Rejection::EmptyLagRange { lag_min, lag_max } => {
                write!(f, "empty lag range {lag_min}..={lag_max}")
            }
            Rejection::NoPeak => f.write_str("no correlation peak"),
            Rejection::LowConfidence { lag, correlation } => {
                write!(f, "peak at lag {lag} only reaches {correlation:.3}")
            }
            Rejection::OutOfRange { frequency } => write!(f, "{frequency:.2} Hz out of range"),
        }
    }
}

/// A confident period estimate for one buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Estimate {
    frequency: f64,
    correlation: f64,
}

/// Autocorrelation pitch detector.
///
/// Holds only its configuration; every call is an independent, pure
/// computation over the buffer it is given, so one detector can be shared
/// across threads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PitchDetector {
    config: DetectorConfig,
}

impl PitchDetector {
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Detects the fundamental in raw 16-bit signed little-endian mono PCM.
    ///
    /// A trailing odd byte is ignored.
    ///
    /// # Returns
    /// * `Ok(Some(hz))` - Detected frequency
    /// * `Ok(None)` - No confident pitch in this buffer
    ///
    /// # Errors
    /// `InvalidArgument` for an empty buffer or a sample rate that is not a
    /// positive finite number.
    pub fn detect(&self, pcm: &[u8], sample_rate: f64) -> Result<Option<f64>> {
        if pcm.is_empty() {
            return Err(FretboardError::InvalidArgument(
                "audio buffer is empty".to_string(),
            ));
        }
        // A single odd byte decodes to no samples: too short, not empty.
        self.detect_decoded(&decode_pcm16(pcm), sample_rate)
    }

    /// Detects the fundamental in samples already normalized to `[-1, 1]`.
    pub fn detect_samples(&self, samples: &[f64], sample_rate: f64) -> Result<Option<f64>> {
        if samples.is_empty() {
            return Err(FretboardError::InvalidArgument(
                "audio buffer is empty".to_string(),
            ));
        }
        self.detect_decoded(samples, sample_rate)
    }

    fn detect_decoded(&self, samples: &[f64], sample_rate: f64) -> Result<Option<f64>> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(FretboardError::InvalidArgument(format!(
                "sample rate must be positive: {sample_rate}"
            )));
        }

        match self.estimate(samples, sample_rate) {
            Ok(estimate) => {
                tracing::trace!(
                    frequency = estimate.frequency,
                    correlation = estimate.correlation,
                    "pitch detected"
                );
                Ok(Some(estimate.frequency))
            }
            Err(rejection) => {
                tracing::trace!(%rejection, "no pitch");
                Ok(None)
            }
        }
    }

    fn estimate(&self, samples: &[f64], sample_rate: f64) -> std::result::Result<Estimate, Rejection> {
        let config = &self.config;
        let n = samples.len();

        if n < config.min_samples {
            return Err(Rejection::TooShort { samples: n });
        }

        let level = rms(samples);
        if level < config.noise_gate {
            return Err(Rejection::BelowNoiseGate { rms: level });
        }

        let mut signal = samples.to_vec();
        remove_dc_offset(&mut signal);
        fft::apply_hann_window(&mut signal);

        let lag_min = ((sample_rate / config.max_frequency) as usize).max(1);
        let lag_max = (n / 2).min((sample_rate / config.min_frequency) as usize);
        if lag_min >= lag_max {
            return Err(Rejection::EmptyLagRange { lag_min, lag_max });
        }

        let correlation = normalized_autocorrelation(&signal, lag_max + 1);
        if correlation.is_empty() {
            return Err(Rejection::NoPeak);
        }

        let lag = choose_peak(&correlation, lag_min, lag_max, config.peak_ratio)
            .ok_or(Rejection::NoPeak)?;
        let peak = correlation[lag];
        if peak < config.confidence_threshold {
            return Err(Rejection::LowConfidence {
                lag,
                correlation: peak,
            });
        }

        let refined_lag = refine_lag(&correlation, lag, lag_min, lag_max);
        let frequency = lag_to_frequency(refined_lag, sample_rate, config)?;

        Ok(Estimate {
            frequency,
            correlation: peak,
        })
    }
}

/// Decodes 16-bit signed little-endian PCM into samples in `[-1, 1]`.
pub fn decode_pcm16(bytes: &[u8]) -> Vec<f64> {
    bytes
        .chunks_exact(2)
        .map(|pair| f64::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
        .collect()
}

/// Encodes samples in `[-1, 1]` as 16-bit signed little-endian PCM,
/// saturating anything outside that range.
pub fn encode_pcm16(samples: &[f64]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|&sample| {
            let scaled = (sample * 32768.0).round().clamp(i16::MIN as f64, i16::MAX as f64);
            (scaled as i16).to_le_bytes()
        })
        .collect()
}

/// Root-mean-square level of `samples`; 0 for an empty slice.
pub fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|&s| s * s).sum::<f64>() / samples.len() as f64).sqrt()
}

/// Removes the DC offset from a signal by making its average value zero.
fn remove_dc_offset(signal: &mut [f64]) {
    let len = signal.len();
    if len == 0 {
        return;
    }
    let avg = signal.iter().sum::<f64>() / len as f64;
    if avg.abs() > 1e-12 {
        for sample in signal.iter_mut() {
            *sample -= avg;
        }
    }
}

/// Autocorrelation of the windowed `signal` for lags `0..=max_lag`,
/// normalized by its zero-lag energy and then by the equally normalized
/// autocorrelation of the Hann window.
///
/// A perfectly periodic signal scores close to 1 at each multiple of its
/// period regardless of loudness or of how far the window has tapered.
fn normalized_autocorrelation(signal: &[f64], max_lag: usize) -> Vec<f64> {
    let raw = fft::autocorrelation(signal, max_lag);
    let window = fft::autocorrelation(&fft::hann_window(signal.len()), max_lag);

    let energy = raw.first().copied().unwrap_or(0.0);
    let window_energy = window.first().copied().unwrap_or(0.0);
    if energy <= 0.0 || window_energy <= 0.0 {
        return Vec::new();
    }

    raw.iter()
        .zip(&window)
        .map(|(&r, &w)| {
            let w = w / window_energy;
            if w > 1e-9 { (r / energy) / w } else { 0.0 }
        })
        .collect()
}

/// Picks the lag of the period from a normalized autocorrelation.
///
/// Candidates are the local maxima of each positive region of the curve
/// that starts after the lag-0 lobe has first dropped to zero, restricted
/// to `lag_min..=lag_max`. The first candidate within `ratio` of the best
/// one wins.
fn choose_peak(correlation: &[f64], lag_min: usize, lag_max: usize, ratio: f64) -> Option<usize> {
    let lag_max = lag_max.min(correlation.len().saturating_sub(2));
    let mut candidates = Vec::new();
    let mut past_zero_lobe = false;
    let mut best_in_region: Option<usize> = None;

    for lag in 1..=lag_max {
        let value = correlation[lag];
        if !past_zero_lobe {
            past_zero_lobe = value <= 0.0;
            continue;
        }
        if value > 0.0 {
            if lag >= lag_min && best_in_region.is_none_or(|best| value > correlation[best]) {
                best_in_region = Some(lag);
            }
        } else if let Some(best) = best_in_region.take() {
            candidates.push(best);
        }
    }
    candidates.extend(best_in_region);

    // A region clipped by the search range has its maximum on the boundary
    // without being a real peak.
    candidates.retain(|&lag| {
        correlation[lag] >= correlation[lag - 1] && correlation[lag] >= correlation[lag + 1]
    });

    let highest = candidates
        .iter()
        .map(|&lag| correlation[lag])
        .fold(f64::NEG_INFINITY, f64::max);
    candidates
        .into_iter()
        .find(|&lag| correlation[lag] >= ratio * highest)
}

/// Sub-sample position of the peak at `lag`. Peaks on either end of the
/// searched range are returned as is.
fn refine_lag(correlation: &[f64], lag: usize, lag_min: usize, lag_max: usize) -> f64 {
    if lag <= lag_min || lag >= lag_max || lag + 1 >= correlation.len() {
        return lag as f64;
    }
    parabolic_peak(correlation[lag - 1], correlation[lag], correlation[lag + 1])
        .map_or(lag as f64, |shift| lag as f64 + shift)
}

fn lag_to_frequency(
    lag: f64,
    sample_rate: f64,
    config: &DetectorConfig,
) -> std::result::Result<f64, Rejection> {
    let frequency = sample_rate / lag;
    if !(config.min_frequency..=config.max_frequency).contains(&frequency) {
        return Err(Rejection::OutOfRange { frequency });
    }
    Ok(frequency)
}

/// Offset of the vertex of the parabola through three equally spaced
/// points, relative to the middle one. `None` when the points are
/// collinear or the vertex falls outside the neighbours.
fn parabolic_peak(y1: f64, y2: f64, y3: f64) -> Option<f64> {
    let denominator = 2.0 * (2.0 * y2 - y1 - y3);
    if denominator == 0.0 {
        return None;
    }
    let shift = (y3 - y1) / denominator;
    (shift.abs() < 1.0).then_some(shift)
}
