//! # Settings Module
//!
//! Instrument and audio configuration supplied by the surrounding
//! application. Values are validated, never clamped: a settings layer that
//! wants clamping must do it before handing values to the core.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::FretboardError;
use crate::fretboard::{
    DEFAULT_FRET_COUNT, DEFAULT_STRING_COUNT, Fretboard, MAX_FRET_COUNT, MAX_STRING_COUNT,
    MIN_FRET_COUNT, MIN_STRING_COUNT, StringTuning,
};
use crate::matcher::{DEFAULT_TOLERANCE_CENTS, FrequencyMatcher};
use crate::note::PitchedNote;
use crate::pitch::{DetectorConfig, PitchDetector};
use crate::tuning::NoteFrequencyTable;

/// Instrument and capture configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Number of strings, 6..=8.
    pub string_count: u8,
    /// Number of frets, 12..=36.
    pub fret_count: u8,
    /// Open notes for strings 1..=string_count, highest string first.
    /// `None` selects standard tuning.
    pub tuning: Option<Vec<PitchedNote>>,
    /// Capture sample rate in Hz.
    pub sample_rate: f64,
    /// Samples per analysed frame.
    pub buffer_size: usize,
    /// Match tolerance in cents.
    pub tolerance_cents: f64,
    /// Frames held between capture and detection before the oldest is dropped.
    pub queue_capacity: usize,
    pub detector: DetectorConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            string_count: DEFAULT_STRING_COUNT,
            fret_count: DEFAULT_FRET_COUNT,
            tuning: None,
            sample_rate: 44100.0,
            buffer_size: 4096,
            tolerance_cents: DEFAULT_TOLERANCE_CENTS,
            queue_capacity: 8,
            detector: DetectorConfig::default(),
        }
    }
}

impl Settings {
    /// Checks every field against its supported range.
    pub fn validate(&self) -> std::result::Result<(), FretboardError> {
        if !(MIN_STRING_COUNT..=MAX_STRING_COUNT).contains(&self.string_count) {
            return Err(FretboardError::InvalidStringCount(self.string_count));
        }
        if !(MIN_FRET_COUNT..=MAX_FRET_COUNT).contains(&self.fret_count) {
            return Err(FretboardError::InvalidFretCount(self.fret_count));
        }
        if let Some(tuning) = &self.tuning {
            if tuning.len() != usize::from(self.string_count) {
                return Err(FretboardError::InvalidSettings(format!(
                    "tuning lists {} open notes for {} strings",
                    tuning.len(),
                    self.string_count
                )));
            }
        }
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(FretboardError::InvalidSettings(format!(
                "sample_rate must be positive: {}",
                self.sample_rate
            )));
        }
        if self.buffer_size < self.detector.min_samples {
            return Err(FretboardError::InvalidSettings(format!(
                "buffer_size {} is below the detector minimum of {} samples",
                self.buffer_size, self.detector.min_samples
            )));
        }
        if !(self.tolerance_cents.is_finite() && self.tolerance_cents >= 0.0) {
            return Err(FretboardError::InvalidSettings(format!(
                "tolerance_cents must be non-negative: {}",
                self.tolerance_cents
            )));
        }
        if self.queue_capacity == 0 {
            return Err(FretboardError::InvalidSettings(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        self.detector.validate()
    }

    /// Real-time duration of one frame; detection must finish within it.
    ///
    /// `None` when `sample_rate` is not a positive finite number.
    pub fn frame_duration(&self) -> Option<Duration> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return None;
        }
        Duration::try_from_secs_f64(self.buffer_size as f64 / self.sample_rate).ok()
    }

    /// Builds the string layouts for this configuration.
    pub fn fretboard(&self) -> std::result::Result<Fretboard, FretboardError> {
        self.validate()?;
        match &self.tuning {
            None => Fretboard::standard(self.string_count, self.fret_count),
            Some(open_notes) => {
                let tunings: Vec<StringTuning> = open_notes
                    .iter()
                    .zip(1..)
                    .map(|(&open, string_number)| StringTuning::new(string_number, open))
                    .collect();
                Fretboard::from_tunings(&tunings, self.fret_count)
            }
        }
    }

    pub fn pitch_detector(&self) -> std::result::Result<PitchDetector, FretboardError> {
        PitchDetector::new(self.detector)
    }

    pub fn matcher(
        &self,
        table: Arc<NoteFrequencyTable>,
    ) -> std::result::Result<FrequencyMatcher, FretboardError> {
        FrequencyMatcher::new(table).with_tolerance(self.tolerance_cents)
    }

    /// Parses settings from JSON and validates them. Missing fields take
    /// their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json).context("parsing settings JSON")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serializing settings")
    }

    /// Loads and validates settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let settings = Self::from_json(&data)
            .with_context(|| format!("loading settings from {}", path.display()))?;
        tracing::info!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Writes the settings as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)
            .with_context(|| format!("writing settings to {}", path.display()))?;
        tracing::info!(path = %path.display(), "settings saved");
        Ok(())
    }
}
