//! # Frequency Matching Module
//!
//! Decides whether a detected frequency is one of a set of target notes.
//! Equal-tempered notes are spaced logarithmically, so the tolerance is in
//! cents rather than Hz.

use std::sync::Arc;

use crate::error::{FretboardError, Result};
use crate::note::PitchedNote;
use crate::tuning::{NoteFrequencyTable, calculate_cents_deviation};

/// Half a semitone either side of the target.
pub const DEFAULT_TOLERANCE_CENTS: f64 = 50.0;

/// Matches detected pitches against target notes within a cent tolerance.
#[derive(Debug, Clone)]
pub struct FrequencyMatcher {
    table: Arc<NoteFrequencyTable>,
    tolerance_cents: f64,
}

impl FrequencyMatcher {
    /// Creates a matcher with the default 50 cent tolerance.
    pub fn new(table: Arc<NoteFrequencyTable>) -> Self {
        Self {
            table,
            tolerance_cents: DEFAULT_TOLERANCE_CENTS,
        }
    }

    /// Replaces the tolerance.
    ///
    /// # Errors
    /// `InvalidArgument` if `cents` is negative or not finite.
    pub fn with_tolerance(mut self, cents: f64) -> Result<Self> {
        if !(cents.is_finite() && cents >= 0.0) {
            return Err(FretboardError::InvalidArgument(format!(
                "tolerance must be a non-negative number of cents: {cents}"
            )));
        }
        self.tolerance_cents = cents;
        Ok(self)
    }

    pub fn tolerance_cents(&self) -> f64 {
        self.tolerance_cents
    }

    pub fn table(&self) -> &NoteFrequencyTable {
        &self.table
    }

    /// Signed distance in cents from `target` to `detected_hz`.
    ///
    /// `None` when `detected_hz` is not a positive finite number or the
    /// target lies outside the frequency table.
    pub fn cents(&self, detected_hz: f64, target: PitchedNote) -> Option<f64> {
        if !(detected_hz.is_finite() && detected_hz > 0.0) {
            return None;
        }
        match self.table.lookup(target) {
            Ok(target_hz) => Some(calculate_cents_deviation(detected_hz, target_hz)),
            Err(err) => {
                tracing::warn!(%target, %err, "target note has no reference frequency");
                None
            }
        }
    }

    /// Whether `detected_hz` is within tolerance of `target`.
    pub fn is_match(&self, detected_hz: f64, target: PitchedNote) -> bool {
        self.cents(detected_hz, target)
            .is_some_and(|cents| cents.abs() <= self.tolerance_cents)
    }

    /// The target nearest to `detected_hz`, if any is within tolerance.
    ///
    /// When several targets qualify the one with the smallest absolute cent
    /// distance wins; exact ties keep the first in iteration order. An empty
    /// target set never matches.
    pub fn find_match<'t, I>(&self, detected_hz: f64, targets: I) -> Option<PitchedNote>
    where
        I: IntoIterator<Item = &'t PitchedNote>,
    {
        let mut best: Option<(PitchedNote, f64)> = None;
        for &target in targets {
            let Some(distance) = self.cents(detected_hz, target).map(f64::abs) else {
                continue;
            };
            if distance > self.tolerance_cents {
                continue;
            }
            if best.is_none_or(|(_, closest)| distance < closest) {
                best = Some((target, distance));
            }
        }
        best.map(|(note, _)| note)
    }
}
