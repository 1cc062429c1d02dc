//! # Musical Tuning Module
//!
//! Reference frequencies for every note the fretboard can produce, and the
//! cent arithmetic used to compare a measured pitch against them.
//!
//! ## Features
//! - Equal temperament table anchored at A4 = 440 Hz, octaves 0 to 9
//! - Cent deviation calculations
//! - Nearest-note lookup for tuner read-outs

use crate::error::{FretboardError, Result};
use crate::note::{MAX_OCTAVE, NOTES_PER_OCTAVE, PitchClass, PitchedNote};

/// Number of octaves covered by the table (0 through 9).
pub const OCTAVE_COUNT: usize = MAX_OCTAVE as usize + 1;

/// Published equal-temperament chromatic table, in Hz, rounded to three
/// decimal places. Rows are octaves, columns are pitch-class ordinals.
const REFERENCE_FREQUENCIES: [[f64; NOTES_PER_OCTAVE]; OCTAVE_COUNT] = [
    [16.351, 17.324, 18.354, 19.445, 20.601, 21.827, 23.124, 24.499, 25.956, 27.5, 29.135, 30.868],
    [32.703, 34.648, 36.708, 38.891, 41.203, 43.654, 46.249, 48.999, 51.913, 55.0, 58.27, 61.735],
    [65.406, 69.296, 73.416, 77.782, 82.407, 87.307, 92.499, 97.999, 103.826, 110.0, 116.541, 123.471],
    [130.813, 138.591, 146.832, 155.563, 164.814, 174.614, 184.997, 195.998, 207.652, 220.0, 233.082, 246.942],
    [261.626, 277.183, 293.665, 311.127, 329.628, 349.228, 369.994, 391.995, 415.305, 440.0, 466.164, 493.883],
    [523.251, 554.365, 587.33, 622.254, 659.255, 698.456, 739.989, 783.991, 830.609, 880.0, 932.328, 987.767],
    [1046.502, 1108.731, 1174.659, 1244.508, 1318.51, 1396.913, 1479.978, 1567.982, 1661.219, 1760.0, 1864.655, 1975.533],
    [2093.005, 2217.461, 2349.318, 2489.016, 2637.021, 2793.826, 2959.955, 3135.964, 3322.438, 3520.0, 3729.31, 3951.066],
    [4186.009, 4434.922, 4698.636, 4978.032, 5274.042, 5587.652, 5919.91, 6271.928, 6644.876, 7040.0, 7458.62, 7902.132],
    [8372.018, 8869.844, 9397.272, 9956.064, 10548.084, 11175.304, 11839.82, 12543.856, 13289.752, 14080.0, 14917.24, 15804.264],
];

/// Immutable lookup from a `PitchedNote` to its reference frequency.
///
/// Built once and shared by reference; it holds no interior mutability, so
/// it can be read from any thread.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteFrequencyTable {
    frequencies: [[f64; NOTES_PER_OCTAVE]; OCTAVE_COUNT],
}

impl NoteFrequencyTable {
    /// Builds the table from the published reference values.
    pub fn new() -> Self {
        Self {
            frequencies: REFERENCE_FREQUENCIES,
        }
    }

    /// Reference frequency of `note` in Hz.
    ///
    /// # Errors
    /// `OctaveOutOfRange` when `note.octave` is above 9.
    pub fn lookup(&self, note: PitchedNote) -> Result<f64> {
        let row = self
            .frequencies
            .get(note.octave as usize)
            .ok_or(FretboardError::OctaveOutOfRange {
                octave: note.octave,
            })?;
        Ok(row[note.pitch_class.ordinal()])
    }

    /// Iterates over every note in the table, lowest first.
    pub fn iter(&self) -> impl Iterator<Item = (PitchedNote, f64)> + '_ {
        self.frequencies
            .iter()
            .enumerate()
            .flat_map(|(octave, row)| {
                row.iter().enumerate().map(move |(ordinal, &hz)| {
                    (
                        PitchedNote::new(octave as u8, PitchClass::from_ordinal(ordinal)),
                        hz,
                    )
                })
            })
    }

    /// Finds the table note closest to `freq` on a logarithmic scale.
    ///
    /// Returns the note and the deviation of `freq` from it in cents, or
    /// `None` if `freq` is not a positive finite number.
    pub fn nearest_note(&self, freq: f64) -> Option<(PitchedNote, f64)> {
        if !(freq.is_finite() && freq > 0.0) {
            return None;
        }
        self.iter()
            .map(|(note, hz)| (note, calculate_cents_deviation(freq, hz)))
            .min_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
    }
}

impl Default for NoteFrequencyTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Calculates the deviation from a target frequency in cents.
///
/// Cents are a logarithmic unit of pitch measurement where:
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
/// - Positive values indicate sharpness, negative values indicate flatness
pub fn calculate_cents_deviation(freq: f64, target_freq: f64) -> f64 {
    1200.0 * (freq / target_freq).log2()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_hz(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 0.0005,
            "expected {expected:.3} Hz, got {actual:.3} Hz"
        );
    }

    #[test]
    fn a4_is_440() {
        let table = NoteFrequencyTable::new();
        let hz = table.lookup(PitchedNote::new(4, PitchClass::A)).unwrap();
        assert_hz(hz, 440.0);
    }

    #[test]
    fn g0_matches_reference() {
        let table = NoteFrequencyTable::new();
        let hz = table.lookup(PitchedNote::new(0, PitchClass::G)).unwrap();
        assert_hz(hz, 24.499);
    }

    #[test]
    fn guitar_open_strings_match_reference() {
        let table = NoteFrequencyTable::new();
        let expected = [
            ("E2", 82.407),
            ("A2", 110.0),
            ("D3", 146.832),
            ("G3", 195.998),
            ("B3", 246.942),
            ("E4", 329.628),
            ("B1", 61.735),
            ("G1", 48.999),
        ];
        for (name, hz) in expected {
            let note: PitchedNote = name.parse().unwrap();
            assert_hz(table.lookup(note).unwrap(), hz);
        }
    }

    #[test]
    fn table_is_close_to_equal_temperament() {
        // Rounded values stay within a tenth of a cent of the formula.
        let table = NoteFrequencyTable::new();
        for (note, hz) in table.iter() {
            let semitones_from_a4 = note.semitone_index() as f64 - 57.0;
            let exact = 440.0 * 2f64.powf(semitones_from_a4 / 12.0);
            let cents = calculate_cents_deviation(hz, exact).abs();
            assert!(cents < 0.1, "{note}: {hz} vs {exact} ({cents} cents)");
        }
    }

    #[test]
    fn table_is_strictly_ascending() {
        let table = NoteFrequencyTable::new();
        let values: Vec<f64> = table.iter().map(|(_, hz)| hz).collect();
        assert_eq!(values.len(), 120);
        assert!(values.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn octave_ten_is_out_of_range() {
        let table = NoteFrequencyTable::new();
        assert_eq!(
            table.lookup(PitchedNote::new(10, PitchClass::C)),
            Err(FretboardError::OctaveOutOfRange { octave: 10 })
        );
    }

    #[test]
    fn cents_between_semitones() {
        assert!((calculate_cents_deviation(880.0, 440.0) - 1200.0).abs() < 1e-9);
        assert!((calculate_cents_deviation(466.164, 440.0) - 100.0).abs() < 0.01);
    }

    #[test]
    fn nearest_note_reports_offset() {
        let table = NoteFrequencyTable::new();
        let (note, cents) = table.nearest_note(445.0).unwrap();
        assert_eq!(note, PitchedNote::new(4, PitchClass::A));
        assert!(cents > 19.0 && cents < 20.0, "got {cents}");

        assert!(table.nearest_note(0.0).is_none());
        assert!(table.nearest_note(f64::NAN).is_none());
    }
}
