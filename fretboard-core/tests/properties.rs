//! Property-based tests for fretboard layouts and cent matching.
//!
//! Uses proptest to sweep open notes, fret counts and frequencies.

use std::sync::Arc;

use fretboard_core::tuning::calculate_cents_deviation;
use fretboard_core::{
    FretboardLayoutBuilder, FrequencyMatcher, NoteFrequencyTable, PitchClass, PitchedNote,
};
use proptest::prelude::*;

fn open_note() -> impl Strategy<Value = PitchedNote> {
    (0u8..=6, 0usize..12)
        .prop_map(|(octave, ordinal)| PitchedNote::new(octave, PitchClass::from_ordinal(ordinal)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Any open note with any supported fret count yields exactly that many
    /// frets, and fret 12 is the open note an octave up.
    #[test]
    fn twelfth_fret_is_the_octave(open in open_note(), fret_count in 12u8..=36) {
        let layout = FretboardLayoutBuilder::new(1, open, fret_count).build().unwrap();
        prop_assert_eq!(layout.frets().len(), usize::from(fret_count));
        let twelfth = layout.note_at(12).unwrap();
        prop_assert_eq!(twelfth.pitch_class, open.pitch_class);
        prop_assert_eq!(twelfth.octave, open.octave + 1);
    }

    /// Consecutive frets are always one semitone apart.
    #[test]
    fn frets_climb_by_semitones(open in open_note(), fret_count in 12u8..=36) {
        let layout = FretboardLayoutBuilder::new(3, open, fret_count).build().unwrap();
        let mut previous = open;
        for &fret in layout.frets() {
            prop_assert_eq!(fret.semitone_index(), previous.semitone_index() + 1);
            previous = fret;
        }
    }

    /// Cent distance is antisymmetric: swapping the two frequencies flips
    /// the sign.
    #[test]
    fn cents_are_antisymmetric(a in 20.0f64..1400.0, b in 20.0f64..1400.0) {
        let forward = calculate_cents_deviation(a, b);
        let backward = calculate_cents_deviation(b, a);
        prop_assert!((forward + backward).abs() < 1e-9);
    }

    /// A target matches a frequency exactly when it is within tolerance in
    /// either direction, regardless of the target's octave.
    #[test]
    fn matching_is_symmetric_in_cents(
        octave in 1u8..=7,
        ordinal in 0usize..12,
        offset in -49.0f64..49.0,
    ) {
        let table = Arc::new(NoteFrequencyTable::new());
        let matcher = FrequencyMatcher::new(table.clone());
        let target = PitchedNote::new(octave, PitchClass::from_ordinal(ordinal));
        let target_hz = table.lookup(target).unwrap();

        let above = target_hz * 2f64.powf(offset.abs() / 1200.0);
        let below = target_hz * 2f64.powf(-offset.abs() / 1200.0);
        prop_assert!(matcher.is_match(above, target));
        prop_assert!(matcher.is_match(below, target));
        prop_assert_eq!(matcher.find_match(above, &[target]), Some(target));

        let far = target_hz * 2f64.powf(60.0 / 1200.0);
        prop_assert!(!matcher.is_match(far, target));
    }
}
