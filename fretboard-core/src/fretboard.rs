//! # Fretboard Layout Module
//!
//! Generates the pitch of every fret on a string from its open note, and
//! assembles whole instruments from a flat table of string tunings.
//!
//! ## Octave rule
//! The octave advances exactly when the pitch-class sequence wraps from B
//! to C. Fret `k` is therefore always `k` semitones above the open string,
//! and fret 12 repeats the open pitch class one octave higher for every
//! possible open note.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{FretboardError, Result};
use crate::note::{MAX_OCTAVE, NOTES_PER_OCTAVE, PitchClass, PitchedNote};

pub const MIN_FRET_COUNT: u8 = 12;
pub const MAX_FRET_COUNT: u8 = 36;
pub const DEFAULT_FRET_COUNT: u8 = 24;

pub const MIN_STRING_COUNT: u8 = 6;
pub const MAX_STRING_COUNT: u8 = 8;
pub const DEFAULT_STRING_COUNT: u8 = 6;

/// Open-string data for one string of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringTuning {
    /// 1 is the highest-pitched string.
    pub string_number: u8,
    pub open: PitchedNote,
}

impl StringTuning {
    pub const fn new(string_number: u8, open: PitchedNote) -> Self {
        Self {
            string_number,
            open,
        }
    }
}

/// Standard tuning for up to eight strings, highest string first.
pub const STANDARD_TUNING: [StringTuning; MAX_STRING_COUNT as usize] = [
    StringTuning::new(1, PitchedNote::new(4, PitchClass::E)),
    StringTuning::new(2, PitchedNote::new(3, PitchClass::B)),
    StringTuning::new(3, PitchedNote::new(3, PitchClass::G)),
    StringTuning::new(4, PitchedNote::new(3, PitchClass::D)),
    StringTuning::new(5, PitchedNote::new(2, PitchClass::A)),
    StringTuning::new(6, PitchedNote::new(2, PitchClass::E)),
    StringTuning::new(7, PitchedNote::new(1, PitchClass::B)),
    StringTuning::new(8, PitchedNote::new(1, PitchClass::G)),
];

/// Conventional name of a string in standard tuning.
pub fn standard_string_name(string_number: u8) -> Option<&'static str> {
    const NAMES: [&str; MAX_STRING_COUNT as usize] =
        ["High E", "B", "G", "D", "A", "Low E", "Low B", "Low G"];
    NAMES.get(usize::from(string_number).checked_sub(1)?).copied()
}

/// Lowest and highest notes playable on a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyRange {
    pub low: PitchedNote,
    pub high: PitchedNote,
}

/// A note location on the neck. Fret 0 is the open string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FretPosition {
    pub string_number: u8,
    pub fret: u8,
    pub note: PitchedNote,
}

/// Pitch map of one physical string.
///
/// Built once per configuration by [`FretboardLayoutBuilder`] and never
/// modified; a settings change produces a new layout. Not deserializable:
/// every layout comes from the builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StringLayout {
    string_number: u8,
    open: PitchedNote,
    frets: Vec<PitchedNote>,
}

impl StringLayout {
    pub fn string_number(&self) -> u8 {
        self.string_number
    }

    pub fn open_note(&self) -> PitchedNote {
        self.open
    }

    /// Notes for frets 1..=N. The open string is not included.
    pub fn frets(&self) -> &[PitchedNote] {
        &self.frets
    }

    pub fn fret_count(&self) -> u8 {
        self.frets.len() as u8
    }

    /// Note at `fret`, where 0 is the open string.
    pub fn note_at(&self, fret: u8) -> Option<PitchedNote> {
        match fret {
            0 => Some(self.open),
            n => self.frets.get(usize::from(n) - 1).copied(),
        }
    }

    /// From the open string up to the last fret.
    pub fn frequency_range(&self) -> FrequencyRange {
        FrequencyRange {
            low: self.open,
            high: self.frets.last().copied().unwrap_or(self.open),
        }
    }

    /// Every position on this string, open string included, whose pitch
    /// class is `pitch_class`, in fret order.
    pub fn positions_of(&self, pitch_class: PitchClass) -> Vec<FretPosition> {
        std::iter::once(self.open)
            .chain(self.frets.iter().copied())
            .enumerate()
            .filter(|(_, note)| note.pitch_class == pitch_class)
            .map(|(fret, note)| FretPosition {
                string_number: self.string_number,
                fret: fret as u8,
                note,
            })
            .collect()
    }
}

/// Generates the chromatic run of notes along one string.
#[derive(Debug, Clone)]
pub struct FretboardLayoutBuilder {
    string_number: u8,
    open: PitchedNote,
    fret_count: u8,
    cycle: Option<Vec<PitchClass>>,
}

impl FretboardLayoutBuilder {
    pub fn new(string_number: u8, open: PitchedNote, fret_count: u8) -> Self {
        Self {
            string_number,
            open,
            fret_count,
            cycle: None,
        }
    }

    /// Supplies the pitch-class cycle to walk instead of the built-in one.
    ///
    /// The cycle must hold the 12 pitch classes exactly once, starting with
    /// the open string's pitch class. It is checked in [`build`](Self::build).
    pub fn with_cycle(mut self, cycle: &[PitchClass]) -> Self {
        self.cycle = Some(cycle.to_vec());
        self
    }

    /// Validates the configuration and generates the layout.
    ///
    /// # Errors
    /// - `InvalidStringNumber` outside 1..=8
    /// - `InvalidFretCount` outside 12..=36
    /// - `MalformedPitchCycle` / `OpenNoteMismatch` for a bad cycle
    /// - `OctaveOutOfRange` if the open note or the last fret lies above octave 9
    pub fn build(&self) -> Result<StringLayout> {
        if !(1..=MAX_STRING_COUNT).contains(&self.string_number) {
            return Err(FretboardError::InvalidStringNumber(self.string_number));
        }
        if !(MIN_FRET_COUNT..=MAX_FRET_COUNT).contains(&self.fret_count) {
            return Err(FretboardError::InvalidFretCount(self.fret_count));
        }
        if self.open.octave > MAX_OCTAVE {
            return Err(FretboardError::OctaveOutOfRange {
                octave: self.open.octave,
            });
        }
        let cycle = match &self.cycle {
            Some(cycle) => validate_cycle(cycle, self.open.pitch_class)?,
            None => self.open.pitch_class.ordered_from(),
        };

        let mut ordinal = self.open.pitch_class.ordinal();
        let mut octave = self.open.octave;
        let mut frets = Vec::with_capacity(usize::from(self.fret_count));

        for fret in 1..=usize::from(self.fret_count) {
            ordinal += 1;
            if ordinal == NOTES_PER_OCTAVE {
                ordinal = 0;
                octave += 1;
            }
            if octave > MAX_OCTAVE {
                return Err(FretboardError::OctaveOutOfRange { octave });
            }
            frets.push(PitchedNote::new(octave, cycle[fret % NOTES_PER_OCTAVE]));
        }

        tracing::trace!(
            string = self.string_number,
            open = %self.open,
            frets = frets.len(),
            "built string layout"
        );

        Ok(StringLayout {
            string_number: self.string_number,
            open: self.open,
            frets,
        })
    }
}

fn validate_cycle(
    cycle: &[PitchClass],
    open: PitchClass,
) -> Result<[PitchClass; NOTES_PER_OCTAVE]> {
    let cycle: [PitchClass; NOTES_PER_OCTAVE] =
        cycle.try_into().map_err(|_| FretboardError::MalformedPitchCycle {
            reason: format!("expected 12 notes, found {}", cycle.len()),
        })?;

    let distinct: BTreeSet<PitchClass> = cycle.iter().copied().collect();
    if distinct.len() != NOTES_PER_OCTAVE {
        return Err(FretboardError::MalformedPitchCycle {
            reason: format!("expected 12 distinct notes, found {}", distinct.len()),
        });
    }
    if cycle[0] != open {
        return Err(FretboardError::OpenNoteMismatch {
            open: open.display_name().to_string(),
            first: cycle[0].display_name().to_string(),
        });
    }
    Ok(cycle)
}

/// All strings of a configured instrument, ordered by string number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fretboard {
    strings: Vec<StringLayout>,
}

impl Fretboard {
    /// Builds strings `1..=string_count` in standard tuning.
    pub fn standard(string_count: u8, fret_count: u8) -> Result<Self> {
        if !(MIN_STRING_COUNT..=MAX_STRING_COUNT).contains(&string_count) {
            return Err(FretboardError::InvalidStringCount(string_count));
        }
        Self::from_tunings(&STANDARD_TUNING[..usize::from(string_count)], fret_count)
    }

    /// Builds one layout per tuning entry, whatever order they arrive in.
    pub fn from_tunings(tunings: &[StringTuning], fret_count: u8) -> Result<Self> {
        let mut strings = tunings
            .iter()
            .map(|tuning| {
                FretboardLayoutBuilder::new(tuning.string_number, tuning.open, fret_count).build()
            })
            .collect::<Result<Vec<_>>>()?;
        strings.sort_by_key(StringLayout::string_number);

        if let Some(pair) = strings
            .windows(2)
            .find(|pair| pair[0].string_number == pair[1].string_number)
        {
            return Err(FretboardError::InvalidStringNumber(pair[1].string_number));
        }

        tracing::debug!(strings = strings.len(), fret_count, "built fretboard");
        Ok(Self { strings })
    }

    pub fn strings(&self) -> &[StringLayout] {
        &self.strings
    }

    pub fn string(&self, string_number: u8) -> Option<&StringLayout> {
        self.strings
            .iter()
            .find(|layout| layout.string_number == string_number)
    }

    /// Every occurrence of `pitch_class`, open strings included, sorted by
    /// string then fret.
    pub fn find(&self, pitch_class: PitchClass) -> Vec<FretPosition> {
        self.strings
            .iter()
            .flat_map(|layout| layout.positions_of(pitch_class))
            .collect()
    }

    /// The distinct notes of `pitch_class` playable anywhere on the neck.
    pub fn notes_of(&self, pitch_class: PitchClass) -> BTreeSet<PitchedNote> {
        self.find(pitch_class)
            .into_iter()
            .map(|position| position.note)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(octave: u8, pitch_class: PitchClass) -> PitchedNote {
        PitchedNote::new(octave, pitch_class)
    }

    #[test]
    fn layouts_serialize_for_display() {
        let board = Fretboard::standard(6, 12).unwrap();
        let json = serde_json::to_value(&board).unwrap();
        let strings = json["strings"].as_array().unwrap();
        assert_eq!(strings.len(), 6);
        assert_eq!(strings[0]["string_number"], 1);
        assert_eq!(strings[0]["frets"].as_array().unwrap().len(), 12);
    }

    #[test]
    fn high_e_string_runs_chromatically() {
        let layout = FretboardLayoutBuilder::new(1, note(4, PitchClass::E), 24)
            .build()
            .unwrap();
        assert_eq!(layout.frets().len(), 24);
        assert_eq!(layout.note_at(0), Some(note(4, PitchClass::E)));
        assert_eq!(layout.note_at(1), Some(note(4, PitchClass::F)));
        assert_eq!(layout.note_at(7), Some(note(4, PitchClass::B)));
        assert_eq!(layout.note_at(8), Some(note(5, PitchClass::C)));
        assert_eq!(layout.note_at(12), Some(note(5, PitchClass::E)));
        assert_eq!(layout.note_at(24), Some(note(6, PitchClass::E)));
        assert_eq!(layout.note_at(25), None);
    }

    #[test]
    fn open_b_advances_octave_on_first_fret() {
        let layout = FretboardLayoutBuilder::new(2, note(3, PitchClass::B), 12)
            .build()
            .unwrap();
        assert_eq!(layout.frets()[0], note(4, PitchClass::C));
        assert_eq!(layout.frets()[11], note(4, PitchClass::B));
    }

    #[test]
    fn open_c_advances_octave_at_twelfth_fret() {
        let layout = FretboardLayoutBuilder::new(1, note(3, PitchClass::C), 12)
            .build()
            .unwrap();
        assert_eq!(layout.frets()[10], note(3, PitchClass::B));
        assert_eq!(layout.frets()[11], note(4, PitchClass::C));
    }

    #[test]
    fn frequency_range_spans_open_to_last_fret() {
        let layout = FretboardLayoutBuilder::new(1, note(4, PitchClass::E), 36)
            .build()
            .unwrap();
        let range = layout.frequency_range();
        assert_eq!(range.low, note(4, PitchClass::E));
        assert_eq!(range.high, note(7, PitchClass::E));
    }

    #[test]
    fn rejects_invalid_fret_counts() {
        for frets in [0, 11, 37, 39] {
            let result = FretboardLayoutBuilder::new(4, note(3, PitchClass::D), frets).build();
            assert_eq!(result, Err(FretboardError::InvalidFretCount(frets)));
        }
    }

    #[test]
    fn rejects_invalid_string_numbers() {
        for string in [0, 9] {
            let result = FretboardLayoutBuilder::new(string, note(3, PitchClass::D), 24).build();
            assert_eq!(result, Err(FretboardError::InvalidStringNumber(string)));
        }
    }

    #[test]
    fn rejects_short_cycle() {
        let cycle = &PitchClass::E.ordered_from()[..11];
        let result = FretboardLayoutBuilder::new(1, note(4, PitchClass::E), 24)
            .with_cycle(cycle)
            .build();
        assert!(matches!(
            result,
            Err(FretboardError::MalformedPitchCycle { .. })
        ));
    }

    #[test]
    fn rejects_cycle_with_duplicates() {
        let mut cycle = PitchClass::E.ordered_from();
        cycle[5] = PitchClass::E;
        let result = FretboardLayoutBuilder::new(1, note(4, PitchClass::E), 24)
            .with_cycle(&cycle)
            .build();
        assert!(matches!(
            result,
            Err(FretboardError::MalformedPitchCycle { .. })
        ));
    }

    #[test]
    fn rejects_cycle_not_starting_at_open_note() {
        let result = FretboardLayoutBuilder::new(1, note(4, PitchClass::E), 24)
            .with_cycle(&PitchClass::C.ordered_from())
            .build();
        assert!(matches!(result, Err(FretboardError::OpenNoteMismatch { .. })));
    }

    #[test]
    fn explicit_cycle_matches_default() {
        let open = note(2, PitchClass::A);
        let default = FretboardLayoutBuilder::new(5, open, 24).build().unwrap();
        let explicit = FretboardLayoutBuilder::new(5, open, 24)
            .with_cycle(&PitchClass::A.ordered_from())
            .build()
            .unwrap();
        assert_eq!(default, explicit);
    }

    #[test]
    fn rejects_layout_past_octave_nine() {
        let result = FretboardLayoutBuilder::new(1, note(9, PitchClass::A), 12).build();
        assert_eq!(result, Err(FretboardError::OctaveOutOfRange { octave: 10 }));
    }

    #[test]
    fn standard_fretboard_orders_strings() {
        let board = Fretboard::standard(8, 36).unwrap();
        let numbers: Vec<u8> = board.strings().iter().map(|s| s.string_number()).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(board.strings().iter().all(|s| s.fret_count() == 36));
        assert_eq!(board.string(8).unwrap().open_note(), note(1, PitchClass::G));
    }

    #[test]
    fn standard_fretboard_rejects_string_counts() {
        assert_eq!(
            Fretboard::standard(5, 24),
            Err(FretboardError::InvalidStringCount(5))
        );
        assert_eq!(
            Fretboard::standard(9, 24),
            Err(FretboardError::InvalidStringCount(9))
        );
    }

    #[test]
    fn duplicate_string_numbers_are_rejected() {
        let tunings = [STANDARD_TUNING[0], STANDARD_TUNING[0]];
        assert_eq!(
            Fretboard::from_tunings(&tunings, 24),
            Err(FretboardError::InvalidStringNumber(1))
        );
    }

    #[test]
    fn string_names() {
        assert_eq!(standard_string_name(1), Some("High E"));
        assert_eq!(standard_string_name(6), Some("Low E"));
        assert_eq!(standard_string_name(0), None);
        assert_eq!(standard_string_name(9), None);
    }

    #[test]
    fn positions_include_open_string() {
        let layout = FretboardLayoutBuilder::new(6, note(2, PitchClass::E), 24)
            .build()
            .unwrap();
        let frets: Vec<u8> = layout
            .positions_of(PitchClass::E)
            .iter()
            .map(|p| p.fret)
            .collect();
        assert_eq!(frets, vec![0, 12, 24]);
    }
}
