//! # Note Model
//!
//! The twelve pitch classes of equal temperament and the `PitchedNote`
//! value object (a pitch class in a specific octave). Ordinals follow the
//! chromatic order starting at C and are used both for stepping around the
//! cycle and as table indices.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::FretboardError;

/// Number of pitch classes in one octave.
pub const NOTES_PER_OCTAVE: usize = 12;

/// Highest octave number supported by the frequency table.
pub const MAX_OCTAVE: u8 = 9;

/// One of the twelve chromatic pitch classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    /// All pitch classes in chromatic order starting at C.
    pub const ALL: [PitchClass; NOTES_PER_OCTAVE] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Position in the chromatic cycle, C = 0 through B = 11.
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// Pitch class at `ordinal`, wrapping modulo 12.
    pub const fn from_ordinal(ordinal: usize) -> PitchClass {
        Self::ALL[ordinal % NOTES_PER_OCTAVE]
    }

    /// Name shown to the player, with both spellings for accidentals.
    pub const fn display_name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C♯/D♭",
            PitchClass::D => "D",
            PitchClass::DSharp => "D♯/E♭",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F♯/G♭",
            PitchClass::G => "G",
            PitchClass::GSharp => "G♯/A♭",
            PitchClass::A => "A",
            PitchClass::ASharp => "A♯/B♭",
            PitchClass::B => "B",
        }
    }

    /// Short sharp spelling used in note names ("C♯").
    pub const fn sharp_name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C♯",
            PitchClass::D => "D",
            PitchClass::DSharp => "D♯",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F♯",
            PitchClass::G => "G",
            PitchClass::GSharp => "G♯",
            PitchClass::A => "A",
            PitchClass::ASharp => "A♯",
            PitchClass::B => "B",
        }
    }

    /// Returns true for the five accidentals.
    pub const fn is_accidental(self) -> bool {
        matches!(
            self,
            PitchClass::CSharp
                | PitchClass::DSharp
                | PitchClass::FSharp
                | PitchClass::GSharp
                | PitchClass::ASharp
        )
    }

    /// Moves around the cycle by `semitones`, in either direction.
    pub fn transpose(self, semitones: i32) -> PitchClass {
        let ordinal = (self.ordinal() as i32 + semitones).rem_euclid(NOTES_PER_OCTAVE as i32);
        Self::from_ordinal(ordinal as usize)
    }

    /// The chromatic cycle rotated to start at `self`.
    ///
    /// `PitchClass::C.ordered_from()` is the natural order.
    pub fn ordered_from(self) -> [PitchClass; NOTES_PER_OCTAVE] {
        std::array::from_fn(|i| Self::from_ordinal(self.ordinal() + i))
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Every accepted spelling of a pitch class, keyed by its text.
///
/// Accidentals are accepted as sharps or flats, in ASCII (`#`, `b`) or
/// Unicode (`♯`, `♭`), and as the combined display name.
static PITCH_CLASS_NAMES: Lazy<BTreeMap<String, PitchClass>> = Lazy::new(|| {
    const LETTERS: [&str; NOTES_PER_OCTAVE] = [
        "C", "C", "D", "D", "E", "F", "F", "G", "G", "A", "A", "B",
    ];
    let mut names = BTreeMap::new();

    for pitch_class in PitchClass::ALL {
        names.insert(pitch_class.display_name().to_string(), pitch_class);
        if pitch_class.is_accidental() {
            let below = LETTERS[pitch_class.ordinal()];
            let above = LETTERS[pitch_class.ordinal() + 1];
            for sharp in ["#", "♯"] {
                names.insert(format!("{below}{sharp}"), pitch_class);
            }
            for flat in ["b", "♭"] {
                names.insert(format!("{above}{flat}"), pitch_class);
            }
        }
    }
    names
});

impl FromStr for PitchClass {
    type Err = FretboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PITCH_CLASS_NAMES
            .get(s.trim())
            .copied()
            .ok_or_else(|| FretboardError::UnknownNote(s.to_string()))
    }
}

/// A specific audible note: a pitch class in one octave.
///
/// Ordering follows pitch (octave first, then pitch class).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PitchedNote {
    /// Scientific octave number, 0..=9.
    pub octave: u8,
    /// Pitch class within the octave.
    pub pitch_class: PitchClass,
}

impl PitchedNote {
    pub const fn new(octave: u8, pitch_class: PitchClass) -> Self {
        Self {
            octave,
            pitch_class,
        }
    }

    /// Semitones above C0.
    pub const fn semitone_index(self) -> usize {
        self.octave as usize * NOTES_PER_OCTAVE + self.pitch_class.ordinal()
    }

    /// The note at `index` semitones above C0, if it lies within octaves 0..=9.
    pub fn from_semitone_index(index: usize) -> Option<Self> {
        let octave = index / NOTES_PER_OCTAVE;
        if octave > MAX_OCTAVE as usize {
            return None;
        }
        Some(Self::new(octave as u8, PitchClass::from_ordinal(index)))
    }

    /// Shifts the note by `semitones`, returning `None` when the result
    /// leaves octaves 0..=9.
    pub fn transpose(self, semitones: i32) -> Option<Self> {
        let index = self.semitone_index() as i64 + semitones as i64;
        if index < 0 {
            return None;
        }
        Self::from_semitone_index(index as usize)
    }
}

impl fmt::Display for PitchedNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class.sharp_name(), self.octave)
    }
}

impl FromStr for PitchedNote {
    type Err = FretboardError;

    /// Parses names such as "A4", "C#3", "Db2" or "A♯4".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| FretboardError::UnknownNote(s.to_string()))?;
        let (name, octave) = trimmed.split_at(split);

        let pitch_class: PitchClass = name
            .parse()
            .map_err(|_| FretboardError::UnknownNote(s.to_string()))?;
        let octave: u8 = octave
            .parse()
            .map_err(|_| FretboardError::UnknownNote(s.to_string()))?;
        if octave > MAX_OCTAVE {
            return Err(FretboardError::OctaveOutOfRange { octave });
        }

        Ok(Self::new(octave, pitch_class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_order_starts_at_c() {
        assert_eq!(PitchClass::C.ordered_from(), PitchClass::ALL);
    }

    #[test]
    fn ordered_from_rotates_the_cycle() {
        let cycle = PitchClass::E.ordered_from();
        assert_eq!(cycle[0], PitchClass::E);
        assert_eq!(cycle[7], PitchClass::B);
        assert_eq!(cycle[8], PitchClass::C);
        assert_eq!(cycle[11], PitchClass::DSharp);
    }

    #[test]
    fn display_name_for_a_sharp() {
        assert_eq!(PitchClass::ASharp.display_name(), "A♯/B♭");
    }

    #[test]
    fn transpose_wraps_both_ways() {
        assert_eq!(PitchClass::B.transpose(1), PitchClass::C);
        assert_eq!(PitchClass::C.transpose(-1), PitchClass::B);
        assert_eq!(PitchClass::E.transpose(24), PitchClass::E);
    }

    #[test]
    fn parses_every_spelling() {
        assert_eq!("C#".parse::<PitchClass>(), Ok(PitchClass::CSharp));
        assert_eq!("Db".parse::<PitchClass>(), Ok(PitchClass::CSharp));
        assert_eq!("G♭".parse::<PitchClass>(), Ok(PitchClass::FSharp));
        assert_eq!("A♯/B♭".parse::<PitchClass>(), Ok(PitchClass::ASharp));
        assert!("H".parse::<PitchClass>().is_err());
    }

    #[test]
    fn pitched_note_round_trips_through_text() {
        let note: PitchedNote = "A4".parse().unwrap();
        assert_eq!(note, PitchedNote::new(4, PitchClass::A));
        assert_eq!(note.to_string(), "A4");

        let note: PitchedNote = "Bb1".parse().unwrap();
        assert_eq!(note, PitchedNote::new(1, PitchClass::ASharp));
        assert_eq!(note.to_string(), "A♯1");
    }

    #[test]
    fn pitched_note_rejects_bad_octaves() {
        assert_eq!(
            "C12".parse::<PitchedNote>(),
            Err(FretboardError::OctaveOutOfRange { octave: 12 })
        );
        assert!("C".parse::<PitchedNote>().is_err());
    }

    #[test]
    fn transpose_crosses_octaves_at_c() {
        let b3 = PitchedNote::new(3, PitchClass::B);
        assert_eq!(b3.transpose(1), Some(PitchedNote::new(4, PitchClass::C)));
        assert_eq!(
            PitchedNote::new(0, PitchClass::C).transpose(-1),
            None
        );
        assert_eq!(PitchedNote::new(9, PitchClass::B).transpose(1), None);
    }

    #[test]
    fn ordering_follows_pitch() {
        let b2 = PitchedNote::new(2, PitchClass::B);
        let c3 = PitchedNote::new(3, PitchClass::C);
        assert!(b2 < c3);
    }
}
