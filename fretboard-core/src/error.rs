//! Error types for the fretboard core.
//!
//! Only invalid configuration and malformed input are errors. A buffer with
//! no confident pitch, or a pitch that matches no target, is reported as
//! `None` by the components that produce it.

use thiserror::Error;

/// Errors raised when a value handed to the core violates its contract.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FretboardError {
    /// Octave outside the span covered by the frequency table (0..=9).
    #[error("octave {octave} is outside the supported range 0..=9")]
    OctaveOutOfRange {
        /// The rejected octave number.
        octave: u8,
    },

    /// Fret count outside 12..=36.
    #[error("invalid fret count provided: {0}")]
    InvalidFretCount(u8),

    /// String number outside 1..=8.
    #[error("invalid string number provided: {0}")]
    InvalidStringNumber(u8),

    /// String count outside 6..=8.
    #[error("invalid string count provided: {0}")]
    InvalidStringCount(u8),

    /// A pitch-class cycle that is not 12 distinct entries.
    #[error("malformed pitch-class cycle: {reason}")]
    MalformedPitchCycle {
        /// What was wrong with the cycle.
        reason: String,
    },

    /// The pitch-class cycle does not start at the open string's note.
    #[error("open string note {open} does not equal the first note of the cycle {first}")]
    OpenNoteMismatch {
        /// Display name of the open string's pitch class.
        open: String,
        /// Display name of the cycle's first entry.
        first: String,
    },

    /// Malformed call argument such as an empty audio buffer.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A note name that could not be parsed.
    #[error("unknown note name: {0}")]
    UnknownNote(String),

    /// Settings that fail validation.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FretboardError>;
