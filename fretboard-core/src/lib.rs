// fretboard-core/src/lib.rs

//! The core logic for the fretboard trainer.
//! This crate turns raw PCM audio into a detected pitch, maps every fret of
//! every string to its exact note, and decides whether a played pitch is one
//! of the notes the player was asked for. It is completely headless and
//! contains no GUI code.
//!
//! Data flows one way:
//!
//! ```text
//! PCM frame -> PitchDetector -> Option<Hz> -> FrequencyMatcher -> Option<PitchedNote>
//!                                                   ^
//!                    Fretboard (target note sets) --+
//! ```
//!
//! Live microphone capture lives behind the `capture` feature.

#[cfg(feature = "capture")]
pub mod audio;
pub mod config;
pub mod drill;
pub mod error;
pub mod fft;
pub mod fretboard;
pub mod matcher;
pub mod note;
pub mod pipeline;
pub mod pitch;
pub mod tuning;

pub use config::Settings;
pub use drill::{DrillProgress, FretboardDrill, NoteAttempt, NoteGenerator};
pub use error::{FretboardError, Result};
pub use fretboard::{Fretboard, FretboardLayoutBuilder, FretPosition, StringLayout, StringTuning};
pub use matcher::FrequencyMatcher;
pub use note::{PitchClass, PitchedNote};
pub use pipeline::{DetectionEvent, DetectionWorker, FrameReceiver, FrameSender, frame_queue};
pub use pitch::{DetectorConfig, PitchDetector};
pub use tuning::NoteFrequencyTable;
