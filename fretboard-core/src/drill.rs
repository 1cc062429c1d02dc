//! # Drill Module
//!
//! Random note selection and the "find every instance" fretboard drill.
//! The drill is driven entirely by detected frequencies and timestamps, so
//! a front end only has to feed it [`DetectionEvent`](crate::pipeline::DetectionEvent)
//! frequencies and render the returned [`DrillProgress`].

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::fretboard::Fretboard;
use crate::matcher::FrequencyMatcher;
use crate::note::{NOTES_PER_OCTAVE, PitchClass, PitchedNote};

/// Notes per drill session.
pub const SESSION_NOTES: usize = 10;

/// Time goal for locating every instance of one note.
pub const TARGET_TIME: Duration = Duration::from_secs(10);

/// Picks pitch classes at random.
#[derive(Debug, Clone)]
pub struct NoteGenerator {
    rng: StdRng,
}

impl NoteGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// A reproducible generator.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Up to `count` distinct pitch classes in random order. Asking for more
    /// than twelve returns all twelve.
    pub fn generate_unique(&mut self, count: usize) -> Vec<PitchClass> {
        let mut notes = PitchClass::ALL.to_vec();
        notes.shuffle(&mut self.rng);
        notes.truncate(count.min(NOTES_PER_OCTAVE));
        notes
    }

    pub fn generate_single(&mut self) -> PitchClass {
        PitchClass::from_ordinal(self.rng.gen_range(0..NOTES_PER_OCTAVE))
    }

    /// `count` pitch classes, repeats allowed.
    pub fn generate(&mut self, count: usize) -> Vec<PitchClass> {
        (0..count).map(|_| self.generate_single()).collect()
    }
}

impl Default for NoteGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of locating every instance of one pitch class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteAttempt {
    pub pitch_class: PitchClass,
    pub elapsed: Duration,
    pub under_target: bool,
}

/// What a single detected frequency did to the drill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrillProgress {
    /// Nothing new was found.
    Unchanged,
    /// One more location of the current note was found.
    Found { note: PitchedNote, remaining: usize },
    /// The last location of the current note was found; the next note, if
    /// any, is now current.
    NoteComplete(NoteAttempt),
    /// Every note in the session has been completed.
    Finished,
}

/// A session asking the player to play every pitched instance of each
/// note, one note at a time.
///
/// Instances are distinct pitched notes, so E4 found on string 2 also
/// covers E4 on strings 1, 4 and 6.
#[derive(Debug, Clone)]
pub struct FretboardDrill {
    fretboard: Fretboard,
    matcher: FrequencyMatcher,
    notes: Vec<PitchClass>,
    index: usize,
    remaining: BTreeSet<PitchedNote>,
    note_started: Instant,
    results: Vec<NoteAttempt>,
}

impl FretboardDrill {
    /// Starts a drill over `notes`, timing the first note from `started`.
    pub fn new(
        fretboard: Fretboard,
        matcher: FrequencyMatcher,
        notes: Vec<PitchClass>,
        started: Instant,
    ) -> Self {
        let remaining = notes
            .first()
            .map(|&pc| fretboard.notes_of(pc))
            .unwrap_or_default();
        tracing::info!(notes = notes.len(), "drill started");
        Self {
            fretboard,
            matcher,
            notes,
            index: 0,
            remaining,
            note_started: started,
            results: Vec::new(),
        }
    }

    /// Starts a session of [`SESSION_NOTES`] distinct random notes.
    pub fn random(
        fretboard: Fretboard,
        matcher: FrequencyMatcher,
        generator: &mut NoteGenerator,
    ) -> Self {
        let notes = generator.generate_unique(SESSION_NOTES);
        Self::new(fretboard, matcher, notes, Instant::now())
    }

    pub fn current_note(&self) -> Option<PitchClass> {
        self.notes.get(self.index).copied()
    }

    /// Pitched instances of the current note not yet played.
    pub fn remaining(&self) -> &BTreeSet<PitchedNote> {
        &self.remaining
    }

    pub fn results(&self) -> &[NoteAttempt] {
        &self.results
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.notes.len()
    }

    /// Total time spent on completed notes.
    pub fn total_time(&self) -> Duration {
        self.results.iter().map(|attempt| attempt.elapsed).sum()
    }

    pub fn notes_under_target(&self) -> usize {
        self.results.iter().filter(|a| a.under_target).count()
    }

    /// Feeds one detected frequency observed at `now`.
    pub fn record(&mut self, detected_hz: f64, now: Instant) -> DrillProgress {
        if self.is_finished() {
            return DrillProgress::Finished;
        }
        let Some(note) = self.matcher.find_match(detected_hz, &self.remaining) else {
            return DrillProgress::Unchanged;
        };
        self.remaining.remove(&note);
        if !self.remaining.is_empty() {
            tracing::debug!(%note, remaining = self.remaining.len(), "location found");
            return DrillProgress::Found {
                note,
                remaining: self.remaining.len(),
            };
        }

        let elapsed = now.saturating_duration_since(self.note_started);
        let attempt = NoteAttempt {
            pitch_class: note.pitch_class,
            elapsed,
            under_target: elapsed <= TARGET_TIME,
        };
        self.results.push(attempt);
        tracing::info!(pitch_class = %note.pitch_class, ?elapsed, "note complete");

        self.index += 1;
        self.note_started = now;
        match self.current_note() {
            Some(next) => self.remaining = self.fretboard.notes_of(next),
            None => {
                self.remaining.clear();
                tracing::info!(
                    under_target = self.notes_under_target(),
                    total = ?self.total_time(),
                    "drill finished"
                );
            }
        }
        DrillProgress::NoteComplete(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::NoteFrequencyTable;
    use std::sync::Arc;

    fn drill(notes: Vec<PitchClass>, started: Instant) -> FretboardDrill {
        let table = Arc::new(NoteFrequencyTable::new());
        FretboardDrill::new(
            Fretboard::standard(6, 24).unwrap(),
            FrequencyMatcher::new(table),
            notes,
            started,
        )
    }

    fn hz(name: &str) -> f64 {
        NoteFrequencyTable::new().lookup(name.parse().unwrap()).unwrap()
    }

    #[test]
    fn unique_notes_are_distinct_and_capped() {
        let mut generator = NoteGenerator::seeded(42);
        let notes = generator.generate_unique(5);
        assert_eq!(notes.len(), 5);
        let distinct: BTreeSet<_> = notes.iter().collect();
        assert_eq!(distinct.len(), 5);

        let all = generator.generate_unique(20);
        assert_eq!(all.len(), 12);
        let distinct: BTreeSet<_> = all.iter().collect();
        assert_eq!(distinct.len(), 12);

        assert!(generator.generate_unique(0).is_empty());
    }

    #[test]
    fn seeded_generators_repeat() {
        let mut a = NoteGenerator::seeded(3);
        let mut b = NoteGenerator::seeded(3);
        assert_eq!(a.generate(30), b.generate(30));
        assert_eq!(a.generate_single(), b.generate_single());
    }

    #[test]
    fn generate_allows_repeats() {
        let notes = NoteGenerator::seeded(1).generate(100);
        assert_eq!(notes.len(), 100);
        let distinct: BTreeSet<_> = notes.iter().collect();
        assert!(distinct.len() < 100);
    }

    #[test]
    fn e_drill_needs_every_pitched_e() {
        let start = Instant::now();
        let mut drill = drill(vec![PitchClass::E, PitchClass::A], start);
        let expected: BTreeSet<PitchedNote> = ["E2", "E3", "E4", "E5", "E6"]
            .iter()
            .map(|n| n.parse().unwrap())
            .collect();
        assert_eq!(drill.remaining(), &expected);

        assert_eq!(drill.record(hz("A4"), start), DrillProgress::Unchanged);
        for (i, name) in ["E2", "E3", "E4", "E5"].iter().enumerate() {
            assert_eq!(
                drill.record(hz(name), start),
                DrillProgress::Found {
                    note: name.parse().unwrap(),
                    remaining: 4 - i,
                }
            );
        }
        // Playing a found location again changes nothing.
        assert_eq!(drill.record(hz("E4"), start), DrillProgress::Unchanged);

        let done = start + Duration::from_secs(4);
        assert_eq!(
            drill.record(hz("E6"), done),
            DrillProgress::NoteComplete(NoteAttempt {
                pitch_class: PitchClass::E,
                elapsed: Duration::from_secs(4),
                under_target: true,
            })
        );
        assert_eq!(drill.current_note(), Some(PitchClass::A));
        assert!(drill.remaining().contains(&"A2".parse().unwrap()));
    }

    #[test]
    fn slow_notes_miss_the_target_and_session_finishes() {
        let start = Instant::now();
        let mut drill = drill(vec![PitchClass::C], start);
        let c_notes: Vec<PitchedNote> = drill.remaining().iter().copied().collect();
        let late = start + Duration::from_secs(12);
        let mut last = DrillProgress::Unchanged;
        for note in c_notes {
            last = drill.record(hz(&note.to_string()), late);
        }
        assert!(matches!(
            last,
            DrillProgress::NoteComplete(NoteAttempt { under_target: false, .. })
        ));
        assert!(drill.is_finished());
        assert_eq!(drill.record(hz("C4"), late), DrillProgress::Finished);
        assert_eq!(drill.notes_under_target(), 0);
        assert_eq!(drill.total_time(), Duration::from_secs(12));
    }

    #[test]
    fn random_session_has_ten_notes() {
        let table = Arc::new(NoteFrequencyTable::new());
        let drill = FretboardDrill::random(
            Fretboard::standard(6, 24).unwrap(),
            FrequencyMatcher::new(table),
            &mut NoteGenerator::seeded(9),
        );
        assert!(drill.current_note().is_some());
        assert!(!drill.remaining().is_empty());
        assert!(!drill.is_finished());
    }
}
