//! # Detection Pipeline
//!
//! Moves PCM frames from the capture callback to a dedicated detection
//! thread and publishes one [`DetectionEvent`] per analysed frame.
//!
//! The capture side must never block, so the frame queue is bounded and
//! drops its oldest frame when full. Detection always sees the freshest
//! audio available.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Context;
use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::error::FretboardError;
use crate::matcher::FrequencyMatcher;
use crate::note::PitchedNote;
use crate::pitch::PitchDetector;

/// One frame of 16-bit little-endian mono PCM.
pub type Frame = Vec<u8>;

/// Creates a bounded frame queue holding at most `capacity` frames.
///
/// A `capacity` of zero is treated as one.
pub fn frame_queue(capacity: usize) -> (FrameSender, FrameReceiver) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    let sender = FrameSender {
        tx,
        evict: rx.clone(),
        dropped: Arc::new(AtomicU64::new(0)),
        consumer_gone: Arc::new(AtomicBool::new(false)),
    };
    (sender, FrameReceiver { rx })
}

/// Producer half of the frame queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: Sender<Frame>,
    // Receiver clone used only to evict the oldest frame when full.
    evict: Receiver<Frame>,
    dropped: Arc<AtomicU64>,
    consumer_gone: Arc<AtomicBool>,
}

impl FrameSender {
    /// Queues `frame` without blocking.
    ///
    /// Returns `true` when an older frame had to be discarded to make room.
    /// Once the [`FrameReceiver`] is gone frames are discarded unqueued and
    /// are not counted as drops.
    pub fn push(&self, frame: Frame) -> bool {
        if self.is_disconnected() {
            if !self.consumer_gone.swap(true, Ordering::Relaxed) {
                tracing::debug!("frame consumer gone, discarding captured frames");
                while self.evict.try_recv().is_ok() {}
            }
            return false;
        }
        let mut frame = frame;
        let mut evicted = false;
        loop {
            match self.tx.try_send(frame) {
                Ok(()) => return evicted,
                Err(TrySendError::Full(rejected)) => {
                    if self.evict.try_recv().is_ok() {
                        evicted = true;
                        let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                        tracing::warn!(total, "detection is falling behind, dropped oldest frame");
                    }
                    frame = rejected;
                }
                // Unreachable while `evict` is alive.
                Err(TrySendError::Disconnected(_)) => return evicted,
            }
        }
    }

    /// Whether the [`FrameReceiver`] has been dropped.
    pub fn is_disconnected(&self) -> bool {
        // `evict` is always one of the receivers.
        self.tx.receiver_count() <= 1
    }

    /// Frames discarded so far across every clone of this sender.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Frames currently waiting in the queue.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

/// Consumer half of the frame queue.
#[derive(Debug)]
pub struct FrameReceiver {
    rx: Receiver<Frame>,
}

impl FrameReceiver {
    /// Takes the next frame, or `None` if the queue is currently empty.
    pub fn try_recv(&self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }

    /// Blocks for at most `timeout` waiting for a frame.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Frame> {
        self.rx.recv_timeout(timeout).ok()
    }
}

/// Result of analysing one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionEvent {
    /// Detected fundamental in Hz, `None` when no clear pitch was present.
    pub frequency: Option<f64>,
    /// The current target the frequency matched, if any.
    pub matched: Option<PitchedNote>,
}

enum Command {
    SetTargets(Vec<PitchedNote>),
    Shutdown,
}

/// Handle to the detection thread.
#[derive(Debug)]
pub struct DetectionWorker {
    commands: Sender<Command>,
    thread_handle: Option<JoinHandle<()>>,
}

impl DetectionWorker {
    /// Spawns the detection thread.
    ///
    /// Every frame from `frames` is run through `detector` at `sample_rate`;
    /// detected pitches are matched against `targets`. Events go to the
    /// returned receiver. The thread exits on [`shutdown`](Self::shutdown),
    /// when every [`FrameSender`] is dropped, or when the event receiver is
    /// dropped.
    pub fn spawn(
        frames: FrameReceiver,
        detector: PitchDetector,
        matcher: FrequencyMatcher,
        targets: Vec<PitchedNote>,
        sample_rate: f64,
    ) -> anyhow::Result<(Self, Receiver<DetectionEvent>)> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(FretboardError::InvalidArgument(format!(
                "sample rate must be positive: {sample_rate}"
            ))
            .into());
        }
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let (command_tx, command_rx) = crossbeam_channel::unbounded();

        let thread_handle = thread::Builder::new()
            .name("pitch-detection".to_string())
            .spawn(move || {
                run_detection_loop(
                    frames,
                    command_rx,
                    event_tx,
                    &detector,
                    &matcher,
                    targets,
                    sample_rate,
                )
            })
            .context("spawning pitch detection thread")?;

        Ok((
            Self {
                commands: command_tx,
                thread_handle: Some(thread_handle),
            },
            event_rx,
        ))
    }

    /// Replaces the notes that count as a match.
    pub fn set_targets(&self, targets: Vec<PitchedNote>) {
        if self.commands.send(Command::SetTargets(targets)).is_err() {
            tracing::debug!("detection thread already stopped, targets ignored");
        }
    }

    /// Stops the thread and waits for it to finish.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                tracing::error!("pitch detection thread panicked");
            }
        }
    }
}

impl Drop for DetectionWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_detection_loop(
    frames: FrameReceiver,
    commands: Receiver<Command>,
    events: Sender<DetectionEvent>,
    detector: &PitchDetector,
    matcher: &FrequencyMatcher,
    mut targets: Vec<PitchedNote>,
    sample_rate: f64,
) {
    tracing::debug!(sample_rate, targets = targets.len(), "detection loop started");
    loop {
        crossbeam_channel::select! {
            recv(frames.rx) -> msg => match msg {
                Ok(frame) => {
                    let event = analyse_frame(&frame, detector, matcher, &targets, sample_rate);
                    if events.send(event).is_err() {
                        tracing::debug!("event receiver dropped");
                        break;
                    }
                }
                // Only reported once every queued frame has been taken.
                Err(_) => {
                    tracing::debug!("frame queue closed");
                    break;
                }
            },
            recv(commands) -> msg => match msg {
                Ok(Command::SetTargets(next)) => targets = next,
                Ok(Command::Shutdown) | Err(_) => break,
            },
        }
    }
    tracing::debug!("detection loop finished");
}

fn analyse_frame(
    frame: &[u8],
    detector: &PitchDetector,
    matcher: &FrequencyMatcher,
    targets: &[PitchedNote],
    sample_rate: f64,
) -> DetectionEvent {
    let started = Instant::now();
    let frequency = match detector.detect(frame, sample_rate) {
        Ok(frequency) => frequency,
        Err(err) => {
            tracing::warn!(%err, "frame skipped");
            None
        }
    };
    let matched = frequency.and_then(|hz| matcher.find_match(hz, targets));

    let elapsed = started.elapsed();
    if let Ok(budget) = Duration::try_from_secs_f64((frame.len() / 2) as f64 / sample_rate) {
        if elapsed > budget {
            tracing::warn!(?elapsed, ?budget, "detection slower than real time");
        }
    }
    if let Some(note) = matched {
        tracing::debug!(%note, hz = frequency, "target matched");
    }
    DetectionEvent { frequency, matched }
}
