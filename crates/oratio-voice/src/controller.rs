//! Utterance lifecycle controller — the single-utterance play/stop state machine.
//!
//! ```text
//!   Idle ──speak()──▶ Speaking ──finished/errored/stop()──▶ Idle
//!                        │
//!                        └──speak()──▶ Speaking   (last action wins)
//! ```
//!
//! One utterance at a time, no queueing: a new `speak` always supersedes
//! whatever audio is in flight. The controller trusts real engine signals
//! over its own intent — the engine's "currently speaking" flag is re-read
//! before every action, and the transition back to [`PlaybackState::Idle`]
//! is driven by the engine's terminal callback, not by the caller.
//!
//! Terminal callbacks carry a generation token. A rapid speak/speak sequence
//! leaves the first utterance's callback dangling; when it eventually fires,
//! its stale generation is detected and the callback is ignored instead of
//! flipping state under the newer utterance.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::engine::{SpeechEngine, Utterance, UtteranceCallback, Voice};
use crate::error::SpeechError;
use crate::events::{SpeechEvent, emit};

/// Lower bound for the speech rate multiplier.
pub const RATE_MIN: f32 = 0.5;

/// Upper bound for the speech rate multiplier.
pub const RATE_MAX: f32 = 2.0;

/// Lower bound for the pitch multiplier.
pub const PITCH_MIN: f32 = 0.5;

/// Upper bound for the pitch multiplier.
pub const PITCH_MAX: f32 = 2.0;

// ── Playback state machine ─────────────────────────────────────────

/// Current playback state. Initial `Idle`, cyclic, no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Nothing is being spoken.
    Idle,

    /// An utterance has been handed to the engine and has not reached a
    /// terminal signal yet.
    Speaking,
}

// ── Speech request ─────────────────────────────────────────────────

/// The frozen parameters of one utterance.
///
/// Built by value at the instant a Speak action fires; later catalog or
/// settings changes never retroactively alter a request already issued.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    /// Text to speak. Must not be empty or whitespace-only.
    pub text: String,

    /// Speech rate multiplier; clamped to 0.5–2.0 at issue time.
    pub rate: f32,

    /// Pitch multiplier; clamped to 0.5–2.0 at issue time.
    pub pitch: f32,

    /// Resolved voice, or `None` for the engine's own default.
    pub voice: Option<Voice>,
}

impl SpeechRequest {
    /// A request for `text` at neutral rate and pitch with no explicit voice.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rate: 1.0,
            pitch: 1.0,
            voice: None,
        }
    }
}

// ── Shared playback flags ──────────────────────────────────────────

/// Playback state shared with the terminal callbacks.
///
/// Callbacks may fire from whatever context the engine runs them in, so the
/// state lives in atomics rather than fields behind `&mut self`.
struct PlaybackShared {
    /// Whether the controller considers an utterance in flight.
    speaking: AtomicBool,

    /// Monotonic utterance generation. Each `speak` (and each `stop`)
    /// advances it; a terminal callback is honoured only while its own
    /// generation is still the current one.
    generation: AtomicU64,

    event_tx: mpsc::UnboundedSender<SpeechEvent>,
}

impl PlaybackShared {
    /// Handle a terminal signal for the utterance issued at `generation`.
    fn finish(&self, generation: u64) {
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "Terminal signal for superseded utterance ignored");
            return;
        }
        if self.speaking.swap(false, Ordering::SeqCst) {
            tracing::debug!("Playback state transition: speaking → idle");
            emit(&self.event_tx, SpeechEvent::SpeakingFinished);
            emit(
                &self.event_tx,
                SpeechEvent::StateChanged {
                    state: PlaybackState::Idle,
                },
            );
        }
    }
}

// ── Controller ─────────────────────────────────────────────────────

/// Owns the play/stop state machine for "the current thing being spoken".
pub struct UtteranceController {
    engine: Arc<dyn SpeechEngine>,
    shared: Arc<PlaybackShared>,
    supported: bool,
}

impl UtteranceController {
    /// Create a controller over `engine`, probing the capability once.
    pub fn new(
        engine: Arc<dyn SpeechEngine>,
        event_tx: mpsc::UnboundedSender<SpeechEvent>,
    ) -> Self {
        let supported = engine.is_available();
        Self {
            engine,
            shared: Arc::new(PlaybackShared {
                speaking: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                event_tx,
            }),
            supported,
        }
    }

    /// Current playback state.
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        if self.shared.speaking.load(Ordering::SeqCst) {
            PlaybackState::Speaking
        } else {
            PlaybackState::Idle
        }
    }

    /// Whether the controller considers an utterance in flight.
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.shared.speaking.load(Ordering::SeqCst)
    }

    /// Issue one utterance built from `request`. Fire-and-forget.
    ///
    /// If the engine is already speaking anything — including a stray
    /// utterance this controller never issued — a cancel goes out first.
    /// Calling `speak` while already `Speaking` is exactly that interruption
    /// path, not an error. Resolution back to `Idle` is observed only
    /// through the engine's terminal callback.
    pub fn speak(&self, request: SpeechRequest) -> Result<(), SpeechError> {
        if !self.supported {
            return Err(SpeechError::Unsupported);
        }
        if request.text.trim().is_empty() {
            return Err(SpeechError::EmptyText);
        }

        // Last action wins. Re-queried from the engine every time — the
        // speaking flag is process-wide state other code can affect.
        if self.engine.is_speaking() {
            tracing::debug!("Engine busy — cancelling in-flight utterance");
            self.engine.cancel();
        }

        // New generation: every outstanding terminal callback is now stale.
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let on_end: UtteranceCallback = {
            let shared = Arc::clone(&self.shared);
            Box::new(move || shared.finish(generation))
        };
        // Finished and errored are treated identically: the engine offers no
        // actionable detail, so both just return the controller to idle.
        let on_error: UtteranceCallback = {
            let shared = Arc::clone(&self.shared);
            Box::new(move || shared.finish(generation))
        };

        let utterance = Utterance {
            text: request.text,
            rate: request.rate.clamp(RATE_MIN, RATE_MAX),
            pitch: request.pitch.clamp(PITCH_MIN, PITCH_MAX),
            voice: request.voice,
            on_end: Some(on_end),
            on_error: Some(on_error),
        };

        tracing::debug!(
            text_len = utterance.text.len(),
            rate = utterance.rate,
            pitch = utterance.pitch,
            voice = utterance.voice.as_ref().map(|v| v.name.as_str()),
            generation,
            "Issuing utterance"
        );

        if !self.shared.speaking.swap(true, Ordering::SeqCst) {
            emit(
                &self.shared.event_tx,
                SpeechEvent::StateChanged {
                    state: PlaybackState::Speaking,
                },
            );
        }
        emit(&self.shared.event_tx, SpeechEvent::SpeakingStarted);

        self.engine.speak(utterance);
        Ok(())
    }

    /// Cancel whatever is in flight and force `Idle`. Idempotent.
    ///
    /// The local transition is unconditional: even if the engine swallows
    /// the terminal event for the cancelled utterance, the controller never
    /// stays stuck in `Speaking`.
    pub fn stop(&self) -> Result<(), SpeechError> {
        if !self.supported {
            return Err(SpeechError::Unsupported);
        }

        // Invalidate outstanding terminal callbacks before touching the
        // engine — a late signal for the cancelled utterance must not be
        // taken for a real transition.
        self.shared.generation.fetch_add(1, Ordering::SeqCst);

        if self.engine.is_speaking() {
            self.engine.cancel();
        }

        if self.shared.speaking.swap(false, Ordering::SeqCst) {
            tracing::debug!("Playback stopped by caller");
            emit(&self.shared.event_tx, SpeechEvent::SpeakingFinished);
            emit(
                &self.shared.event_tx,
                SpeechEvent::StateChanged {
                    state: PlaybackState::Idle,
                },
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared() -> (Arc<PlaybackShared>, mpsc::UnboundedReceiver<SpeechEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(PlaybackShared {
                speaking: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                event_tx: tx,
            }),
            rx,
        )
    }

    #[test]
    fn request_defaults_are_neutral() {
        let request = SpeechRequest::new("hello");
        assert!((request.rate - 1.0).abs() < f32::EPSILON);
        assert!((request.pitch - 1.0).abs() < f32::EPSILON);
        assert!(request.voice.is_none());
    }

    #[test]
    fn finish_with_current_generation_goes_idle() {
        let (shared, mut rx) = shared();
        shared.speaking.store(true, Ordering::SeqCst);
        shared.generation.store(3, Ordering::SeqCst);

        shared.finish(3);

        assert!(!shared.speaking.load(Ordering::SeqCst));
        assert!(matches!(rx.try_recv(), Ok(SpeechEvent::SpeakingFinished)));
    }

    #[test]
    fn finish_with_stale_generation_is_ignored() {
        let (shared, mut rx) = shared();
        shared.speaking.store(true, Ordering::SeqCst);
        shared.generation.store(4, Ordering::SeqCst);

        shared.finish(3);

        assert!(shared.speaking.load(Ordering::SeqCst), "state must not flip");
        assert!(rx.try_recv().is_err(), "no events for a stale signal");
    }

    #[test]
    fn finish_twice_emits_once() {
        let (shared, mut rx) = shared();
        shared.speaking.store(true, Ordering::SeqCst);
        shared.generation.store(1, Ordering::SeqCst);

        shared.finish(1);
        shared.finish(1);

        let mut finished = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, SpeechEvent::SpeakingFinished) {
                finished += 1;
            }
        }
        assert_eq!(finished, 1);
    }
}
