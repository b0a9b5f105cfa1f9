//! Speech session — the facade an embedding UI layer drives.
//!
//! Wires one engine, one [`VoiceCatalog`] and one [`UtteranceController`]
//! onto a single event channel, and owns the user-editable
//! [`SpeechSettings`] snapshot. The UI mutates the snapshot field by field
//! (text edits, slider drags, voice picks); nothing is read back out of it
//! until the instant [`SpeechSession::speak`] fires, when the settings and
//! the resolved voice are frozen into one [`SpeechRequest`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::catalog::VoiceCatalog;
use crate::controller::{
    PITCH_MAX, PITCH_MIN, PlaybackState, RATE_MAX, RATE_MIN, SpeechRequest, UtteranceController,
};
use crate::engine::{SpeechEngine, Voice};
use crate::error::SpeechError;
use crate::events::SpeechEvent;

/// Text a fresh session offers before the user types anything.
pub const DEFAULT_TEXT: &str = "Welcome to the text-to-speech studio. \
     Pick a voice, tune the sliders, and press Speak to hear this text aloud.";

// ── Settings snapshot ──────────────────────────────────────────────

/// User-editable utterance settings.
///
/// A plain mutable snapshot, not an observable: the UI owns these values
/// and the session reads them by value only when a Speak action fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechSettings {
    /// Text to speak.
    pub text: String,

    /// Speech rate multiplier (0.5–2.0).
    pub rate: f32,

    /// Pitch multiplier (0.5–2.0).
    pub pitch: f32,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT.to_owned(),
            rate: 1.0,
            pitch: 1.0,
        }
    }
}

// ── Session ────────────────────────────────────────────────────────

/// One speech-synthesis session: catalog + controller + settings.
pub struct SpeechSession {
    catalog: VoiceCatalog,
    controller: UtteranceController,
    settings: SpeechSettings,
}

impl SpeechSession {
    /// Create a session over `engine`.
    ///
    /// Returns the session and the receiver for [`SpeechEvent`]s. When the
    /// host capability is absent the session still constructs — permanently
    /// degraded to an inert "unsupported" state.
    pub fn new(engine: Arc<dyn SpeechEngine>) -> (Self, mpsc::UnboundedReceiver<SpeechEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let catalog = VoiceCatalog::new(Arc::clone(&engine), event_tx.clone());
        let controller = UtteranceController::new(engine, event_tx);
        tracing::info!(
            supported = catalog.is_supported(),
            "Speech session created"
        );
        (
            Self {
                catalog,
                controller,
                settings: SpeechSettings::default(),
            },
            event_rx,
        )
    }

    /// Whether the host exposes speech synthesis at all.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        self.catalog.is_supported()
    }

    // ── Settings ───────────────────────────────────────────────────

    /// Current utterance text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.settings.text
    }

    /// Replace the utterance text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.settings.text = text.into();
    }

    /// Restore the default welcome text.
    pub fn reset_text(&mut self) {
        self.settings.text = DEFAULT_TEXT.to_owned();
    }

    /// Current speech rate multiplier.
    #[must_use]
    pub const fn rate(&self) -> f32 {
        self.settings.rate
    }

    /// Set the speech rate, clamped to 0.5–2.0.
    pub fn set_rate(&mut self, rate: f32) {
        self.settings.rate = rate.clamp(RATE_MIN, RATE_MAX);
    }

    /// Current pitch multiplier.
    #[must_use]
    pub const fn pitch(&self) -> f32 {
        self.settings.pitch
    }

    /// Set the pitch, clamped to 0.5–2.0.
    pub fn set_pitch(&mut self, pitch: f32) {
        self.settings.pitch = pitch.clamp(PITCH_MIN, PITCH_MAX);
    }

    // ── Voices ─────────────────────────────────────────────────────

    /// The sorted, deduplicated voice list.
    #[must_use]
    pub fn voices(&self) -> Vec<Voice> {
        self.catalog.voices()
    }

    /// The selected voice name; empty while nothing is resolved yet.
    #[must_use]
    pub fn selected_voice_name(&self) -> String {
        self.catalog.selected_voice_name()
    }

    /// Select a voice by name.
    pub fn select_voice(&self, name: impl Into<String>) {
        self.catalog.select(name);
    }

    /// Re-pull the voice list from the engine.
    pub fn refresh_voices(&self) {
        self.catalog.refresh();
    }

    // ── Playback ───────────────────────────────────────────────────

    /// Current playback state.
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.controller.state()
    }

    /// Whether an utterance is in flight.
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.controller.is_speaking()
    }

    /// Whether a Speak action would currently be accepted.
    #[must_use]
    pub fn can_speak(&self) -> bool {
        self.is_supported() && !self.settings.text.trim().is_empty()
    }

    /// Freeze the current settings and resolved voice into one request and
    /// hand it to the controller. Fire-and-forget.
    pub fn speak(&self) -> Result<(), SpeechError> {
        let request = SpeechRequest {
            text: self.settings.text.clone(),
            rate: self.settings.rate,
            pitch: self.settings.pitch,
            voice: self.catalog.resolve_selected(),
        };
        self.controller.speak(request)
    }

    /// Stop whatever is being spoken. Idempotent.
    pub fn stop(&self) -> Result<(), SpeechError> {
        self.controller.stop()
    }

    /// Tear down the voices-changed subscription. Also runs on drop.
    pub fn close(&mut self) {
        self.catalog.close();
    }
}
