//! Host-engine boundary — the trait the rest of the crate drives.
//!
//! This module defines the [`SpeechEngine`] trait that abstracts over the
//! platform's speech-synthesis capability (browser `speechSynthesis`, a
//! desktop TTS service, a test double). The [`VoiceCatalog`](crate::catalog::VoiceCatalog)
//! and [`UtteranceController`](crate::controller::UtteranceController) operate
//! on a trait object (`Arc<dyn SpeechEngine>`) so that hosts can be swapped
//! without touching the catalog or lifecycle logic.
//!
//! The boundary is deliberately narrow and callback-based: the host never
//! hands back an awaitable value. `speak` returns immediately and the
//! engine reports the utterance outcome later through the callbacks carried
//! on the [`Utterance`] itself.

use serde::{Deserialize, Serialize};

// ── Shared types ───────────────────────────────────────────────────

/// One synthesis voice offered by the host engine.
///
/// Voices are immutable snapshots supplied by the engine; the catalog never
/// mutates one, only replaces its whole list. Identity for list purposes is
/// the `(name, lang)` pair — names alone are not guaranteed unique across
/// languages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voice {
    /// Display name, also the key used for selection.
    pub name: String,

    /// BCP-47 language tag (e.g. `"en-US"`).
    pub lang: String,

    /// Whether the host flags this voice as its own default.
    pub is_default: bool,
}

/// Terminal callback for one utterance — fired at most once.
pub type UtteranceCallback = Box<dyn FnOnce() + Send>;

/// Listener invoked by the host when its voice set may have changed.
pub type VoicesChangedListener = Box<dyn Fn() + Send + Sync>;

/// Identifies one voices-changed registration.
///
/// Returned by [`SpeechEngine::subscribe_voices_changed`] and required by
/// [`SpeechEngine::unsubscribe_voices_changed`], so that an owner can only
/// tear down a registration it actually installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(pub u64);

/// One request to synthesize speech from a frozen configuration.
///
/// Built by the controller at the instant a Speak action fires; later
/// catalog or settings changes never alter an utterance already in flight.
pub struct Utterance {
    /// Text to synthesize. Non-empty by the time it reaches the engine.
    pub text: String,

    /// Speech rate multiplier, clamped to 0.5–2.0.
    pub rate: f32,

    /// Pitch multiplier, clamped to 0.5–2.0.
    pub pitch: f32,

    /// Resolved voice, or `None` to let the engine use its own default.
    pub voice: Option<Voice>,

    /// Fired when the engine finishes speaking this utterance.
    pub on_end: Option<UtteranceCallback>,

    /// Fired when the engine fails to speak this utterance.
    pub on_error: Option<UtteranceCallback>,
}

impl std::fmt::Debug for Utterance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Callbacks are opaque; show the frozen parameters only.
        f.debug_struct("Utterance")
            .field("text", &self.text)
            .field("rate", &self.rate)
            .field("pitch", &self.pitch)
            .field("voice", &self.voice)
            .finish_non_exhaustive()
    }
}

// ── Engine trait ───────────────────────────────────────────────────

/// Host speech-synthesis capability.
///
/// Implementations are handles over host state and take `&self` everywhere;
/// interior mutability is the implementation's concern. All methods return
/// synchronously — consequential state changes surface later through the
/// callbacks and the voices-changed listener.
///
/// # Contract
///
/// - The "currently speaking" flag is process-wide singleton state that
///   other code may also affect; callers must re-query it rather than trust
///   their own last-known value.
/// - For an accepted utterance the engine fires exactly one of
///   `on_end`/`on_error`, at most once — unless the utterance is cancelled,
///   in which case the terminal signal may be suppressed entirely. Callers
///   must not depend on a terminal signal after issuing a cancel.
/// - The voices-changed listener slot is single-slot: installing a listener
///   **replaces** any previous one. The engine must not hold internal locks
///   while invoking the listener, because the listener re-enters
///   [`voices()`](SpeechEngine::voices).
pub trait SpeechEngine: Send + Sync {
    /// Whether speech synthesis exists in this environment at all.
    ///
    /// Probed once at startup; when `false`, no other method is called.
    fn is_available(&self) -> bool;

    /// Snapshot of the currently known voices, in host-native order.
    ///
    /// Cheap and synchronous. May legitimately be empty while the host is
    /// still enumerating voices asynchronously.
    fn voices(&self) -> Vec<Voice>;

    /// Install `listener` in the single voices-changed slot, replacing any
    /// previous registration, and return a token identifying this one.
    fn subscribe_voices_changed(&self, listener: VoicesChangedListener) -> ListenerToken;

    /// Clear the voices-changed slot, but only if the installed registration
    /// still carries `token`.
    ///
    /// A stale token is a no-op: a listener installed later by another owner
    /// is never clobbered. Idempotent.
    fn unsubscribe_voices_changed(&self, token: ListenerToken);

    /// Hand one utterance to the engine. Fire-and-forget.
    fn speak(&self, utterance: Utterance);

    /// Whether the engine is currently speaking anything — including an
    /// utterance issued by code outside this crate.
    fn is_speaking(&self) -> bool;

    /// Cancel whatever utterance is in flight, if any.
    fn cancel(&self);
}
