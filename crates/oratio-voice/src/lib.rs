//! Voice catalog and utterance lifecycle controller over a host
//! speech-synthesis engine.
//!
//! The host engine (browser `speechSynthesis`, a desktop TTS service, a
//! test double) is consumed through the [`SpeechEngine`] trait; this crate
//! owns everything stateful around it:
//!
//! - [`VoiceCatalog`] — discovers and normalises the host's voice list,
//!   which arrives asynchronously and can change at any time, and resolves
//!   a default selection without ever discarding an explicit one.
//! - [`UtteranceController`] — the single-utterance play/stop state machine,
//!   reconciling caller intent against real engine completion signals.
//! - [`SpeechSession`] — the facade a UI layer drives: settings snapshot,
//!   voice selection, speak/stop, one event channel out.
//!
//! No audio is buffered or transmitted here and nothing persists across
//! sessions; all state is process-lifetime only.

#![deny(unused_crate_dependencies)]

pub mod catalog;
pub mod controller;
pub mod engine;
pub mod error;
pub mod events;
pub mod session;

// Re-export key types for convenience
pub use catalog::VoiceCatalog;
pub use controller::{
    PITCH_MAX, PITCH_MIN, PlaybackState, RATE_MAX, RATE_MIN, SpeechRequest, UtteranceController,
};
pub use engine::{
    ListenerToken, SpeechEngine, Utterance, UtteranceCallback, Voice, VoicesChangedListener,
};
pub use error::SpeechError;
pub use events::SpeechEvent;
pub use session::{DEFAULT_TEXT, SpeechSession, SpeechSettings};
