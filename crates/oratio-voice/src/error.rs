//! Speech controller error types.

/// Errors surfaced by the speech controller.
///
/// The taxonomy is deliberately small: empty voice enumerations retry on the
/// next change notification, playback errors reset the controller to idle,
/// and a stale voice selection falls back to the engine's default voice —
/// none of those reach the caller as an error.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    /// Speech synthesis does not exist in this environment.
    #[error("Speech synthesis is not supported on this platform")]
    Unsupported,

    /// Utterance text was empty or whitespace-only.
    #[error("Utterance text is empty")]
    EmptyText,
}
