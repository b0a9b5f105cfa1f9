//! Events emitted to the embedding UI layer.
//!
//! Events are serialized with a `type` tag so an adapter (Tauri listener,
//! SSE handler, WebSocket bridge) can forward them verbatim:
//!
//! ```json
//! { "type": "state_changed", "state": "speaking" }
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::controller::PlaybackState;
use crate::engine::Voice;

/// Events emitted by the catalog and controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpeechEvent {
    /// Playback state changed.
    StateChanged {
        /// The new state.
        state: PlaybackState,
    },

    /// The voice catalog was replaced with a fresh sorted list.
    VoicesChanged {
        /// The new sorted, deduplicated list.
        voices: Vec<Voice>,
        /// The selected voice name after this refresh (may be stale with
        /// respect to `voices`; empty when nothing is resolved yet).
        selected: String,
    },

    /// An utterance was handed to the engine.
    SpeakingStarted,

    /// The active utterance reached a terminal signal or was stopped.
    ///
    /// Engine-reported playback errors fold into this event — the platform
    /// offers no actionable detail, and the user's remedy is identical.
    SpeakingFinished,
}

/// Send `event` best-effort — if the receiver is dropped, log and move on.
pub(crate) fn emit(tx: &mpsc::UnboundedSender<SpeechEvent>, event: SpeechEvent) {
    if tx.send(event).is_err() {
        tracing::warn!("Speech event receiver dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(&SpeechEvent::StateChanged {
            state: PlaybackState::Speaking,
        })
        .unwrap();
        assert_eq!(json["type"], "state_changed");
        assert_eq!(json["state"], "speaking");
    }

    #[test]
    fn voices_changed_carries_camel_case_voices() {
        let event = SpeechEvent::VoicesChanged {
            voices: vec![Voice {
                name: "Karen".to_owned(),
                lang: "en-AU".to_owned(),
                is_default: true,
            }],
            selected: "Karen".to_owned(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "voices_changed");
        assert_eq!(json["voices"][0]["isDefault"], true);
    }

    #[test]
    fn emit_survives_dropped_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        emit(&tx, SpeechEvent::SpeakingStarted);
    }
}
