//! Voice catalog — a stable, sorted view of the host's available voices.
//!
//! The host enumerates voices asynchronously: an early query may
//! legitimately return an empty list, and the full set can be re-announced
//! at any time through the voices-changed notification. The catalog absorbs
//! both quirks — an empty snapshot never erases a populated catalog, and
//! every notification re-runs the refresh.
//!
//! Selection policy: the first non-empty refresh resolves a default (the
//! host-flagged default voice, else the first voice in sort order). After
//! that the selection is **never** silently reassigned, even if the selected
//! name disappears from a later list. Resolving a stale selection to "no
//! voice" is the consumer's job at use time, via [`VoiceCatalog::resolve_selected`].

use std::sync::{Arc, Mutex, Weak};

use tokio::sync::mpsc;

use crate::engine::{ListenerToken, SpeechEngine, Voice};
use crate::events::{SpeechEvent, emit};

// ── Catalog state ──────────────────────────────────────────────────

/// List + selection state shared with the voices-changed listener.
///
/// Uses a std (non-async) lock: it is only touched in sync context, never
/// across an `.await` point.
#[derive(Default)]
struct CatalogInner {
    /// Sorted, deduplicated voices. Replaced wholesale on every refresh.
    voices: Vec<Voice>,

    /// Selected voice name. Empty until the first non-empty refresh.
    selected: String,
}

/// Discovers and normalises the host's voice list.
pub struct VoiceCatalog {
    engine: Arc<dyn SpeechEngine>,
    inner: Arc<Mutex<CatalogInner>>,
    event_tx: mpsc::UnboundedSender<SpeechEvent>,
    listener: Option<ListenerToken>,
    supported: bool,
}

impl VoiceCatalog {
    /// Create a catalog over `engine`, probe the capability once, and (when
    /// present) subscribe to voices-changed notifications and run the
    /// initial refresh.
    ///
    /// When the capability is absent the catalog constructs in a permanently
    /// inert state: no subscription, every operation a no-op.
    pub fn new(
        engine: Arc<dyn SpeechEngine>,
        event_tx: mpsc::UnboundedSender<SpeechEvent>,
    ) -> Self {
        let supported = engine.is_available();
        let inner = Arc::new(Mutex::new(CatalogInner::default()));

        if !supported {
            tracing::info!("Speech synthesis unavailable — voice catalog disabled");
            return Self {
                engine,
                inner,
                event_tx,
                listener: None,
                supported,
            };
        }

        // The listener holds a Weak engine reference: the engine stores the
        // listener, so a strong reference would keep the engine alive
        // through its own listener slot.
        let weak_engine: Weak<dyn SpeechEngine> = Arc::downgrade(&engine);
        let listener_inner = Arc::clone(&inner);
        let listener_tx = event_tx.clone();
        let listener = engine.subscribe_voices_changed(Box::new(move || {
            if let Some(engine) = weak_engine.upgrade() {
                refresh_from(engine.as_ref(), &listener_inner, &listener_tx);
            }
        }));

        refresh_from(engine.as_ref(), &inner, &event_tx);

        Self {
            engine,
            inner,
            event_tx,
            listener: Some(listener),
            supported,
        }
    }

    /// Whether the host exposes speech synthesis at all.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        self.supported
    }

    /// Pull the engine's current voice set and fold it into the catalog.
    ///
    /// An empty set means "not ready yet", not "no voices exist" — the
    /// catalog keeps whatever it had.
    pub fn refresh(&self) {
        if !self.supported {
            return;
        }
        refresh_from(self.engine.as_ref(), &self.inner, &self.event_tx);
    }

    /// The current sorted, deduplicated voice list.
    #[must_use]
    pub fn voices(&self) -> Vec<Voice> {
        self.inner.lock().unwrap().voices.clone()
    }

    /// The selected voice name; empty while nothing is resolved yet.
    #[must_use]
    pub fn selected_voice_name(&self) -> String {
        self.inner.lock().unwrap().selected.clone()
    }

    /// Explicitly select a voice by name.
    ///
    /// Stored as given — the catalog never second-guesses an explicit
    /// selection, including one that no current voice matches.
    pub fn select(&self, name: impl Into<String>) {
        if !self.supported {
            return;
        }
        let name = name.into();
        tracing::debug!(voice = %name, "Voice selected");
        self.inner.lock().unwrap().selected = name;
    }

    /// Resolve the current selection against the current list.
    ///
    /// `None` when nothing is selected yet or the selected name is stale —
    /// the utterance then proceeds with the engine's own default voice.
    #[must_use]
    pub fn resolve_selected(&self) -> Option<Voice> {
        let state = self.inner.lock().unwrap();
        if state.selected.is_empty() {
            return None;
        }
        state.voices.iter().find(|v| v.name == state.selected).cloned()
    }

    /// Deregister the voices-changed listener.
    ///
    /// Idempotent; the engine clears its slot only if our registration is
    /// still the installed one, so a listener installed later by another
    /// owner is never clobbered.
    pub fn close(&mut self) {
        if let Some(token) = self.listener.take() {
            self.engine.unsubscribe_voices_changed(token);
            tracing::debug!("Voice catalog listener deregistered");
        }
    }
}

impl Drop for VoiceCatalog {
    fn drop(&mut self) {
        self.close();
    }
}

// ── Refresh logic ──────────────────────────────────────────────────

/// Snapshot the engine's voices and fold them into `inner`.
///
/// Free function (not a method) so the voices-changed listener can run the
/// same code without capturing the catalog itself.
fn refresh_from(
    engine: &dyn SpeechEngine,
    inner: &Mutex<CatalogInner>,
    event_tx: &mpsc::UnboundedSender<SpeechEvent>,
) {
    apply_snapshot(inner, event_tx, engine.voices());
}

/// Fold one raw voice snapshot into the catalog state.
fn apply_snapshot(
    inner: &Mutex<CatalogInner>,
    event_tx: &mpsc::UnboundedSender<SpeechEvent>,
    snapshot: Vec<Voice>,
) {
    if snapshot.is_empty() {
        tracing::debug!("Voice enumeration empty — host not ready, keeping current catalog");
        return;
    }

    // Deterministic total order by (lang, name), independent of the host's
    // native enumeration order. Sorting twice yields identical output.
    let mut voices = snapshot;
    voices.sort_by(|a, b| a.lang.cmp(&b.lang).then_with(|| a.name.cmp(&b.name)));
    voices.dedup_by(|a, b| a.name == b.name && a.lang == b.lang);

    let mut state = inner.lock().unwrap();

    if state.selected.is_empty() {
        // First successful refresh: prefer the host-flagged default, else
        // the first voice in sort order.
        if let Some(voice) = voices.iter().find(|v| v.is_default).or_else(|| voices.first()) {
            state.selected = voice.name.clone();
            tracing::debug!(voice = %state.selected, "Default voice resolved");
        }
    }

    state.voices = voices;
    tracing::debug!(count = state.voices.len(), "Voice catalog refreshed");

    let event = SpeechEvent::VoicesChanged {
        voices: state.voices.clone(),
        selected: state.selected.clone(),
    };
    drop(state);
    emit(event_tx, event);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(name: &str, lang: &str, is_default: bool) -> Voice {
        Voice {
            name: name.to_owned(),
            lang: lang.to_owned(),
            is_default,
        }
    }

    type Channel = (
        mpsc::UnboundedSender<SpeechEvent>,
        mpsc::UnboundedReceiver<SpeechEvent>,
    );

    fn fresh_inner() -> (Mutex<CatalogInner>, Channel) {
        (Mutex::new(CatalogInner::default()), mpsc::unbounded_channel())
    }

    #[test]
    fn snapshot_is_sorted_by_lang_then_name() {
        let (inner, (tx, _rx)) = fresh_inner();
        apply_snapshot(
            &inner,
            &tx,
            vec![
                voice("Zoe", "en-US", false),
                voice("Amelie", "fr-FR", false),
                voice("Alex", "en-US", false),
            ],
        );
        let names: Vec<String> = inner
            .lock()
            .unwrap()
            .voices
            .iter()
            .map(|v| v.name.clone())
            .collect();
        assert_eq!(names, ["Alex", "Zoe", "Amelie"]);
    }

    #[test]
    fn duplicate_identities_collapse() {
        let (inner, (tx, _rx)) = fresh_inner();
        apply_snapshot(
            &inner,
            &tx,
            vec![
                voice("Alex", "en-US", false),
                voice("Alex", "en-US", false),
                voice("Alex", "en-GB", false),
            ],
        );
        assert_eq!(inner.lock().unwrap().voices.len(), 2);
    }

    #[test]
    fn empty_snapshot_keeps_populated_catalog() {
        let (inner, (tx, _rx)) = fresh_inner();
        apply_snapshot(&inner, &tx, vec![voice("Alex", "en-US", true)]);
        apply_snapshot(&inner, &tx, vec![]);
        let state = inner.lock().unwrap();
        assert_eq!(state.voices.len(), 1);
        assert_eq!(state.selected, "Alex");
    }

    #[test]
    fn flagged_default_wins_first_resolution() {
        let (inner, (tx, _rx)) = fresh_inner();
        apply_snapshot(
            &inner,
            &tx,
            vec![voice("Alex", "en-US", false), voice("Zoe", "en-US", true)],
        );
        assert_eq!(inner.lock().unwrap().selected, "Zoe");
    }

    #[test]
    fn first_sorted_voice_wins_without_flagged_default() {
        let (inner, (tx, _rx)) = fresh_inner();
        apply_snapshot(
            &inner,
            &tx,
            vec![voice("Zoe", "en-US", false), voice("Amelie", "de-DE", false)],
        );
        assert_eq!(inner.lock().unwrap().selected, "Amelie");
    }

    #[test]
    fn existing_selection_survives_list_replacement() {
        let (inner, (tx, _rx)) = fresh_inner();
        apply_snapshot(&inner, &tx, vec![voice("Alex", "en-US", true)]);
        apply_snapshot(&inner, &tx, vec![voice("Yuna", "ko-KR", true)]);
        let state = inner.lock().unwrap();
        assert_eq!(state.selected, "Alex", "selection must not be reassigned");
        assert_eq!(state.voices.len(), 1);
    }
}
