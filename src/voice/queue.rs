//! Speech output queue
//!
//! Serializes utterances: at most one is active, the rest wait in FIFO order.
//! The queue only tracks ids and text; the session starts and cancels playback.

use std::collections::VecDeque;

/// Identifies one started utterance
pub type UtteranceId = u64;

/// Outcome of [`SpeechQueue::enqueue_or_speak`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Nothing was active; start this utterance now
    Start { id: UtteranceId, text: String },
    /// Appended behind the active utterance
    Queued { position: usize },
}

/// Outcome of [`SpeechQueue::finish`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finished {
    /// Not the active utterance (cancelled or already finished)
    Stale,
    /// Queue drained
    Idle,
    /// Start the next pending utterance
    Next { id: UtteranceId, text: String },
}

/// FIFO of pending utterances with one active slot
#[derive(Debug, Default)]
pub struct SpeechQueue {
    pending: VecDeque<String>,
    active: Option<UtteranceId>,
    next_id: UtteranceId,
}

impl SpeechQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `text` if idle, otherwise append it to the tail
    ///
    /// The active slot is reserved immediately, so a second call before
    /// playback actually begins is queued rather than started.
    pub fn enqueue_or_speak(&mut self, text: impl Into<String>) -> Dispatch {
        let text = text.into();
        if self.active.is_some() {
            self.pending.push_back(text);
            tracing::debug!(queued = self.pending.len(), "already speaking, queued utterance");
            return Dispatch::Queued {
                position: self.pending.len(),
            };
        }

        let id = self.issue();
        Dispatch::Start { id, text }
    }

    /// Mark utterance `id` as ended (normally or with an engine error)
    pub fn finish(&mut self, id: UtteranceId) -> Finished {
        if self.active != Some(id) {
            return Finished::Stale;
        }
        self.active = None;

        match self.pending.pop_front() {
            Some(text) => {
                let id = self.issue();
                Finished::Next { id, text }
            }
            None => Finished::Idle,
        }
    }

    /// Cancel the active utterance and drop everything pending
    ///
    /// Returns whether anything was active or pending.
    pub fn stop(&mut self) -> bool {
        let had_any = self.active.is_some() || !self.pending.is_empty();
        self.active = None;
        self.pending.clear();
        had_any
    }

    /// Drop pending utterances only; returns how many were dropped
    pub fn clear_queue(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        if dropped > 0 {
            tracing::debug!(dropped, "speech queue cleared");
        }
        dropped
    }

    /// Whether an utterance holds the active slot
    #[must_use]
    pub const fn is_speaking(&self) -> bool {
        self.active.is_some()
    }

    /// Id of the active utterance
    #[must_use]
    pub const fn active(&self) -> Option<UtteranceId> {
        self.active
    }

    /// Number of pending (not yet started) utterances
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending utterances in playback order
    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    fn issue(&mut self) -> UtteranceId {
        self.next_id += 1;
        self.active = Some(self.next_id);
        self.next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(dispatch: Dispatch) -> UtteranceId {
        match dispatch {
            Dispatch::Start { id, .. } => id,
            Dispatch::Queued { .. } => panic!("expected start"),
        }
    }

    #[test]
    fn plays_in_submission_order() {
        let mut queue = SpeechQueue::new();
        let mut id = start(queue.enqueue_or_speak("one"));
        assert_eq!(queue.enqueue_or_speak("two"), Dispatch::Queued { position: 1 });
        assert_eq!(queue.enqueue_or_speak("three"), Dispatch::Queued { position: 2 });

        let mut played = vec!["one".to_string()];
        while let Finished::Next { id: next, text } = queue.finish(id) {
            played.push(text);
            id = next;
        }
        assert_eq!(played, ["one", "two", "three"]);
        assert!(!queue.is_speaking());
    }

    #[test]
    fn stale_finish_is_ignored() {
        let mut queue = SpeechQueue::new();
        let id = start(queue.enqueue_or_speak("one"));
        assert!(queue.stop());
        assert_eq!(queue.finish(id), Finished::Stale);
        assert_eq!(queue.finish(id + 10), Finished::Stale);
    }

    #[test]
    fn clear_queue_keeps_active() {
        let mut queue = SpeechQueue::new();
        let id = start(queue.enqueue_or_speak("one"));
        queue.enqueue_or_speak("two");
        assert_eq!(queue.clear_queue(), 1);
        assert_eq!(queue.active(), Some(id));
        assert_eq!(queue.finish(id), Finished::Idle);
    }

    #[test]
    fn stop_clears_everything() {
        let mut queue = SpeechQueue::new();
        queue.enqueue_or_speak("one");
        queue.enqueue_or_speak("two");
        assert!(queue.stop());
        assert!(queue.is_empty());
        assert!(!queue.is_speaking());
        assert!(!queue.stop());
    }

    #[test]
    fn ids_are_fresh_after_stop() {
        let mut queue = SpeechQueue::new();
        let first = start(queue.enqueue_or_speak("one"));
        queue.stop();
        let second = start(queue.enqueue_or_speak("two"));
        assert_ne!(first, second);
    }
}
