//! Ordered speech delivery
//!
//! Narrative text is chunked into sentences, synthesized out of order
//! (network completion order is unpredictable), and played back in
//! strict sequence-index order. The ordering gate is a standalone
//! `Sequencer` so the same primitive serves any
//! ordered-delivery-over-unordered-completion problem.

use crate::core::error::Result;
use ahash::AHashMap;

/// Completion state of one sequenced slot
#[derive(Debug, Clone, PartialEq)]
enum Slot<T> {
    Pending,
    Ready(T),
    Failed,
}

/// Monotonic-index ordering gate.
///
/// Items register in ascending index order, complete in any order, and
/// drain strictly in index order. A failed or empty slot counts as
/// delivered so the stream never stalls on a permanently missing index.
#[derive(Debug)]
pub struct Sequencer<T> {
    next: usize,
    slots: AHashMap<usize, Slot<T>>,
}

impl<T> Default for Sequencer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Sequencer<T> {
    pub fn new() -> Self {
        Self {
            next: 0,
            slots: AHashMap::new(),
        }
    }

    /// Register a slot before its item exists, preventing index gaps
    pub fn register(&mut self, index: usize) {
        self.slots.entry(index).or_insert(Slot::Pending);
    }

    /// Mark a slot's item as ready for delivery
    pub fn complete(&mut self, index: usize, item: T) {
        self.slots.insert(index, Slot::Ready(item));
    }

    /// Mark a slot as failed; it will be skipped, not waited on
    pub fn fail(&mut self, index: usize) {
        self.slots.insert(index, Slot::Failed);
    }

    /// Drain the contiguous run of deliverable items starting at the
    /// next expected index. Stops at the first pending or unregistered
    /// slot.
    pub fn pop_ready(&mut self) -> Vec<T> {
        let mut delivered = Vec::new();
        loop {
            match self.slots.get(&self.next) {
                Some(Slot::Ready(_)) => {
                    if let Some(Slot::Ready(item)) = self.slots.remove(&self.next) {
                        delivered.push(item);
                    }
                    self.next += 1;
                }
                Some(Slot::Failed) => {
                    self.slots.remove(&self.next);
                    self.next += 1;
                }
                Some(Slot::Pending) | None => break,
            }
        }
        delivered
    }

    /// Number of slots still awaiting completion or delivery
    pub fn outstanding(&self) -> usize {
        self.slots.len()
    }

    /// Drop all state and restart the sequence at zero
    pub fn reset(&mut self) {
        self.slots.clear();
        self.next = 0;
    }
}

/// Sentence delimiters recognized by the chunker (CJK and Latin)
const DELIMITERS: &[char] = &[
    '，', '。', '！', '？', ',', '.', '!', '?', '；', ';', '…',
];

fn is_delimiter(c: char) -> bool {
    DELIMITERS.contains(&c)
}

/// Split narrative text into speakable sentence chunks.
///
/// Fragments shorter than `min_chars` meaningful characters merge into
/// the following chunk so the synthesizer is not fed two-word snippets.
/// Trailing text without a delimiter is flushed as a final chunk.
pub fn segment_sentences(text: &str, min_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        current.push(c);
        if is_delimiter(c) && meaningful_len(&current) >= min_chars {
            chunks.push(std::mem::take(&mut current));
        }
    }

    if meaningful_len(&current) > 0 {
        if let Some(last) = chunks.last_mut() {
            if meaningful_len(&current) < min_chars {
                last.push_str(&current);
                current.clear();
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }
    }

    chunks
}

fn meaningful_len(s: &str) -> usize {
    s.chars()
        .filter(|c| !is_delimiter(*c) && !c.is_whitespace())
        .count()
}

/// Remove parenthesized emotion tags like `(confident)` so the
/// synthesizer does not read them aloud.
pub fn strip_emotion_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' | '（' => depth += 1,
            ')' | '）' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// A synthesized utterance ready for playback
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub text: String,
}

/// Turns one sentence of text into a playable clip.
///
/// Playback transport and codec details live behind this seam; the
/// engine only cares that synthesis may fail or complete out of order.
#[allow(async_fn_in_trait)]
pub trait SpeechSynth {
    async fn synthesize(&mut self, text: &str) -> Result<AudioClip>;
}

/// Synth that produces silent clips immediately; used when no speech
/// backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSynth;

impl SpeechSynth for NullSynth {
    async fn synthesize(&mut self, text: &str) -> Result<AudioClip> {
        Ok(AudioClip { text: text.into() })
    }
}

/// Sentence-chunked speech pipeline with ordered playback
pub struct SpeechQueue<S> {
    synth: S,
    sequencer: Sequencer<AudioClip>,
    next_index: usize,
    min_chunk_chars: usize,
    on_play: Box<dyn FnMut(&AudioClip) + Send>,
}

impl<S: SpeechSynth> SpeechQueue<S> {
    pub fn new(synth: S, on_play: impl FnMut(&AudioClip) + Send + 'static) -> Self {
        Self {
            synth,
            sequencer: Sequencer::new(),
            next_index: 0,
            min_chunk_chars: 6,
            on_play: Box::new(on_play),
        }
    }

    /// Chunk, synthesize, and play a narrative line in order.
    ///
    /// Empty chunks are registered and immediately treated as played so
    /// later indices are never held hostage.
    pub async fn speak(&mut self, text: &str) {
        for sentence in segment_sentences(text, self.min_chunk_chars) {
            let index = self.next_index;
            self.next_index += 1;
            self.sequencer.register(index);

            let clean = strip_emotion_tags(&sentence);
            if clean.trim().is_empty() {
                self.sequencer.fail(index);
            } else {
                match self.synth.synthesize(clean.trim()).await {
                    Ok(clip) => self.sequencer.complete(index, clip),
                    Err(e) => {
                        tracing::warn!("speech synthesis failed at index {}: {}", index, e);
                        self.sequencer.fail(index);
                    }
                }
            }

            for clip in self.sequencer.pop_ready() {
                (self.on_play)(&clip);
            }
        }
    }

    /// Abandon queued speech (new turn, or battle reached a terminal
    /// phase) and restart indices at zero.
    pub fn reset(&mut self) {
        self.sequencer.reset();
        self.next_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_out_of_order_completion_plays_in_order() {
        let mut seq: Sequencer<&str> = Sequencer::new();
        seq.register(0);
        seq.register(1);
        seq.register(2);

        // Index 2 becomes ready before index 0: nothing may play yet
        seq.complete(2, "two");
        assert!(seq.pop_ready().is_empty());

        // Index 0 arrives: only the contiguous run [0] drains
        seq.complete(0, "zero");
        assert_eq!(seq.pop_ready(), vec!["zero"]);

        // Index 1 arrives: 1 and the held 2 drain together, in order
        seq.complete(1, "one");
        assert_eq!(seq.pop_ready(), vec!["one", "two"]);
    }

    #[test]
    fn test_failed_slot_never_blocks_the_queue() {
        let mut seq: Sequencer<&str> = Sequencer::new();
        seq.register(0);
        seq.register(1);
        seq.complete(1, "one");
        assert!(seq.pop_ready().is_empty());

        seq.fail(0);
        assert_eq!(seq.pop_ready(), vec!["one"]);
    }

    #[test]
    fn test_unregistered_index_halts_drain() {
        let mut seq: Sequencer<&str> = Sequencer::new();
        seq.register(0);
        seq.complete(0, "zero");
        assert_eq!(seq.pop_ready(), vec!["zero"]);
        // Index 1 was never registered: drain stops cleanly
        assert!(seq.pop_ready().is_empty());
    }

    #[test]
    fn test_reset_restarts_sequence() {
        let mut seq: Sequencer<&str> = Sequencer::new();
        seq.register(0);
        seq.complete(0, "zero");
        let _ = seq.pop_ready();
        seq.reset();

        seq.register(0);
        seq.complete(0, "again");
        assert_eq!(seq.pop_ready(), vec!["again"]);
    }

    #[test]
    fn test_segment_splits_on_sentence_delimiters() {
        let chunks =
            segment_sentences("Hold the line! They break on the third wave. Steady now?", 6);
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].contains("Hold the line"));
        assert!(chunks[2].contains("Steady now"));
    }

    #[test]
    fn test_segment_merges_short_fragments() {
        // "Go." is under the minimum and merges into the next chunk
        let chunks = segment_sentences("Go. Breach the outer gate now!", 6);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].starts_with("Go."));
    }

    #[test]
    fn test_segment_flushes_trailing_text() {
        let chunks = segment_sentences("The signal is fading fast. No delimiter at the end", 6);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].contains("No delimiter"));
    }

    #[test]
    fn test_strip_emotion_tags() {
        let cleaned = strip_emotion_tags("(excited) Leave it to me! (confident) Watch this!");
        assert!(!cleaned.contains('('));
        assert!(cleaned.contains("Leave it to me!"));
        assert!(cleaned.contains("Watch this!"));
    }

    #[tokio::test]
    async fn test_queue_plays_sentences_in_submission_order() {
        let played: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = played.clone();
        let mut queue = SpeechQueue::new(NullSynth, move |clip: &AudioClip| {
            sink.lock().unwrap().push(clip.text.clone());
        });

        queue.speak("First things first! Then the finisher.").await;

        let played = played.lock().unwrap();
        assert_eq!(played.len(), 2);
        assert!(played[0].contains("First things first"));
        assert!(played[1].contains("Then the finisher"));
    }
}
