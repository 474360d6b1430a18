//! Prefetch FIFO between the bus and the decoder.

use crate::ControlWord;

/// Words the prefetch buffer holds.
pub const PREFETCH_DEPTH: usize = 4;

/// Fixed-capacity single-producer single-consumer word queue.
///
/// The bus side pushes assembled words, the decoder pops them. The bus
/// master is only given credit for the free slots, so a push into a full
/// buffer is a timing bug; it is rejected and the word handed back.
#[derive(Debug, Clone)]
pub struct PrefetchBuffer<const N: usize = PREFETCH_DEPTH> {
    slots: [ControlWord; N],
    head: usize,
    len: usize,
}

impl<const N: usize> PrefetchBuffer<N> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: [ControlWord::EndOfFrame; N],
            head: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, word: ControlWord) -> Result<(), ControlWord> {
        if self.is_full() {
            return Err(word);
        }
        self.slots[(self.head + self.len) % N] = word;
        self.len += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<ControlWord> {
        if self.len == 0 {
            return None;
        }
        let word = self.slots[self.head];
        self.head = (self.head + 1) % N;
        self.len -= 1;
        Some(word)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    #[must_use]
    pub fn free_slots(&self) -> usize {
        N - self.len
    }

    /// Discard everything queued.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

impl<const N: usize> Default for PrefetchBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
