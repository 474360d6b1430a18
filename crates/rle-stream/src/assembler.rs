//! Nibble-to-word packing.

use crate::ControlWord;

/// Packs four nibbles, most significant first, into one control word.
#[derive(Debug, Clone, Default)]
pub struct WordAssembler {
    shift: u16,
    nibbles: u8,
}

impl WordAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift in one nibble. Returns the decoded word on every fourth.
    pub fn push(&mut self, nibble: u8) -> Option<ControlWord> {
        self.shift = (self.shift << 4) | u16::from(nibble & 0x0F);
        self.nibbles += 1;
        if self.nibbles < 4 {
            return None;
        }
        self.nibbles = 0;
        Some(ControlWord::decode(self.shift))
    }

    /// Nibbles of the word in progress.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.nibbles)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nibbles == 0
    }

    /// Drop a partially assembled word.
    pub fn clear(&mut self) {
        self.shift = 0;
        self.nibbles = 0;
    }
}
