//! Per-pixel-clock RLE expansion.

use log::{debug, trace, warn};
use vga_core::{Observable, Value};

use crate::{ControlWord, PrefetchBuffer};

/// Where the decoder is in the frame's stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// No transaction since reset: output blank, nothing expected.
    Idle,
    /// Expanding the stream.
    Streaming,
    /// End of frame seen: blank until the next frame.
    Exhausted,
}

/// Running totals since reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Words taken from the buffer (padding after end of frame excluded).
    pub words: u64,
    pub pixels: u64,
    pub audio_samples: u64,
    /// Active pixels that found no data ready.
    pub underruns: u64,
    pub reserved_words: u64,
    /// Frames whose stream ended with an end-of-frame word.
    pub frames_completed: u64,
}

/// Turns control words into one colour per pixel clock.
///
/// Owns the run cursor. Words are pulled whenever the cursor is empty: in
/// the clock that emits a run's last pixel, and in any later clock
/// (blanking included) until a run is loaded. Audio words, zero-length
/// runs and reserved words cost no pixel time: the decoder keeps pulling
/// in the same clock.
pub struct StreamDecoder {
    state: DecoderState,
    /// Pixels left in the current run.
    remaining: u16,
    colour: u8,
    end_of_frame: bool,
    underrun_reported: bool,
    stats: DecoderStats,
}

impl StreamDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: DecoderState::Idle,
            remaining: 0,
            colour: 0,
            end_of_frame: false,
            underrun_reported: false,
            stats: DecoderStats::default(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// A new frame transaction starts: cursor back to `(0, 0)` so the first
    /// pixel fetches a word.
    pub fn begin_frame(&mut self) {
        if self.state == DecoderState::Streaming {
            debug!(
                "decoder: frame ended without end-of-frame word, {} pixels left in run",
                self.remaining
            );
        }
        self.state = DecoderState::Streaming;
        self.remaining = 0;
        self.colour = 0;
        self.end_of_frame = false;
        self.underrun_reported = false;
    }

    /// Advance one pixel clock. Returns the colour to display (0 outside
    /// active video, after the end of frame, or on underrun). Audio samples
    /// decoded this clock are passed to `audio` in stream order.
    pub fn tick<const N: usize>(
        &mut self,
        fifo: &mut PrefetchBuffer<N>,
        active: bool,
        mut audio: impl FnMut(u8),
    ) -> u8 {
        if self.state == DecoderState::Streaming {
            self.refill(fifo, &mut audio);
        }

        if !active {
            return 0;
        }

        match self.state {
            DecoderState::Streaming if self.remaining > 0 => {
                self.remaining -= 1;
                self.stats.pixels += 1;
                let colour = self.colour;
                // Load the next run behind the last pixel of this one.
                if self.remaining == 0 {
                    self.refill(fifo, &mut audio);
                }
                colour
            }
            DecoderState::Streaming => {
                self.stats.underruns += 1;
                if self.underrun_reported {
                    trace!("decoder: underrun");
                } else {
                    warn!("decoder: prefetch buffer empty at an active pixel");
                    self.underrun_reported = true;
                }
                0
            }
            DecoderState::Idle | DecoderState::Exhausted => 0,
        }
    }

    fn refill<const N: usize>(&mut self, fifo: &mut PrefetchBuffer<N>, audio: &mut impl FnMut(u8)) {
        while self.remaining == 0 {
            let Some(word) = fifo.pop() else {
                return;
            };
            self.stats.words += 1;
            match word {
                ControlWord::PixelRun { length, colour } => {
                    self.remaining = length;
                    self.colour = colour;
                }
                ControlWord::AudioSample(sample) => {
                    self.stats.audio_samples += 1;
                    audio(sample);
                }
                ControlWord::EndOfFrame => {
                    if !fifo.is_empty() {
                        trace!("decoder: dropping {} words of padding", fifo.len());
                    }
                    fifo.clear();
                    self.state = DecoderState::Exhausted;
                    self.end_of_frame = true;
                    self.stats.frames_completed += 1;
                    return;
                }
                ControlWord::Reserved(raw) => {
                    self.stats.reserved_words += 1;
                    warn!("decoder: reserved control word {raw:#06X} treated as an empty run");
                }
            }
        }
    }

    /// Raised once the end-of-frame word is consumed, until the next frame.
    /// This is the signal that lets the bus master release CS.
    #[must_use]
    pub fn end_of_frame(&self) -> bool {
        self.end_of_frame
    }

    #[must_use]
    pub fn state(&self) -> DecoderState {
        self.state
    }

    #[must_use]
    pub fn remaining(&self) -> u16 {
        self.remaining
    }

    #[must_use]
    pub fn colour(&self) -> u8 {
        self.colour
    }

    #[must_use]
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Observable for StreamDecoder {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "state" => Some(
                match self.state {
                    DecoderState::Idle => "idle",
                    DecoderState::Streaming => "streaming",
                    DecoderState::Exhausted => "exhausted",
                }
                .into(),
            ),
            "remaining" => Some(self.remaining.into()),
            "colour" => Some(self.colour.into()),
            "end_of_frame" => Some(self.end_of_frame.into()),
            "words" => Some(self.stats.words.into()),
            "pixels" => Some(self.stats.pixels.into()),
            "audio_samples" => Some(self.stats.audio_samples.into()),
            "underruns" => Some(self.stats.underruns.into()),
            "reserved_words" => Some(self.stats.reserved_words.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "state",
            "remaining",
            "colour",
            "end_of_frame",
            "words",
            "pixels",
            "audio_samples",
            "underruns",
            "reserved_words",
        ]
    }
}
