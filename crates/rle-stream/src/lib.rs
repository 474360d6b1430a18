//! The RLE stream the player decodes.
//!
//! A stream is a sequence of 16-bit control words, each
//! `run_length << 6 | value`:
//!
//! | run_length | meaning                                    |
//! |------------|--------------------------------------------|
//! | 0-991      | `run_length` pixels of colour `value`      |
//! | 992        | audio sample `value`, no pixels            |
//! | 993-1022   | reserved                                   |
//! | 1023       | end of frame                               |
//!
//! Words arrive as nibbles from the serial bus, are assembled and decoded
//! once ([`WordAssembler`]), queued ([`PrefetchBuffer`]) and expanded to one
//! colour per pixel clock ([`StreamDecoder`]). [`encode`] and [`patterns`]
//! build streams.

mod assembler;
mod decoder;
pub mod encode;
mod error;
mod fifo;
pub mod patterns;
mod word;

pub use assembler::WordAssembler;
pub use decoder::{DecoderState, DecoderStats, StreamDecoder};
pub use error::StreamError;
pub use fifo::{PREFETCH_DEPTH, PrefetchBuffer};
pub use word::{AUDIO_TAG, ControlWord, END_OF_FRAME_TAG, MAX_RUN_LENGTH};
