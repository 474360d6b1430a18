//! Test patterns for a 640x480 frame.
//!
//! The calibration frame has three bands:
//!
//! - lines 0-63: a two-pixel cross-hair of colours 1 and 2 at x = 320 on a
//!   background of the line number;
//! - lines 64-382: a diagonal split, `i` pixels of one colour then `640 - i`
//!   of the next, `i` stepping by 2 from 2 to 638, colours counting up from
//!   20 and wrapping at 64;
//! - lines 383-479: 80 blocks of 8 pixels, colour `j & 0x3F`.
//!
//! Between them these give short runs inside long ones, run lengths of every
//! even size, and long stretches of short runs.

use crate::ControlWord;

pub const WIDTH: u16 = 640;
pub const HEIGHT: u16 = 480;

const CROSS_HAIR_LINES: u16 = 64;
/// `i` in `2..640` step 2.
const DIAGONAL_LINES: u16 = 319;
const BLOCK_LINES: u16 = HEIGHT - CROSS_HAIR_LINES - DIAGONAL_LINES;
const FIRST_DIAGONAL_COLOUR: u8 = 20;

/// The calibration frame.
#[must_use]
pub fn calibration() -> Vec<ControlWord> {
    build(false)
}

/// The calibration frame with one audio sample after each line:
/// the background colour on the cross-hair lines, `i / 2` on the diagonal
/// lines and the block line index on the rest.
#[must_use]
pub fn calibration_with_audio() -> Vec<ControlWord> {
    build(true)
}

fn build(with_audio: bool) -> Vec<ControlWord> {
    let mut words = Vec::with_capacity(4 * 480 + 80 * usize::from(BLOCK_LINES) + 1);

    for colour in 0..CROSS_HAIR_LINES as u8 {
        words.extend([
            ControlWord::run(320, colour),
            ControlWord::run(2, 1),
            ControlWord::run(2, 2),
            ControlWord::run(316, colour),
        ]);
        if with_audio {
            words.push(ControlWord::audio(colour));
        }
    }

    let mut colour = FIRST_DIAGONAL_COLOUR;
    for i in (2..WIDTH).step_by(2) {
        words.push(ControlWord::run(i, colour));
        colour = (colour + 1) % 64;
        words.push(ControlWord::run(WIDTH - i, colour));
        colour = (colour + 1) % 64;
        if with_audio {
            words.push(ControlWord::audio((i / 2) as u8));
        }
    }

    for line in 0..BLOCK_LINES {
        words.extend(block_line());
        if with_audio {
            words.push(ControlWord::audio(line as u8));
        }
    }

    words.push(ControlWord::EndOfFrame);
    words
}

fn block_line() -> impl Iterator<Item = ControlWord> {
    (0..WIDTH / 8).map(|j| ControlWord::run(8, (j & 0x3F) as u8))
}

/// A whole frame of 8-pixel blocks.
#[must_use]
pub fn blocks() -> Vec<ControlWord> {
    let mut words: Vec<_> = (0..HEIGHT).flat_map(|_| block_line()).collect();
    words.push(ControlWord::EndOfFrame);
    words
}

/// A whole frame of single-pixel runs: one control word per pixel, the
/// heaviest load the bus can be given.
#[must_use]
pub fn single_pixel_runs() -> Vec<ControlWord> {
    let mut words: Vec<_> = (0..u32::from(WIDTH) * u32::from(HEIGHT))
        .map(|n| ControlWord::run(1, (n % 61) as u8))
        .collect();
    words.push(ControlWord::EndOfFrame);
    words
}

/// Expected colour at `(x, y)` of the calibration frame.
#[must_use]
pub fn calibration_pixel(x: u16, y: u16) -> u8 {
    if y < CROSS_HAIR_LINES {
        return match x {
            320 | 321 => 1,
            322 | 323 => 2,
            _ => y as u8,
        };
    }
    if y < CROSS_HAIR_LINES + DIAGONAL_LINES {
        let n = y - CROSS_HAIR_LINES;
        let split = 2 * (n + 1);
        let first = ((u16::from(FIRST_DIAGONAL_COLOUR) + 2 * n) % 64) as u8;
        return if x < split { first } else { first + 1 };
    }
    ((x / 8) & 0x3F) as u8
}
