//! Building streams and flash images.
//!
//! Frames are row-major 6-bit colour indices. Runs continue across line
//! ends unless a line carries an audio sample, which is placed after the
//! line's last pixel.

use crate::{ControlWord, MAX_RUN_LENGTH, StreamError};

/// Encode a frame (and optionally one audio sample per line) into control
/// words, ending with [`ControlWord::EndOfFrame`].
pub fn encode_frame(
    frame: &[u8],
    width: usize,
    height: usize,
    audio: Option<&[u8]>,
) -> Result<Vec<ControlWord>, StreamError> {
    let expected = width * height;
    if frame.len() != expected {
        return Err(StreamError::FrameSize {
            expected,
            actual: frame.len(),
        });
    }
    if let Some(samples) = audio
        && samples.len() != height
    {
        return Err(StreamError::AudioLength {
            expected: height,
            actual: samples.len(),
        });
    }
    if let Some(&bad) = frame
        .iter()
        .chain(audio.unwrap_or_default())
        .find(|&&v| v > 0x3F)
    {
        return Err(StreamError::ValueOutOfRange(bad));
    }

    let mut words = Vec::new();
    let mut run: Option<(u8, u16)> = None;

    for (y, line) in frame.chunks_exact(width.max(1)).enumerate().take(height) {
        for &colour in line {
            run = match run {
                Some((c, len)) if c == colour && len < MAX_RUN_LENGTH => Some((c, len + 1)),
                Some((c, len)) => {
                    words.push(ControlWord::run(len, c));
                    Some((colour, 1))
                }
                None => Some((colour, 1)),
            };
        }
        if let Some(samples) = audio {
            if let Some((c, len)) = run.take() {
                words.push(ControlWord::run(len, c));
            }
            words.push(ControlWord::audio(samples[y]));
        }
    }
    if let Some((c, len)) = run {
        words.push(ControlWord::run(len, c));
    }
    words.push(ControlWord::EndOfFrame);
    Ok(words)
}

/// Serialize words big-endian, the byte order the bus reads them in.
#[must_use]
pub fn to_flash_image(words: &[ControlWord]) -> Vec<u8> {
    words.iter().flat_map(|w| w.encode().to_be_bytes()).collect()
}

/// Parse a flash image up to and including the first end-of-frame word.
/// An image with no end-of-frame word is parsed to its end.
pub fn from_flash_image(image: &[u8]) -> Result<Vec<ControlWord>, StreamError> {
    if image.len() % 2 != 0 {
        return Err(StreamError::OddImageLength(image.len()));
    }
    let mut words = Vec::with_capacity(image.len() / 2);
    for pair in image.chunks_exact(2) {
        let word = ControlWord::decode(u16::from_be_bytes([pair[0], pair[1]]));
        words.push(word);
        if word == ControlWord::EndOfFrame {
            break;
        }
    }
    Ok(words)
}

/// What a frame of `pixel_count` active pixels should show for `words`:
/// runs expanded in order, blank after the end of frame or the end of data.
#[must_use]
pub fn expand(words: &[ControlWord], pixel_count: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(pixel_count);
    for &word in words {
        match word {
            ControlWord::PixelRun { length, colour } => {
                let take = usize::from(length).min(pixel_count - pixels.len());
                pixels.extend(std::iter::repeat_n(colour, take));
            }
            ControlWord::EndOfFrame => break,
            ControlWord::AudioSample(_) | ControlWord::Reserved(_) => {}
        }
        if pixels.len() == pixel_count {
            break;
        }
    }
    pixels.resize(pixel_count, 0);
    pixels
}

/// Audio samples in stream order, up to the end of frame.
#[must_use]
pub fn audio_samples(words: &[ControlWord]) -> Vec<u8> {
    words
        .iter()
        .take_while(|&&w| w != ControlWord::EndOfFrame)
        .filter_map(|&w| match w {
            ControlWord::AudioSample(v) => Some(v),
            _ => None,
        })
        .collect()
}
