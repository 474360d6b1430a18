//! Control word decoding.

/// Longest pixel run one word can describe.
pub const MAX_RUN_LENGTH: u16 = 991;
/// Run length field marking an audio sample.
pub const AUDIO_TAG: u16 = 0x3E0;
/// Run length field marking the end of the frame's data.
pub const END_OF_FRAME_TAG: u16 = 0x3FF;

const VALUE_BITS: u16 = 6;
const VALUE_MASK: u16 = (1 << VALUE_BITS) - 1;

/// One decoded 16-bit control word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlWord {
    /// `length` pixels of `colour`. A zero length is legal and emits nothing.
    PixelRun { length: u16, colour: u8 },
    /// 6-bit audio sample, no pixels.
    AudioSample(u8),
    /// No more data this frame.
    EndOfFrame,
    /// Run length field 993-1022. Carries the raw word.
    Reserved(u16),
}

impl ControlWord {
    #[must_use]
    pub const fn decode(raw: u16) -> Self {
        let field = raw >> VALUE_BITS;
        let value = (raw & VALUE_MASK) as u8;
        match field {
            0..=MAX_RUN_LENGTH => Self::PixelRun {
                length: field,
                colour: value,
            },
            AUDIO_TAG => Self::AudioSample(value),
            END_OF_FRAME_TAG => Self::EndOfFrame,
            _ => Self::Reserved(raw),
        }
    }

    #[must_use]
    pub const fn encode(self) -> u16 {
        match self {
            Self::PixelRun { length, colour } => (length << VALUE_BITS) | (colour as u16 & VALUE_MASK),
            Self::AudioSample(sample) => (AUDIO_TAG << VALUE_BITS) | (sample as u16 & VALUE_MASK),
            Self::EndOfFrame => END_OF_FRAME_TAG << VALUE_BITS,
            Self::Reserved(raw) => raw,
        }
    }

    /// Pixel run, with `length` clamped to [`MAX_RUN_LENGTH`] and `colour`
    /// to 6 bits.
    #[must_use]
    pub const fn run(length: u16, colour: u8) -> Self {
        let length = if length > MAX_RUN_LENGTH { MAX_RUN_LENGTH } else { length };
        Self::PixelRun {
            length,
            colour: colour & VALUE_MASK as u8,
        }
    }

    #[must_use]
    pub const fn audio(sample: u8) -> Self {
        Self::AudioSample(sample & VALUE_MASK as u8)
    }

    /// Pixels this word produces.
    #[must_use]
    pub const fn pixels(self) -> u16 {
        match self {
            Self::PixelRun { length, .. } => length,
            _ => 0,
        }
    }
}

impl From<u16> for ControlWord {
    fn from(raw: u16) -> Self {
        Self::decode(raw)
    }
}

impl From<ControlWord> for u16 {
    fn from(word: ControlWord) -> Self {
        word.encode()
    }
}
