use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// A flash image must hold whole 16-bit words.
    OddImageLength(usize),
    /// Frame buffer does not match the stated dimensions.
    FrameSize { expected: usize, actual: usize },
    /// Per-line audio must hold one sample per line.
    AudioLength { expected: usize, actual: usize },
    /// Colour or sample value wider than 6 bits.
    ValueOutOfRange(u8),
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OddImageLength(len) => {
                write!(f, "flash image length {len} is not a whole number of words")
            }
            Self::FrameSize { expected, actual } => {
                write!(f, "frame has {actual} pixels, expected {expected}")
            }
            Self::AudioLength { expected, actual } => {
                write!(f, "{actual} audio samples for {expected} lines")
            }
            Self::ValueOutOfRange(v) => write!(f, "value {v} does not fit in 6 bits"),
        }
    }
}

impl std::error::Error for StreamError {}
