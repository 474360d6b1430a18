//! Read latency configuration and the sampling phase derived from it.

use std::fmt;

use vga_core::Edge;

/// Extra dummy half-cycles between the fixed dummy clocks and the first
/// data nibble. Sampled at reset and fixed until the next reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Latency(u8);

impl Latency {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    pub fn new(half_cycles: u8) -> Result<Self, LatencyError> {
        if (Self::MIN..=Self::MAX).contains(&half_cycles) {
            Ok(Self(half_cycles))
        } else {
            Err(LatencyError::OutOfRange(half_cycles))
        }
    }

    /// Decode the raw configuration input. An input of 0 (input left
    /// unconfigured) selects the default latency of 1.
    pub fn from_config_input(raw: u8) -> Result<Self, LatencyError> {
        match raw {
            0 => Ok(Self::default()),
            n => Self::new(n),
        }
    }

    /// Every supported latency, lowest first.
    pub fn all() -> impl Iterator<Item = Self> {
        (Self::MIN..=Self::MAX).map(Self)
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn sample_phase(self) -> SamplePhase {
        SamplePhase {
            whole_clocks: self.0 / 2,
            half_cycle: self.0 & 1 == 1,
        }
    }
}

impl Default for Latency {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<u8> for Latency {
    type Error = LatencyError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Latency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyError {
    OutOfRange(u8),
}

impl fmt::Display for LatencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange(v) => write!(
                f,
                "read latency {v} out of range (expected {}..={})",
                Latency::MIN,
                Latency::MAX,
            ),
        }
    }
}

impl std::error::Error for LatencyError {}

/// When a data nibble is sampled relative to the rising edge of the clock
/// that launched it.
///
/// Even latencies land on a later rising edge; odd latencies land half a
/// clock later, on a falling edge. The master applies the same phase to
/// every nibble of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplePhase {
    pub whole_clocks: u8,
    pub half_cycle: bool,
}

impl SamplePhase {
    /// Delay from launch to sample in half-cycles.
    #[must_use]
    pub const fn half_cycles(self) -> u64 {
        self.whole_clocks as u64 * 2 + self.half_cycle as u64
    }

    /// Edge on which data is sampled.
    #[must_use]
    pub const fn edge(self) -> Edge {
        if self.half_cycle { Edge::Falling } else { Edge::Rising }
    }
}
