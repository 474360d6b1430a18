//! Controller configuration, sampled at reset.

use std::fmt;

use qspi_master::{Latency, LatencyError};

/// SPI clocks per pixel clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BusRatio(u8);

impl BusRatio {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    /// One SPI clock per pixel clock: the 25 MHz bus of the real part.
    pub const SILICON: Self = Self(1);

    pub fn new(ratio: u8) -> Result<Self, ConfigError> {
        if (Self::MIN..=Self::MAX).contains(&ratio) {
            Ok(Self(ratio))
        } else {
            Err(ConfigError::BusRatio(ratio))
        }
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// SPI half-cycles stepped per pixel clock.
    #[must_use]
    pub const fn half_cycles_per_pixel(self) -> u8 {
        self.0 * 2
    }
}

/// Four SPI clocks per pixel: enough for one control word every pixel.
impl Default for BusRatio {
    fn default() -> Self {
        Self(4)
    }
}

impl fmt::Display for BusRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for creating a [`Controller`](crate::Controller).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerConfig {
    /// Read latency the memory is expected to have.
    pub latency: Latency,
    pub bus_ratio: BusRatio,
}

impl ControllerConfig {
    /// Build from raw configuration inputs. A latency input of 0 selects
    /// the default latency.
    pub fn from_inputs(latency: u8, bus_ratio: u8) -> Result<Self, ConfigError> {
        Ok(Self {
            latency: Latency::from_config_input(latency)?,
            bus_ratio: BusRatio::new(bus_ratio)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    Latency(LatencyError),
    BusRatio(u8),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latency(e) => write!(f, "{e}"),
            Self::BusRatio(v) => write!(
                f,
                "bus ratio {v} out of range (expected {}..={})",
                BusRatio::MIN,
                BusRatio::MAX
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Latency(e) => Some(e),
            Self::BusRatio(_) => None,
        }
    }
}

impl From<LatencyError> for ConfigError {
    fn from(e: LatencyError) -> Self {
        Self::Latency(e)
    }
}
