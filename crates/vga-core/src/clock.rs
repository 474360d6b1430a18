//! Pixel clock configuration.

use crate::Ticks;

/// 640x480 pixel clock: 25 MHz (the 25.175 MHz standard, rounded as the
/// hardware does).
pub const PIXEL_CLOCK_HZ: u64 = 25_000_000;

/// The pixel clock that drives the whole controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterClock {
    /// Frequency in Hz.
    pub frequency_hz: u64,
}

impl MasterClock {
    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// Pixel clocks in one frame of the given geometry.
    #[must_use]
    pub const fn ticks_per_frame(&self, pixels_per_line: u16, lines_per_frame: u16) -> Ticks {
        Ticks::new(pixels_per_line as u64 * lines_per_frame as u64)
    }

    /// Frame rate in millihertz for the given geometry (62.5 Hz -> 62_500).
    #[must_use]
    pub const fn frame_rate_mhz(&self, pixels_per_line: u16, lines_per_frame: u16) -> u64 {
        self.frequency_hz * 1000 / self.ticks_per_frame(pixels_per_line, lines_per_frame).get()
    }
}

impl Default for MasterClock {
    fn default() -> Self {
        Self::new(PIXEL_CLOCK_HZ)
    }
}
