//! Output pins.

use qspi_master::BusSignals;
use vga_timing::SyncSignals;

/// Every output pin for one pixel clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pins {
    /// Active low.
    pub hsync: bool,
    /// Active high.
    pub vsync: bool,
    /// 6-bit colour, 0 outside active video.
    pub colour: u8,
    /// Last audio sample decoded, held until the next one.
    pub audio: u8,
    /// High for the pixel clock in which a new sample was decoded.
    pub audio_strobe: bool,
    /// Serial bus after the last half-cycle of this pixel clock.
    pub bus: BusSignals,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            hsync: true,
            vsync: false,
            colour: 0,
            audio: 0,
            audio_strobe: false,
            bus: BusSignals::IDLE,
        }
    }
}

/// Colour pins for a pixel clock: the decoder's colour in active video,
/// blank everywhere else.
#[must_use]
pub fn colour(sync: SyncSignals, decoded: u8) -> u8 {
    if sync.active { decoded & 0x3F } else { 0 }
}
