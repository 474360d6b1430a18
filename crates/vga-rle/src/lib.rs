//! Cycle-level VGA RLE player.
//!
//! A 640x480 sync generator and a run-length decoder share a 25 MHz pixel
//! clock. The decoder's control words come from a serial memory over a
//! Quad-SPI bus, fetched a frame at a time: the transaction starts when the
//! beam reaches the first active line and ends when the decoder finds the
//! end-of-frame word. Nothing the bus does can stall the beam; if data is
//! late the pixel is blank.
//!
//! The read latency of the memory (1-4 half-cycles) and the number of SPI
//! clocks per pixel clock are fixed at reset by [`ControllerConfig`].

#[cfg(feature = "native")]
pub mod capture;
mod config;
mod controller;
pub mod logger;
mod output;
pub mod palette;
#[cfg(feature = "native")]
pub mod report;

pub use config::{BusRatio, ConfigError, ControllerConfig};
pub use controller::{AudioEvent, Controller, Diagnostics, LINE_RATE_HZ};
pub use output::Pins;
