//! Clocking and observation traits for the VGA RLE player.
//!
//! The pixel clock is the master clock. The SPI bus runs at an integer
//! multiple of it and is stepped in half-cycles by whoever owns the pixel
//! clock, so every timing in the system derives from a pixel clock count.

mod clock;
mod edge;
mod observable;
mod tickable;
mod ticks;

pub use clock::{MasterClock, PIXEL_CLOCK_HZ};
pub use edge::Edge;
pub use observable::{Observable, Value};
pub use tickable::Tickable;
pub use ticks::Ticks;
