//! VGA sync generator for the 640x480 RLE player.
//!
//! Two free-running counters (pixel within line, line within frame) clocked
//! at the 25 MHz pixel clock. Nothing but reset can stop or delay them; the
//! data path has no way to stall the beam.
//!
//! # Timing
//!
//! Each line is 800 pixel clocks and starts with the horizontal blanking:
//!
//! | Pixels    | Span        | hsync pin |
//! |-----------|-------------|-----------|
//! | 0-15      | front porch | high      |
//! | 16-79     | sync        | low       |
//! | 80-159    | back porch  | high      |
//! | 160-799   | active      | high      |
//!
//! Each frame is 500 lines and starts with the vertical blanking:
//!
//! | Lines     | Span        | vsync pin |
//! |-----------|-------------|-----------|
//! | 0-2       | front porch | low       |
//! | 3-6       | sync        | high      |
//! | 7-19      | back porch  | low       |
//! | 20-499    | active      | low       |
//!
//! 800 x 500 clocks at 25 MHz gives a 62.5 Hz frame rate. hsync pulses low,
//! vsync pulses high.

use vga_core::{Observable, Tickable, Value};

/// Visible area.
pub const ACTIVE_WIDTH: u16 = 640;
pub const ACTIVE_HEIGHT: u16 = 480;

/// Pixel clocks per line.
pub const PIXELS_PER_LINE: u16 = 800;
/// Lines per frame.
pub const LINES_PER_FRAME: u16 = 500;

const H_FRONT_PORCH: u16 = 16;
const H_SYNC: u16 = 64;
const H_BACK_PORCH: u16 = 80;
/// First active pixel clock in a line.
pub const FIRST_ACTIVE_PIXEL: u16 = H_FRONT_PORCH + H_SYNC + H_BACK_PORCH;

const V_FRONT_PORCH: u16 = 3;
const V_SYNC: u16 = 4;
const V_BACK_PORCH: u16 = 13;
/// First active line in a frame.
pub const FIRST_ACTIVE_LINE: u16 = V_FRONT_PORCH + V_SYNC + V_BACK_PORCH;

/// Pin levels for one pixel clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncSignals {
    /// hsync pin level (low during the sync pulse).
    pub hsync: bool,
    /// vsync pin level (high during the sync pulse).
    pub vsync: bool,
    /// Inside the 640x480 window.
    pub active: bool,
}

/// The sync generator.
pub struct VgaTiming {
    /// Pixel clock within the line (0-799).
    pixel: u16,
    /// Line within the frame (0-499).
    line: u16,
    /// Set on wraparound to line 0, auto-clears on read.
    frame_complete: bool,
    /// Completed frames since reset.
    frame_count: u64,
}

impl VgaTiming {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pixel: 0,
            line: 0,
            frame_complete: false,
            frame_count: 0,
        }
    }

    /// Pin levels at the current beam position.
    #[must_use]
    pub fn signals(&self) -> SyncSignals {
        SyncSignals {
            hsync: self.hsync(),
            vsync: self.vsync(),
            active: self.active(),
        }
    }

    /// hsync pin level. Low for 64 clocks after the 16-clock front porch.
    #[must_use]
    pub fn hsync(&self) -> bool {
        !(H_FRONT_PORCH..H_FRONT_PORCH + H_SYNC).contains(&self.pixel)
    }

    /// vsync pin level. High for lines 3-6.
    #[must_use]
    pub fn vsync(&self) -> bool {
        (V_FRONT_PORCH..V_FRONT_PORCH + V_SYNC).contains(&self.line)
    }

    #[must_use]
    pub fn active(&self) -> bool {
        self.pixel >= FIRST_ACTIVE_PIXEL && self.line >= FIRST_ACTIVE_LINE
    }

    /// Coordinates within the visible window, if the beam is in it.
    #[must_use]
    pub fn beam(&self) -> Option<(u16, u16)> {
        self.active()
            .then(|| (self.pixel - FIRST_ACTIVE_PIXEL, self.line - FIRST_ACTIVE_LINE))
    }

    /// True on the first pixel clock of the first active line. This is the
    /// point where a frame's data transaction begins: the horizontal
    /// blanking of that line is the lead time for priming the pipeline.
    #[must_use]
    pub fn frame_start(&self) -> bool {
        self.line == FIRST_ACTIVE_LINE && self.pixel == 0
    }

    #[must_use]
    pub fn line(&self) -> u16 {
        self.line
    }

    #[must_use]
    pub fn pixel(&self) -> u16 {
        self.pixel
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// True once after each wraparound to line 0.
    pub fn take_frame_complete(&mut self) -> bool {
        std::mem::take(&mut self.frame_complete)
    }
}

impl Default for VgaTiming {
    fn default() -> Self {
        Self::new()
    }
}

impl Tickable for VgaTiming {
    fn tick(&mut self) {
        self.pixel += 1;
        if self.pixel < PIXELS_PER_LINE {
            return;
        }
        self.pixel = 0;
        self.line += 1;
        if self.line >= LINES_PER_FRAME {
            self.line = 0;
            self.frame_complete = true;
            self.frame_count += 1;
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Observable for VgaTiming {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "pixel" => Some(self.pixel.into()),
            "line" => Some(self.line.into()),
            "hsync" => Some(self.hsync().into()),
            "vsync" => Some(self.vsync().into()),
            "active" => Some(self.active().into()),
            "frame_count" => Some(self.frame_count.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["pixel", "line", "hsync", "vsync", "active", "frame_count"]
    }
}
