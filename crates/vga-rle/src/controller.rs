//! The player: sync generator, bus master and decoder on one pixel clock.
//!
//! # Clocking
//!
//! One [`tick`](Tickable::tick) is one 25 MHz pixel clock. Per tick:
//!
//! 1. Read the sync generator's outputs.
//! 2. On the frame trigger (first pixel of the first active line) clear the
//!    pipeline and start a read of the stream.
//! 3. Tick the decoder and drive the colour and audio pins.
//! 4. Forward the decoder's end-of-frame flag to the bus master.
//! 5. Step the serial bus `2 x bus_ratio` half-cycles, assembling sampled
//!    nibbles into words and pushing them into the prefetch buffer.
//! 6. Advance the sync counters.
//!
//! The pixel side and the bus side only meet at the prefetch buffer and the
//! end-of-frame flag.

use log::{debug, error, info};
use qspi_flash::QspiFlash;
use qspi_master::{QspiDevice, QspiMaster};
use rle_stream::{PrefetchBuffer, StreamDecoder, WordAssembler};
use vga_core::{MasterClock, Observable, Tickable, Ticks, Value};
use vga_timing::{ACTIVE_HEIGHT, ACTIVE_WIDTH, LINES_PER_FRAME, PIXELS_PER_LINE, VgaTiming};

use crate::config::ControllerConfig;
use crate::output::{self, Pins};

/// Audio is held for a whole line at a time: one sample per line.
pub const LINE_RATE_HZ: u32 = (vga_core::PIXEL_CLOCK_HZ / PIXELS_PER_LINE as u64) as u32;

const FRAMEBUFFER_LEN: usize = ACTIVE_WIDTH as usize * ACTIVE_HEIGHT as usize;

/// One audio word as it came off the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioEvent {
    /// Frames completed before this one.
    pub frame: u64,
    pub line: u16,
    pub pixel: u16,
    pub sample: u8,
}

/// Counters since reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "native", derive(serde::Serialize))]
pub struct Diagnostics {
    pub frames: u64,
    pub pixel_clocks: u64,
    pub words: u64,
    pub pixels: u64,
    pub audio_samples: u64,
    pub underruns: u64,
    pub reserved_words: u64,
    pub frames_completed: u64,
    pub overflows: u64,
    pub transactions: u64,
    pub aborted_transactions: u64,
}

/// VGA RLE player wired to a serial memory device.
pub struct Controller<D: QspiDevice = QspiFlash> {
    config: ControllerConfig,
    clock: MasterClock,
    timing: VgaTiming,
    master: QspiMaster,
    assembler: WordAssembler,
    fifo: PrefetchBuffer,
    decoder: StreamDecoder,
    device: D,
    pins: Pins,
    /// Colour indices of the active window, written as the beam passes.
    framebuffer: Vec<u8>,
    audio_events: Vec<AudioEvent>,
    /// Held audio output sampled once per line.
    audio_track: Vec<u8>,
    pixel_clocks: u64,
    overflows: u64,
}

impl Controller<QspiFlash> {
    /// Controller reading from a flash holding `image`, with the flash's
    /// latency matching the configuration.
    #[must_use]
    pub fn with_flash(config: ControllerConfig, image: &[u8]) -> Self {
        Self::new(config, QspiFlash::new(image, config.latency))
    }
}

impl<D: QspiDevice> Controller<D> {
    #[must_use]
    pub fn new(config: ControllerConfig, device: D) -> Self {
        info!(
            "controller: latency {}, {} SPI clocks per pixel",
            config.latency, config.bus_ratio
        );
        Self {
            config,
            clock: MasterClock::default(),
            timing: VgaTiming::new(),
            master: QspiMaster::new(config.latency),
            assembler: WordAssembler::new(),
            fifo: PrefetchBuffer::new(),
            decoder: StreamDecoder::new(),
            device,
            pins: Pins::default(),
            framebuffer: vec![0; FRAMEBUFFER_LEN],
            audio_events: Vec::new(),
            audio_track: Vec::new(),
            pixel_clocks: 0,
            overflows: 0,
        }
    }

    /// Reset with a new configuration. Everything but the device returns
    /// to power-on state; the device sees chip select go high.
    pub fn reset_with(&mut self, config: ControllerConfig) {
        debug!("controller: reset at pixel clock {}", self.pixel_clocks);
        self.config = config;
        self.timing.reset();
        self.master.reset(config.latency);
        self.assembler.clear();
        self.fifo.clear();
        self.decoder.reset();
        self.pins = Pins::default();
        self.framebuffer.fill(0);
        self.audio_events.clear();
        self.audio_track.clear();
        self.pixel_clocks = 0;
        self.overflows = 0;
    }

    /// Run until the sync generator wraps to line 0. From reset this is one
    /// whole frame including its data transaction.
    ///
    /// Returns the number of pixel clocks run.
    pub fn run_frame(&mut self) -> u64 {
        let start = self.pixel_clocks;
        loop {
            self.tick();
            if self.timing.take_frame_complete() {
                break;
            }
        }
        self.pixel_clocks - start
    }

    fn start_frame(&mut self) {
        debug!("controller: frame {} trigger", self.timing.frame_count());
        self.fifo.clear();
        self.assembler.clear();
        self.decoder.begin_frame();
        self.master.begin_transaction();
    }

    fn step_bus(&mut self) {
        for _ in 0..self.config.bus_ratio.half_cycles_per_pixel() {
            // Nibbles already assembled or in flight must fit too.
            let credit = (self.fifo.free_slots() * 4).saturating_sub(self.assembler.len());
            if let Some(nibble) = self.master.step(&mut self.device, credit)
                && let Some(word) = self.assembler.push(nibble)
                && let Err(word) = self.fifo.push(word)
            {
                self.overflows += 1;
                error!("controller: prefetch buffer full, dropped {word:?}");
            }
        }
    }

    #[must_use]
    pub fn config(&self) -> ControllerConfig {
        self.config
    }

    /// Output pins after the last tick.
    #[must_use]
    pub fn pins(&self) -> Pins {
        self.pins
    }

    /// 640x480 colour indices, row-major.
    #[must_use]
    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer
    }

    #[must_use]
    pub fn framebuffer_width(&self) -> u32 {
        u32::from(ACTIVE_WIDTH)
    }

    #[must_use]
    pub fn framebuffer_height(&self) -> u32 {
        u32::from(ACTIVE_HEIGHT)
    }

    /// Audio words decoded since the last call, in stream order.
    pub fn take_audio_events(&mut self) -> Vec<AudioEvent> {
        std::mem::take(&mut self.audio_events)
    }

    /// Held audio output, one sample per line at [`LINE_RATE_HZ`], since
    /// the last call.
    pub fn take_audio_track(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.audio_track)
    }

    #[must_use]
    pub fn timing(&self) -> &VgaTiming {
        &self.timing
    }

    #[must_use]
    pub fn master(&self) -> &QspiMaster {
        &self.master
    }

    #[must_use]
    pub fn decoder(&self) -> &StreamDecoder {
        &self.decoder
    }

    #[must_use]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.timing.frame_count()
    }

    /// Emulated time since reset.
    #[must_use]
    pub fn elapsed_nanos(&self) -> u64 {
        Ticks::new(self.pixel_clocks).as_nanos(self.clock.frequency_hz)
    }

    /// Frame rate in millihertz.
    #[must_use]
    pub fn frame_rate_mhz(&self) -> u64 {
        self.clock.frame_rate_mhz(PIXELS_PER_LINE, LINES_PER_FRAME)
    }

    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        let stats = self.decoder.stats();
        Diagnostics {
            frames: self.timing.frame_count(),
            pixel_clocks: self.pixel_clocks,
            words: stats.words,
            pixels: stats.pixels,
            audio_samples: stats.audio_samples,
            underruns: stats.underruns,
            reserved_words: stats.reserved_words,
            frames_completed: stats.frames_completed,
            overflows: self.overflows,
            transactions: self.master.transactions(),
            aborted_transactions: self.master.aborted(),
        }
    }
}

impl<D: QspiDevice> Tickable for Controller<D> {
    fn tick(&mut self) {
        let sync = self.timing.signals();
        if self.timing.frame_start() {
            self.start_frame();
        }

        let (frame, line, pixel) = (self.timing.frame_count(), self.timing.line(), self.timing.pixel());
        let mut audio = self.pins.audio;
        let mut strobe = false;
        let events = &mut self.audio_events;
        let decoded = self.decoder.tick(&mut self.fifo, sync.active, |sample| {
            audio = sample;
            strobe = true;
            events.push(AudioEvent {
                frame,
                line,
                pixel,
                sample,
            });
        });
        let colour = output::colour(sync, decoded);

        if self.decoder.end_of_frame() {
            self.master.end_transaction();
            self.assembler.clear();
        }

        self.step_bus();

        if let Some((x, y)) = self.timing.beam() {
            self.framebuffer[usize::from(y) * usize::from(ACTIVE_WIDTH) + usize::from(x)] = colour;
        }
        if pixel == PIXELS_PER_LINE - 1 {
            self.audio_track.push(audio);
        }

        self.pins = Pins {
            hsync: sync.hsync,
            vsync: sync.vsync,
            colour,
            audio,
            audio_strobe: strobe,
            bus: self.master.signals(),
        };

        self.timing.tick();
        self.pixel_clocks += 1;
    }

    fn reset(&mut self) {
        self.reset_with(self.config);
    }
}

impl<D: QspiDevice + Observable> Observable for Controller<D> {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("timing.") {
            self.timing.query(rest)
        } else if let Some(rest) = path.strip_prefix("qspi.") {
            self.master.query(rest)
        } else if let Some(rest) = path.strip_prefix("decoder.") {
            self.decoder.query(rest)
        } else if let Some(rest) = path.strip_prefix("device.") {
            self.device.query(rest)
        } else {
            match path {
                "fifo.level" => Some((self.fifo.len() as u8).into()),
                "assembler.nibbles" => Some((self.assembler.len() as u8).into()),
                "colour" => Some(self.pins.colour.into()),
                "audio" => Some(self.pins.audio.into()),
                "pixel_clocks" => Some(self.pixel_clocks.into()),
                "overflows" => Some(self.overflows.into()),
                "latency" => Some(self.config.latency.get().into()),
                "bus_ratio" => Some(self.config.bus_ratio.get().into()),
                _ => None,
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "timing.<timing_paths>",
            "qspi.<qspi_paths>",
            "decoder.<decoder_paths>",
            "device.<device_paths>",
            "fifo.level",
            "assembler.nibbles",
            "colour",
            "audio",
            "pixel_clocks",
            "overflows",
            "latency",
            "bus_ratio",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rle_stream::ControlWord;
    use rle_stream::encode::to_flash_image;

    fn controller(words: &[ControlWord]) -> Controller {
        Controller::with_flash(ControllerConfig::default(), &to_flash_image(words))
    }

    #[test]
    fn line_rate() {
        assert_eq!(LINE_RATE_HZ, 31_250);
    }

    #[test]
    fn run_frame_from_reset_is_one_frame() {
        let mut player = controller(&[ControlWord::EndOfFrame]);
        assert_eq!(player.run_frame(), 400_000);
        assert_eq!(player.frame_count(), 1);
        assert_eq!(player.elapsed_nanos(), 16_000_000);
        assert_eq!(player.frame_rate_mhz(), 62_500);
    }

    #[test]
    fn no_bus_activity_before_frame_trigger() {
        let mut player = controller(&[ControlWord::EndOfFrame]);
        for _ in 0..20 * 800 {
            player.tick();
            assert!(player.pins().bus.cs_n);
        }
        player.tick();
        assert_eq!(player.diagnostics().transactions, 1);
    }

    #[test]
    fn audio_strobe_and_hold() {
        let mut player = controller(&[
            ControlWord::run(1, 5),
            ControlWord::audio(9),
            ControlWord::EndOfFrame,
        ]);
        player.run_frame();
        let events = player.take_audio_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].sample, 9);
        assert_eq!((events[0].frame, events[0].line), (0, 20));
        assert_eq!(player.pins().audio, 9);
        assert!(!player.pins().audio_strobe);

        let track = player.take_audio_track();
        assert_eq!(track.len(), 500);
        assert!(track[..20].iter().all(|&s| s == 0));
        assert!(track[20..].iter().all(|&s| s == 9));
        assert!(player.take_audio_events().is_empty());
    }

    #[test]
    fn queries_route_to_components() {
        let mut player = controller(&[ControlWord::EndOfFrame]);
        player.tick();
        assert_eq!(player.query("timing.pixel"), Some(Value::U16(1)));
        assert_eq!(player.query("latency"), Some(Value::U8(1)));
        assert_eq!(player.query("bus_ratio"), Some(Value::U8(4)));
        assert_eq!(player.query("device.data.0"), Some(Value::U8(0xFF)));
        assert_eq!(player.query("decoder.state"), Some(Value::Str("idle")));
        assert!(player.query("qspi.phase").is_some());
        assert_eq!(player.query("nope"), None);
    }
}
