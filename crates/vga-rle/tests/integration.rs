//! Integration tests for the VGA RLE player.
//!
//! Every test runs whole frames through the real pipeline: sync generator,
//! Quad-SPI master, flash model, word assembler, prefetch buffer and
//! decoder, and checks what reaches the pins.

use qspi_flash::QspiFlash;
use qspi_master::Latency;
use rle_stream::encode::{audio_samples, expand, to_flash_image};
use rle_stream::{ControlWord, patterns};
use vga_core::{Tickable, Ticks};
use vga_rle::{BusRatio, Controller, ControllerConfig};

const FRAME_PIXELS: usize = 640 * 480;

fn config(latency: u8, ratio: u8) -> ControllerConfig {
    ControllerConfig {
        latency: Latency::new(latency).unwrap(),
        bus_ratio: BusRatio::new(ratio).unwrap(),
    }
}

fn player(words: &[ControlWord], latency: u8, ratio: u8) -> Controller {
    Controller::with_flash(config(latency, ratio), &to_flash_image(words))
}

/// First differing pixel, for readable failures.
fn first_mismatch(actual: &[u8], expected: &[u8]) -> Option<(usize, usize, u8, u8)> {
    actual
        .iter()
        .zip(expected)
        .position(|(a, e)| a != e)
        .map(|i| (i % 640, i / 640, actual[i], expected[i]))
}

// ---------------------------------------------------------------------------
// Calibration frames
// ---------------------------------------------------------------------------

#[test]
fn calibration_frame_at_every_latency() {
    let words = patterns::calibration();
    let expected = expand(&words, FRAME_PIXELS);

    for ratio in [BusRatio::SILICON.get(), BusRatio::default().get()] {
        for latency in Latency::all() {
            let mut player = player(&words, latency.get(), ratio);
            player.run_frame();

            assert_eq!(
                first_mismatch(player.framebuffer(), &expected),
                None,
                "latency {latency}, ratio {ratio}"
            );
            let diag = player.diagnostics();
            assert_eq!(diag.underruns, 0, "latency {latency}, ratio {ratio}");
            assert_eq!(diag.overflows, 0);
            assert_eq!(diag.pixels, FRAME_PIXELS as u64);
            assert_eq!(diag.frames_completed, 1);
            assert_eq!(diag.transactions, 1);
            assert_eq!(diag.aborted_transactions, 0);
        }
    }
}

#[test]
fn calibration_frame_spot_checks() {
    let mut player = player(&patterns::calibration(), 1, 1);
    player.run_frame();
    let fb = player.framebuffer();
    let at = |x: usize, y: usize| fb[y * 640 + x];

    // Cross-hair band.
    assert_eq!(at(0, 5), 5);
    assert_eq!(at(319, 5), 5);
    assert_eq!((at(320, 5), at(321, 5)), (1, 1));
    assert_eq!((at(322, 5), at(323, 5)), (2, 2));
    assert_eq!(at(324, 5), 5);
    // Diagonal band: line 64 + n splits at 2 * (n + 1).
    assert_eq!((at(7, 67), at(8, 67)), (26, 27));
    // Blocks.
    assert_eq!(at(8 * 70 + 3, 400), 70 & 0x3F);

    for y in 0..480u16 {
        for x in (0..640u16).step_by(37) {
            assert_eq!(at(usize::from(x), usize::from(y)), patterns::calibration_pixel(x, y));
        }
    }
}

#[test]
fn consecutive_frames_reread_from_address_zero() {
    let words = patterns::calibration();
    let expected = expand(&words, FRAME_PIXELS);
    let mut player = player(&words, 2, 1);

    for frame in 1..=3 {
        player.run_frame();
        assert_eq!(first_mismatch(player.framebuffer(), &expected), None, "frame {frame}");
    }
    let diag = player.diagnostics();
    assert_eq!(diag.frames, 3);
    assert_eq!(diag.transactions, 3);
    assert_eq!(diag.frames_completed, 3);
    assert_eq!(diag.underruns, 0);
    assert_eq!(player.device().reads(), 3);
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

#[test]
fn sync_pins_ignore_data_flow() {
    // A stream that underruns all the time must not move the sync pulses.
    let mut player = player(&patterns::single_pixel_runs(), 4, 1);
    let mut hsync_edges = Vec::new();
    let mut vsync_edges = Vec::new();
    let (mut hsync, mut vsync) = (true, false);

    for clock in 0..800 * 500 * 2u32 {
        player.tick();
        let pins = player.pins();
        if hsync && !pins.hsync {
            hsync_edges.push(clock);
        }
        if !vsync && pins.vsync {
            vsync_edges.push(clock);
        }
        hsync = pins.hsync;
        vsync = pins.vsync;
    }

    assert_eq!(hsync_edges.len(), 1000);
    assert!(hsync_edges.windows(2).all(|w| w[1] - w[0] == 800));
    assert_eq!(hsync_edges[0], 16);
    assert_eq!(vsync_edges, [3 * 800, 3 * 800 + 400_000]);
    assert!(player.diagnostics().underruns > 0);
}

#[test]
fn colour_is_blank_outside_active_video() {
    let mut player = player(&[ControlWord::run(991, 63), ControlWord::EndOfFrame], 1, 4);
    let mut lit = 0;
    for _ in 0..800 * 500 {
        let (pixel, line) = (player.timing().pixel(), player.timing().line());
        player.tick();
        let colour = player.pins().colour;
        if pixel < 160 || line < 20 {
            assert_eq!(colour, 0, "({pixel}, {line})");
        } else if colour == 63 {
            lit += 1;
        }
    }
    assert_eq!(lit, 991);
}

// ---------------------------------------------------------------------------
// Audio
// ---------------------------------------------------------------------------

#[test]
fn audio_words_do_not_move_pixels() {
    let with_audio = patterns::calibration_with_audio();
    let expected = expand(&patterns::calibration(), FRAME_PIXELS);

    for latency in Latency::all() {
        let mut player = player(&with_audio, latency.get(), 1);
        player.run_frame();
        assert_eq!(first_mismatch(player.framebuffer(), &expected), None, "latency {latency}");
        assert_eq!(player.diagnostics().underruns, 0);

        let events = player.take_audio_events();
        let samples: Vec<u8> = events.iter().map(|e| e.sample).collect();
        assert_eq!(samples, audio_samples(&with_audio));

        // Each sample follows its line's last pixel.
        for (n, event) in events.iter().enumerate() {
            assert_eq!((event.line, event.pixel), (20 + n as u16, 799), "sample {n}");
        }

        let track = player.take_audio_track();
        assert_eq!(track.len(), 500);
        assert_eq!(track[20..], samples[..]);
    }
}

#[test]
fn audio_strobe_marks_each_sample() {
    let mut player = player(&patterns::calibration_with_audio(), 1, 4);
    let mut strobes = 0;
    let mut last = None;
    for _ in 0..800 * 500 {
        player.tick();
        let pins = player.pins();
        if pins.audio_strobe {
            strobes += 1;
            last = Some(pins.audio);
        }
    }
    assert_eq!(strobes, 480);
    // Block line 96, masked to 6 bits.
    assert_eq!(last, Some(32));
    assert_eq!(player.pins().audio, 32);
}

// ---------------------------------------------------------------------------
// Throughput
// ---------------------------------------------------------------------------

#[test]
fn single_pixel_runs_need_a_fast_bus() {
    let words = patterns::single_pixel_runs();
    let expected = expand(&words, FRAME_PIXELS);

    let mut slow = player(&words, 1, 1);
    slow.run_frame();
    assert!(slow.diagnostics().underruns > 0);
    assert_eq!(slow.diagnostics().overflows, 0);

    for latency in Latency::all() {
        let mut fast = player(&words, latency.get(), 4);
        fast.run_frame();
        assert_eq!(fast.diagnostics().underruns, 0, "latency {latency}");
        assert_eq!(first_mismatch(fast.framebuffer(), &expected), None, "latency {latency}");
    }
}

// ---------------------------------------------------------------------------
// Bus behaviour
// ---------------------------------------------------------------------------

#[test]
fn latency_mismatch_corrupts_the_frame() {
    let words = patterns::calibration();
    let expected = expand(&words, FRAME_PIXELS);
    let image = to_flash_image(&words);

    for (device, controller) in [(3, 2), (1, 3), (4, 1)] {
        let flash = QspiFlash::new(&image, Latency::new(device).unwrap());
        let mut player = Controller::new(config(controller, 4), flash);
        player.run_frame();
        assert!(
            first_mismatch(player.framebuffer(), &expected).is_some(),
            "device {device}, controller {controller}"
        );
    }
}

#[test]
fn end_of_frame_releases_chip_select() {
    let words = patterns::blocks();
    let mut player = player(&words, 4, 1);
    player.run_frame();
    assert_eq!(player.diagnostics().frames_completed, 1);

    // Nibbles in flight drain within a couple of pixel clocks.
    player.tick_n(Ticks::new(4));
    assert!(player.pins().bus.cs_n);
    let sent = player.device().nibbles_sent();

    // Nothing more is read until the next frame trigger.
    for _ in 0..(20 * 800 - 4) {
        player.tick();
        assert!(player.pins().bus.cs_n);
    }
    assert_eq!(player.device().nibbles_sent(), sent);
    player.tick();
    assert!(!player.pins().bus.cs_n);
}

#[test]
fn end_of_frame_mid_screen_blanks_the_rest() {
    let words = [
        ControlWord::run(640, 12),
        ControlWord::run(640, 12),
        ControlWord::run(640, 12),
        ControlWord::EndOfFrame,
        ControlWord::run(640, 40),
    ];
    let mut player = player(&words, 2, 1);
    player.run_frame();
    let fb = player.framebuffer();
    assert!(fb[..640 * 3].iter().all(|&c| c == 12));
    assert!(fb[640 * 3..].iter().all(|&c| c == 0));
    assert_eq!(player.diagnostics().underruns, 0);
    assert_eq!(player.diagnostics().words, 4);
}

#[test]
fn stream_longer_than_a_frame_is_restarted() {
    let words: Vec<ControlWord> = (0..2 * 480 * 8)
        .map(|n| ControlWord::run(80, (n % 64) as u8))
        .chain(std::iter::once(ControlWord::EndOfFrame))
        .collect();
    let expected = expand(&words, FRAME_PIXELS);
    let mut player = player(&words, 1, 4);

    player.run_frame();
    player.run_frame();
    assert_eq!(first_mismatch(player.framebuffer(), &expected), None);
    let diag = player.diagnostics();
    assert_eq!(diag.transactions, 2);
    assert_eq!(diag.aborted_transactions, 1);
    assert_eq!(diag.frames_completed, 0);
}

#[test]
fn missing_end_of_frame_reads_erased_flash() {
    // Exactly one frame of pixels and no end-of-frame word: the erased flash
    // after it reads as 0xFFFF, which is an end-of-frame word.
    let mut words = patterns::blocks();
    words.pop();
    let mut player = player(&words, 3, 1);
    player.run_frame();
    assert_eq!(player.diagnostics().frames_completed, 1);
    assert_eq!(player.diagnostics().underruns, 0);
}

#[test]
fn blank_flash_shows_black() {
    let mut player = Controller::new(config(2, 4), QspiFlash::blank(Latency::new(2).unwrap()));
    player.run_frame();
    assert!(player.framebuffer().iter().all(|&c| c == 0));
    let diag = player.diagnostics();
    assert_eq!(diag.underruns, 0);
    assert_eq!(diag.frames_completed, 1);
    assert_eq!(diag.words, 1);
}

// ---------------------------------------------------------------------------
// Errors and reset
// ---------------------------------------------------------------------------

#[test]
fn reserved_words_are_empty_runs() {
    let plain = patterns::calibration();
    let mut with_reserved = Vec::new();
    for (n, &word) in plain.iter().enumerate() {
        if n % 50 == 7 {
            with_reserved.push(ControlWord::decode((993 + (n % 30) as u16) << 6));
        }
        with_reserved.push(word);
    }
    let inserted = with_reserved.len() - plain.len();

    let mut player = player(&with_reserved, 2, 4);
    player.run_frame();
    assert_eq!(
        first_mismatch(player.framebuffer(), &expand(&plain, FRAME_PIXELS)),
        None
    );
    let diag = player.diagnostics();
    assert_eq!(diag.reserved_words, inserted as u64);
    assert_eq!(diag.audio_samples, 0);
    assert_eq!(diag.underruns, 0);
}

#[test]
fn reset_mid_frame_restores_power_on_state() {
    let words = patterns::calibration();
    let expected = expand(&words, FRAME_PIXELS);
    let mut player = player(&words, 3, 1);

    player.tick_n(Ticks::new(200 * 800 + 345));
    assert!(!player.pins().bus.cs_n);
    player.reset();
    assert_eq!(player.diagnostics(), vga_rle::Diagnostics::default());
    assert!(player.framebuffer().iter().all(|&c| c == 0));

    player.run_frame();
    assert_eq!(first_mismatch(player.framebuffer(), &expected), None);
    assert_eq!(player.diagnostics().transactions, 1);
    assert_eq!(player.diagnostics().aborted_transactions, 0);
    assert_eq!(player.device().reads(), 2);
}

#[test]
fn reset_with_new_latency() {
    let words = patterns::calibration();
    let expected = expand(&words, FRAME_PIXELS);
    let image = to_flash_image(&words);
    let mut player = Controller::new(config(1, 4), QspiFlash::new(&image, Latency::new(4).unwrap()));

    player.run_frame();
    assert!(first_mismatch(player.framebuffer(), &expected).is_some());

    player.reset_with(config(4, 4));
    player.run_frame();
    assert_eq!(first_mismatch(player.framebuffer(), &expected), None);
}
