//! VGA RLE player binary.
//!
//! Headless: loads a flash image, a PNG or a built-in test pattern, runs
//! frames and writes a screenshot, the audio output and a JSON report.

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process;

use log::{LevelFilter, info, warn};
use rle_stream::encode::{self, expand};
use rle_stream::{ControlWord, patterns};
use vga_rle::report::RunReport;
use vga_rle::{Controller, ControllerConfig, capture, logger};
use vga_timing::{ACTIVE_HEIGHT, ACTIVE_WIDTH};

const FRAME_PIXELS: usize = ACTIVE_WIDTH as usize * ACTIVE_HEIGHT as usize;

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

struct CliArgs {
    flash_path: Option<PathBuf>,
    pattern: String,
    image_path: Option<PathBuf>,
    encode_path: Option<PathBuf>,
    latency: u8,
    ratio: u8,
    frames: u32,
    screenshot_path: Option<PathBuf>,
    audio_path: Option<PathBuf>,
    report_path: Option<PathBuf>,
    log_level: LevelFilter,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        flash_path: None,
        pattern: "calibration".to_string(),
        image_path: None,
        encode_path: None,
        latency: 1,
        ratio: 4,
        frames: 1,
        screenshot_path: None,
        audio_path: None,
        report_path: None,
        log_level: LevelFilter::Warn,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--flash" => {
                i += 1;
                cli.flash_path = args.get(i).map(PathBuf::from);
            }
            "--pattern" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.pattern = s.to_lowercase();
                }
            }
            "--image" => {
                i += 1;
                cli.image_path = args.get(i).map(PathBuf::from);
            }
            "--encode" => {
                i += 1;
                cli.encode_path = args.get(i).map(PathBuf::from);
            }
            "--latency" => {
                i += 1;
                cli.latency = parse_number(args.get(i), "--latency");
            }
            "--ratio" => {
                i += 1;
                cli.ratio = parse_number(args.get(i), "--ratio");
            }
            "--frames" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.frames = s.parse().unwrap_or(1);
                }
            }
            "--screenshot" => {
                i += 1;
                cli.screenshot_path = args.get(i).map(PathBuf::from);
            }
            "--audio" => {
                i += 1;
                cli.audio_path = args.get(i).map(PathBuf::from);
            }
            "--report" => {
                i += 1;
                cli.report_path = args.get(i).map(PathBuf::from);
            }
            "--log-level" => {
                i += 1;
                match args.get(i).map(|s| s.parse()) {
                    Some(Ok(level)) => cli.log_level = level,
                    _ => {
                        eprintln!("--log-level expects error, warn, info, debug or trace");
                        process::exit(1);
                    }
                }
            }
            "--help" | "-h" => {
                eprintln!("Usage: vga-rle [OPTIONS]");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  --flash <file>       Raw flash image (big-endian control words at address 0)");
                eprintln!(
                    "  --pattern <name>     calibration, calibration-audio, blocks, single-pixel [default: calibration]"
                );
                eprintln!("  --image <file>       Encode a 640x480 PNG and play it");
                eprintln!("  --encode <file>      Write the flash image of the selected stream and exit");
                eprintln!("  --latency <1-4>      Read latency of the flash and the controller [default: 1]");
                eprintln!("  --ratio <1-4>        SPI clocks per pixel clock [default: 4]");
                eprintln!("  --frames <n>         Number of frames to run [default: 1]");
                eprintln!("  --screenshot <file>  Save the last frame as a PNG");
                eprintln!("  --audio <file>       Save the audio output as a WAV");
                eprintln!("  --report <file>      Save a JSON run report");
                eprintln!("  --log-level <level>  error, warn, info, debug, trace [default: warn]");
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn parse_number(arg: Option<&String>, flag: &str) -> u8 {
    match arg.map(|s| s.parse()) {
        Some(Ok(n)) => n,
        _ => {
            eprintln!("{flag} expects a number");
            process::exit(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Stream selection
// ---------------------------------------------------------------------------

/// A flash image and, when the stream is known, the frame it should show.
struct Stream {
    name: String,
    image: Vec<u8>,
    expected: Option<Vec<u8>>,
}

fn load_stream(cli: &CliArgs) -> Result<Stream, Box<dyn Error>> {
    if let Some(ref path) = cli.flash_path {
        let image = fs::read(path)?;
        let expected = match encode::from_flash_image(&image) {
            Ok(words) => Some(expand(&words, FRAME_PIXELS)),
            Err(e) => {
                warn!("{}: {e}", path.display());
                None
            }
        };
        return Ok(Stream {
            name: path.display().to_string(),
            image,
            expected,
        });
    }

    let (name, words) = if let Some(ref path) = cli.image_path {
        let (frame, width, height) = capture::load_image(path)?;
        if (width, height) != (u32::from(ACTIVE_WIDTH), u32::from(ACTIVE_HEIGHT)) {
            return Err(format!("{}: image is {width}x{height}, expected 640x480", path.display()).into());
        }
        let words = encode::encode_frame(&frame, width as usize, height as usize, None)?;
        (path.display().to_string(), words)
    } else {
        (cli.pattern.clone(), pattern_words(&cli.pattern)?)
    };

    info!("{name}: {} control words", words.len());
    Ok(Stream {
        name,
        image: encode::to_flash_image(&words),
        expected: Some(expand(&words, FRAME_PIXELS)),
    })
}

fn pattern_words(name: &str) -> Result<Vec<ControlWord>, Box<dyn Error>> {
    match name {
        "calibration" => Ok(patterns::calibration()),
        "calibration-audio" => Ok(patterns::calibration_with_audio()),
        "blocks" => Ok(patterns::blocks()),
        "single-pixel" => Ok(patterns::single_pixel_runs()),
        other => Err(format!("unknown pattern: {other}").into()),
    }
}

// ---------------------------------------------------------------------------
// Headless run
// ---------------------------------------------------------------------------

fn run(cli: &CliArgs) -> Result<(), Box<dyn Error>> {
    let stream = load_stream(cli)?;

    if let Some(ref path) = cli.encode_path {
        fs::write(path, &stream.image)?;
        eprintln!("Flash image ({} bytes) saved to {}", stream.image.len(), path.display());
        return Ok(());
    }

    let config = ControllerConfig::from_inputs(cli.latency, cli.ratio)?;
    let mut player = Controller::with_flash(config, &stream.image);

    let mut audio = Vec::new();
    for _ in 0..cli.frames {
        player.run_frame();
        audio.extend(player.take_audio_track());
    }

    let report = RunReport::new(&player, &stream.name, stream.expected.as_deref());
    let diag = report.diagnostics;
    eprintln!(
        "{} frames, {} words, {} audio samples, {} underruns, {} reserved words",
        diag.frames, diag.words, diag.audio_samples, diag.underruns, diag.reserved_words
    );
    if let Some(mismatched) = report.mismatched_pixels {
        eprintln!("{mismatched} pixels differ from the expected frame");
    }

    if let Some(ref path) = cli.screenshot_path {
        capture::save_screenshot(&player, path)?;
        eprintln!("Screenshot saved to {}", path.display());
    }

    if let Some(ref path) = cli.audio_path {
        capture::save_audio(&audio, path)?;
        eprintln!("Audio saved to {}", path.display());
    }

    if let Some(ref path) = cli.report_path {
        report.save(path)?;
        eprintln!("Report saved to {}", path.display());
    }

    Ok(())
}

fn main() {
    let cli = parse_args();

    if let Err(e) = logger::init_logger(cli.log_level) {
        eprintln!("Logger error: {e}");
    }

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
