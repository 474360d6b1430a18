//! Headless capture: PNG screenshots, WAV audio and PNG frame input.

use std::error::Error;
use std::fs;
use std::io::BufWriter;
use std::path::Path;

use qspi_master::QspiDevice;

use crate::Controller;
use crate::controller::LINE_RATE_HZ;
use crate::palette::{self, PALETTE};

/// Save the last displayed frame as a PNG file.
pub fn save_screenshot<D: QspiDevice>(controller: &Controller<D>, path: &Path) -> Result<(), Box<dyn Error>> {
    let width = controller.framebuffer_width();
    let height = controller.framebuffer_height();

    let file = fs::File::create(path)?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;

    let mut rgb = Vec::with_capacity(controller.framebuffer().len() * 3);
    for &index in controller.framebuffer() {
        let argb = PALETTE[usize::from(index & 0x3F)];
        rgb.push((argb >> 16) as u8);
        rgb.push((argb >> 8) as u8);
        rgb.push(argb as u8);
    }

    writer.write_image_data(&rgb)?;
    Ok(())
}

/// Save the held audio output (one 6-bit unsigned sample per line) as a
/// mono 16-bit WAV file at the line rate.
pub fn save_audio(track: &[u8], path: &Path) -> Result<(), Box<dyn Error>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: LINE_RATE_HZ,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in track {
        // 0..=63 around a midpoint of 32.
        let centred = i16::from(sample & 0x3F) - 32;
        writer.write_sample(centred * 1024)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Load a PNG and quantize it to 6-bit colour indices.
///
/// Returns `(indices, width, height)`.
pub fn load_image(path: &Path) -> Result<(Vec<u8>, u32, u32), Box<dyn Error>> {
    let mut decoder = png::Decoder::new(fs::File::open(path)?);
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info()?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf)?;
    let data = &buf[..info.buffer_size()];

    let indices: Vec<u8> = match info.color_type {
        png::ColorType::Rgb => data
            .chunks_exact(3)
            .map(|p| palette::quantize(p[0], p[1], p[2]))
            .collect(),
        png::ColorType::Rgba => data
            .chunks_exact(4)
            .map(|p| palette::quantize(p[0], p[1], p[2]))
            .collect(),
        png::ColorType::Grayscale => data.iter().map(|&v| palette::quantize(v, v, v)).collect(),
        png::ColorType::GrayscaleAlpha => data
            .chunks_exact(2)
            .map(|p| palette::quantize(p[0], p[0], p[0]))
            .collect(),
        other => return Err(format!("unsupported PNG colour type {other:?}").into()),
    };

    Ok((indices, info.width, info.height))
}
