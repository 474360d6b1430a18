//! JSON run report.

#![allow(clippy::cast_precision_loss)]

use std::error::Error;
use std::fs;
use std::path::Path;

use qspi_master::QspiDevice;
use serde::Serialize;

use crate::{Controller, Diagnostics};

/// Summary of a headless run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub source: String,
    pub latency: u8,
    pub bus_ratio: u8,
    pub frame_rate_hz: f64,
    pub elapsed_ms: f64,
    pub diagnostics: Diagnostics,
    /// Pixels of the last frame that differ from the expected frame, when
    /// one is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatched_pixels: Option<usize>,
}

impl RunReport {
    #[must_use]
    pub fn new<D: QspiDevice>(controller: &Controller<D>, source: &str, expected: Option<&[u8]>) -> Self {
        let config = controller.config();
        Self {
            source: source.to_string(),
            latency: config.latency.get(),
            bus_ratio: config.bus_ratio.get(),
            frame_rate_hz: controller.frame_rate_mhz() as f64 / 1000.0,
            elapsed_ms: controller.elapsed_nanos() as f64 / 1_000_000.0,
            diagnostics: controller.diagnostics(),
            mismatched_pixels: expected.map(|frame| {
                frame
                    .iter()
                    .zip(controller.framebuffer())
                    .filter(|(a, b)| a != b)
                    .count()
            }),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
